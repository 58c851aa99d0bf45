use std::{
    fs::File,
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
};

use clap::{Args, Subcommand};
use kloudlib::{
    commons::Chart,
    components::{
        grafana::{self, Grafana},
        postgresql::{self, PostgreSql},
    },
    password::RandomPasswordGenerator,
    shared::yaml::{self, SerializeOptions},
};
use serde::de::DeserializeOwned;
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to open config file {path:?}"))]
    OpenConfig { source: io::Error, path: PathBuf },

    #[snafu(display("failed to parse config file {path:?}"))]
    ParseConfig {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to assemble the postgresql chart"))]
    PostgreSqlChart { source: postgresql::Error },

    #[snafu(display("failed to assemble the grafana chart"))]
    GrafanaChart { source: grafana::Error },

    #[snafu(display("failed to write chart"))]
    WriteChart { source: yaml::Error },
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum ChartCommand {
    /// PostgreSQL with optional read replicas.
    Postgresql(ChartArguments),

    /// Grafana with provisioned data sources.
    Grafana(ChartArguments),
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct ChartArguments {
    /// The release name of the component.
    #[arg(long, env = "KLOUDLIB_NAME")]
    pub name: String,

    /// A YAML file with the component arguments. Defaults are used if unset.
    #[arg(long, short = 'c', value_name = "FILE", env = "KLOUDLIB_CONFIG")]
    pub config: Option<PathBuf>,
}

pub fn run(command: &ChartCommand, stdout: impl Write) -> Result<(), Error> {
    let chart = match command {
        ChartCommand::Postgresql(arguments) => {
            let args = load_args(arguments.config.as_deref())?;
            PostgreSql::new(&arguments.name, args, &RandomPasswordGenerator)
                .chart()
                .context(PostgreSqlChartSnafu)?
        }
        ChartCommand::Grafana(arguments) => {
            let args = load_args(arguments.config.as_deref())?;
            Grafana::new(&arguments.name, args, &RandomPasswordGenerator)
                .chart()
                .context(GrafanaChartSnafu)?
        }
    };

    write_chart(&chart, stdout)
}

fn write_chart(chart: &Chart, stdout: impl Write) -> Result<(), Error> {
    tracing::info!(
        release_name = %chart.release_name,
        chart = %chart.meta.chart,
        version = %chart.meta.version,
        "printing chart"
    );
    yaml::serialize(chart, stdout, SerializeOptions::default()).context(WriteChartSnafu)
}

fn load_args<T>(path: Option<&Path>) -> Result<T, Error>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };

    let file = File::open(path).context(OpenConfigSnafu { path })?;
    serde_yaml::from_reader(BufReader::new(file)).context(ParseConfigSnafu { path })
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use indoc::indoc;
    use tempfile::NamedTempFile;

    use super::*;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn run_to_value(command: &ChartCommand) -> serde_yaml::Value {
        let mut output = Vec::new();
        run(command, &mut output).expect("chart is printed");
        serde_yaml::from_slice(&output).expect("output is valid YAML")
    }

    #[test]
    fn postgresql_with_defaults() {
        let chart = run_to_value(&ChartCommand::Postgresql(ChartArguments {
            name: "pg".to_owned(),
            config: None,
        }));

        assert_eq!(chart["releaseName"], "pg");
        assert_eq!(chart["chart"], "postgresql");
        assert_eq!(chart["version"], "8.6.13");
        assert_eq!(chart["values"]["replication"]["slaveReplicas"], 0);
    }

    #[test]
    fn postgresql_from_config() {
        let config = config_file(indoc! {"
            namespace: databases
            version: 8.9.0
            replication:
              replicas: 2
        "});
        let chart = run_to_value(&ChartCommand::Postgresql(ChartArguments {
            name: "pg".to_owned(),
            config: Some(config.path().to_owned()),
        }));

        assert_eq!(chart["namespace"], "databases");
        assert_eq!(chart["version"], "8.9.0");
        assert_eq!(chart["values"]["replication"]["enabled"], true);
        assert_eq!(chart["values"]["replication"]["slaveReplicas"], 2);
    }

    #[test]
    fn grafana_from_config() {
        let config = config_file(indoc! {"
            datasources:
              - name: prometheus
                type: prometheus
                url: http://prometheus-server
        "});
        let chart = run_to_value(&ChartCommand::Grafana(ChartArguments {
            name: "grafana".to_owned(),
            config: Some(config.path().to_owned()),
        }));

        assert_eq!(chart["releaseName"], "grafana");
        assert_eq!(chart["chart"], "grafana");
    }

    #[test]
    fn missing_config_file() {
        let command = ChartCommand::Postgresql(ChartArguments {
            name: "pg".to_owned(),
            config: Some(PathBuf::from("/does/not/exist.yaml")),
        });

        let error = run(&command, io::sink()).unwrap_err();
        assert!(matches!(error, Error::OpenConfig { .. }));
    }
}
