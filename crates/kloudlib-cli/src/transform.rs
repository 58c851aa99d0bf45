use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::PathBuf,
    str::FromStr,
};

use clap::Args;
use kloudlib::{
    components::postgresql::{PostgreSql, PostgreSqlArgs, Replication},
    manifest::Manifest,
    password::RandomPasswordGenerator,
    pipeline::{self, Pipeline},
    shared::yaml::{self, SerializeOptions},
    transformation::{RemoveHelmHooks, ReplaceApiVersion},
};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to open input file {path:?}"))]
    OpenInput { source: io::Error, path: PathBuf },

    #[snafu(display("failed to read manifests"))]
    ReadManifests { source: yaml::Error },

    #[snafu(display("failed to apply transformations"))]
    ApplyPipeline { source: pipeline::Error },

    #[snafu(display("failed to write manifests"))]
    WriteManifests { source: yaml::Error },
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct TransformArguments {
    /// Read the rendered manifests from this file instead of stdin.
    #[arg(long, short = 'f', value_name = "FILE", env = "KLOUDLIB_INPUT_FILE")]
    pub file: Option<PathBuf>,

    /// Run the rules of the PostgreSQL component for the given release name.
    #[arg(long, value_name = "NAME", env = "KLOUDLIB_POSTGRESQL_RELEASE")]
    pub postgresql_release: Option<String>,

    /// The number of PostgreSQL read replicas the release was rendered with.
    #[arg(
        long,
        default_value_t = 0,
        requires = "postgresql_release",
        env = "KLOUDLIB_POSTGRESQL_READ_REPLICAS"
    )]
    pub read_replicas: u32,

    /// Change the apiVersion of objects of a kind, e.g. `StatefulSet:apps/v1beta2:apps/v1`.
    ///
    /// Can be given multiple times. Replacements run in the order they are given.
    #[arg(
        long = "replace-api-version",
        value_name = "KIND:FROM:TO",
        value_delimiter = ',',
        env = "KLOUDLIB_REPLACE_API_VERSIONS"
    )]
    pub replace_api_versions: Vec<ApiVersionReplacement>,

    /// Replace objects carrying a `helm.sh/hook` annotation with an empty list.
    #[arg(long, env = "KLOUDLIB_REMOVE_HELM_HOOKS")]
    pub remove_helm_hooks: bool,
}

impl TransformArguments {
    /// Assembles the pipeline. Component rules run first, then the explicit replacements, and
    /// hooks are removed last.
    pub fn pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new();

        if let Some(release_name) = &self.postgresql_release {
            let args = PostgreSqlArgs {
                replication: Replication {
                    replicas: self.read_replicas,
                    ..Replication::default()
                },
                ..PostgreSqlArgs::default()
            };
            // The passwords don't end up anywhere, only the rules are used
            let pg = PostgreSql::new(release_name, args, &RandomPasswordGenerator);
            pipeline.extend(pg.transformations());
        }

        for replacement in &self.replace_api_versions {
            pipeline.push(ReplaceApiVersion::new(
                &replacement.kind,
                &replacement.from,
                &replacement.to,
            ));
        }

        if self.remove_helm_hooks {
            pipeline.push(RemoveHelmHooks);
        }

        pipeline
    }
}

/// Reads the manifests from the input file, or `stdin` if none is set, and writes the
/// transformed manifests to `stdout`.
pub fn run(
    arguments: &TransformArguments,
    stdin: impl Read,
    stdout: impl Write,
) -> Result<(), Error> {
    let pipeline = arguments.pipeline();
    tracing::info!(
        transformations = ?pipeline.names().collect::<Vec<_>>(),
        "transforming manifests"
    );

    let manifests: Vec<Option<Manifest>> = match &arguments.file {
        Some(path) => {
            let file = File::open(path).context(OpenInputSnafu { path })?;
            yaml::deserialize_documents(BufReader::new(file))
        }
        None => yaml::deserialize_documents(stdin),
    }
    .context(ReadManifestsSnafu)?;

    let manifests = pipeline.apply_all(manifests).context(ApplyPipelineSnafu)?;
    tracing::debug!(count = manifests.len(), "transformed manifests");

    yaml::serialize_documents(&manifests, stdout, SerializeOptions::default())
        .context(WriteManifestsSnafu)
}

#[derive(Debug, Snafu)]
#[snafu(display("invalid api version replacement {input:?}, expected KIND:FROM:TO"))]
pub struct ParseApiVersionReplacementError {
    input: String,
}

/// A `KIND:FROM:TO` argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiVersionReplacement {
    pub kind: String,
    pub from: String,
    pub to: String,
}

impl FromStr for ApiVersionReplacement {
    type Err = ParseApiVersionReplacementError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = input.split(':').collect();
        let invalid = || ParseApiVersionReplacementError {
            input: input.to_owned(),
        };

        let [kind, from, to] = parts.as_slice() else {
            return Err(invalid());
        };
        if kind.is_empty() || from.is_empty() || to.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            kind: (*kind).to_owned(),
            from: (*from).to_owned(),
            to: (*to).to_owned(),
        })
    }
}
