use std::io;

use clap::Parser;
use snafu::{ResultExt, Snafu};

mod chart;
mod secret;
mod transform;

const APP_NAME: &str = "kloudlib";
const LOG_ENV: &str = "KLOUDLIB_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitLogging { source: kloudlib::logging::Error },

    #[snafu(display("failed to transform manifests"))]
    Transform { source: transform::Error },

    #[snafu(display("failed to print chart"))]
    Chart { source: chart::Error },

    #[snafu(display("failed to print image pull secret"))]
    ImagePullSecret { source: secret::Error },
}

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(name = APP_NAME, author, version, about)]
enum Command {
    /// Run transformations over rendered chart manifests.
    ///
    /// Reads multi-document YAML (for example the output of `helm template`) and writes the
    /// transformed documents to stdout, in the same order.
    Transform(transform::TransformArguments),

    /// Print the chart, release and values to deploy a component with.
    #[command(subcommand)]
    Chart(chart::ChartCommand),

    /// Print a registry credential Secret for use in `imagePullSecrets`.
    ImagePullSecret(secret::ImagePullSecretArguments),
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let command = Command::parse();
    kloudlib::logging::initialize_logging(LOG_ENV, APP_NAME).context(InitLoggingSnafu)?;

    let stdout = io::stdout().lock();
    match command {
        Command::Transform(arguments) => {
            let stdin = io::stdin().lock();
            transform::run(&arguments, stdin, stdout).context(TransformSnafu)
        }
        Command::Chart(chart_command) => chart::run(&chart_command, stdout).context(ChartSnafu),
        Command::ImagePullSecret(arguments) => {
            secret::run(&arguments, stdout).context(ImagePullSecretSnafu)
        }
    }
}
