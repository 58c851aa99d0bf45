use std::io::Write;

use clap::Args;
use educe::Educe;
use kloudlib::{
    components::image_pull_secret::{ImagePullSecret, ImagePullSecretArgs},
    shared::yaml::{self, SerializeOptions},
};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to write secret"))]
    WriteSecret { source: yaml::Error },
}

#[derive(Educe, PartialEq, Eq, Args)]
#[educe(Debug)]
pub struct ImagePullSecretArguments {
    /// The name of the Secret.
    #[arg(long, env = "KLOUDLIB_NAME")]
    pub name: String,

    /// The registry host, e.g. `ghcr.io`.
    #[arg(long, env = "KLOUDLIB_REGISTRY_SERVER")]
    pub server: String,

    #[arg(long, env = "KLOUDLIB_REGISTRY_USERNAME")]
    pub username: String,

    /// The registry password. Set it through the environment to keep it out of the process list.
    #[arg(long, env = "KLOUDLIB_REGISTRY_PASSWORD", hide_env_values = true)]
    #[educe(Debug(ignore))]
    pub password: String,
}

pub fn run(arguments: &ImagePullSecretArguments, stdout: impl Write) -> Result<(), Error> {
    let args = ImagePullSecretArgs {
        server: arguments.server.clone(),
        username: arguments.username.clone(),
        password: arguments.password.clone(),
    };
    let secret = ImagePullSecret::new(&arguments.name, &args);

    tracing::info!(
        name = %arguments.name,
        server = %arguments.server,
        "printing image pull secret"
    );
    yaml::serialize(&secret.secret, stdout, SerializeOptions::default()).context(WriteSecretSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments() -> ImagePullSecretArguments {
        ImagePullSecretArguments {
            name: "registry".to_owned(),
            server: "ghcr.io".to_owned(),
            username: "robot".to_owned(),
            password: "t0ken".to_owned(),
        }
    }

    #[test]
    fn prints_secret() {
        let mut output = Vec::new();
        run(&arguments(), &mut output).unwrap();

        let secret: serde_yaml::Value = serde_yaml::from_slice(&output).unwrap();
        assert_eq!(secret["kind"], "Secret");
        assert_eq!(secret["metadata"]["name"], "registry");
        assert_eq!(secret["type"], "kubernetes.io/dockerconfigjson");
    }

    #[test]
    fn password_is_not_logged() {
        assert!(!format!("{:?}", arguments()).contains("t0ken"));
    }
}
