//! A registry credential Secret, for use in `imagePullSecrets`.
use std::collections::BTreeMap;

use educe::Educe;
use k8s_openapi::{
    api::core::v1::{LocalObjectReference, Secret},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde::Deserialize;

pub const SECRET_TYPE: &str = "kubernetes.io/dockerconfigjson";
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

#[derive(Clone, Deserialize, Educe, PartialEq, Eq)]
#[educe(Debug)]
pub struct ImagePullSecretArgs {
    /// The registry host, e.g. `ghcr.io`.
    pub server: String,
    pub username: String,

    #[educe(Debug(ignore))]
    pub password: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImagePullSecret {
    pub secret: Secret,
}

impl ImagePullSecret {
    pub fn new(name: &str, args: &ImagePullSecretArgs) -> Self {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                ..ObjectMeta::default()
            },
            type_: Some(SECRET_TYPE.to_owned()),
            string_data: Some(BTreeMap::from([(
                DOCKER_CONFIG_JSON_KEY.to_owned(),
                docker_config_json(args),
            )])),
            ..Secret::default()
        };

        Self { secret }
    }

    /// A reference to the secret, as used in a pod's `imagePullSecrets`.
    pub fn reference(&self) -> LocalObjectReference {
        LocalObjectReference {
            name: self.secret.metadata.name.clone().unwrap_or_default(),
        }
    }
}

/// Renders the `.dockerconfigjson` content for a single registry.
pub fn docker_config_json(args: &ImagePullSecretArgs) -> String {
    let mut auths = serde_json::Map::new();
    auths.insert(
        args.server.clone(),
        serde_json::json!({
            "username": args.username,
            "password": args.password,
        }),
    );

    serde_json::json!({ "auths": auths }).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args() -> ImagePullSecretArgs {
        ImagePullSecretArgs {
            server: "registry.example.com".to_owned(),
            username: "robot".to_owned(),
            password: "t0ken".to_owned(),
        }
    }

    #[test]
    fn builds_docker_config_secret() {
        let secret = ImagePullSecret::new("registry-credentials", &args()).secret;

        assert_eq!(secret.metadata.name.as_deref(), Some("registry-credentials"));
        assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/dockerconfigjson"));

        let config = secret
            .string_data
            .as_ref()
            .and_then(|data| data.get(".dockerconfigjson"))
            .expect("secret contains the docker config");
        let config: serde_json::Value = serde_json::from_str(config).unwrap();
        assert_eq!(
            config,
            json!({
                "auths": {
                    "registry.example.com": { "username": "robot", "password": "t0ken" },
                },
            })
        );
    }

    #[test]
    fn reference_uses_secret_name() {
        let secret = ImagePullSecret::new("registry-credentials", &args());
        assert_eq!(secret.reference().name, "registry-credentials");
    }

    #[test]
    fn password_is_not_logged() {
        assert!(!format!("{:?}", args()).contains("t0ken"));
    }
}
