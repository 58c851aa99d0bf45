//! Grafana, based on the upstream `grafana` chart.
use std::collections::BTreeMap;

use educe::Educe;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::{
    commons::{Chart, HelmMeta, Ingress, Persistence},
    components::PersistenceValues,
    kvp::{INGRESS_CLASS_KEY, TLS_ACME_KEY},
    password::{DEFAULT_PASSWORD_LENGTH, PasswordGenerator},
};

pub const CHART_NAME: &str = "grafana";
pub const DEFAULT_CHART_VERSION: &str = "4.2.2";
pub const CHART_REPO: &str = "https://kubernetes-charts.storage.googleapis.com";

pub const ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize chart values for {name:?}"))]
    SerializeValues {
        source: serde_json::Error,
        name: String,
    },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaArgs {
    /// The chart version, defaults to [`DEFAULT_CHART_VERSION`].
    pub version: Option<String>,

    #[serde(default)]
    pub datasources: Vec<DataSource>,

    /// No ingress is created if unset.
    pub ingress: Option<Ingress>,

    /// No persistent storage is used if unset.
    pub persistence: Option<Persistence>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DataSource {
    pub name: String,

    #[serde(rename = "type")]
    pub type_: DataSourceType,

    pub url: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataSourceType {
    Prometheus,
    Loki,
}

/// A Grafana deployment with anonymous editor access and provisioned data sources.
#[derive(Clone, Educe)]
#[educe(Debug)]
pub struct Grafana {
    pub name: String,
    pub meta: HelmMeta,
    pub admin_username: String,

    #[educe(Debug(ignore))]
    pub admin_password: String,

    pub ingress: Option<Ingress>,
    pub persistence: Option<Persistence>,

    datasources: Vec<DataSource>,
}

impl Grafana {
    pub fn new(name: &str, args: GrafanaArgs, passwords: &impl PasswordGenerator) -> Self {
        let GrafanaArgs {
            version,
            datasources,
            ingress,
            persistence,
        } = args;

        Self {
            name: name.to_owned(),
            meta: HelmMeta {
                chart: CHART_NAME.to_owned(),
                version: version.unwrap_or_else(|| DEFAULT_CHART_VERSION.to_owned()),
                repo: CHART_REPO.to_owned(),
            },
            admin_username: ADMIN_USERNAME.to_owned(),
            admin_password: passwords.generate(DEFAULT_PASSWORD_LENGTH),
            ingress,
            persistence,
            datasources,
        }
    }

    /// The name of the secret holding the ingress TLS certificate.
    pub fn tls_secret_name(&self) -> String {
        format!("tls-grafana-{name}", name = self.name)
    }

    pub fn values(&self) -> Result<serde_json::Value, Error> {
        let values = Values {
            admin_user: &self.admin_username,
            admin_password: &self.admin_password,
            ingress: self.ingress_values(),
            deployment_strategy: DeploymentStrategy { type_: "Recreate" },
            persistence: match &self.persistence {
                Some(persistence) => PersistenceValues::from(persistence),
                None => PersistenceValues {
                    enabled: Some(false),
                    ..Default::default()
                },
            },
            test_framework: TestFramework { enabled: false },
            grafana_ini: GrafanaIni {
                server: ServerSection {
                    root_url: self.ingress.as_ref().map(|ingress| ingress.host.as_str()),
                },
                auth_anonymous: AnonymousAuthSection {
                    enabled: "true",
                    org_name: "Main Org.",
                    org_role: "Editor",
                },
                auth_basic: BasicAuthSection { enabled: "false" },
            },
            datasources: DataSourcesValues {
                datasources_yaml: DataSourcesFile {
                    api_version: 1,
                    datasources: self
                        .datasources
                        .iter()
                        .map(|datasource| DataSourceValues {
                            name: &datasource.name,
                            type_: datasource.type_,
                            url: &datasource.url,
                            access: "proxy",
                            basic_auth: false,
                            editable: false,
                        })
                        .collect(),
                },
            },
        };

        serde_json::to_value(values).with_context(|_| SerializeValuesSnafu {
            name: self.name.clone(),
        })
    }

    pub fn chart(&self) -> Result<Chart, Error> {
        Ok(Chart {
            release_name: self.name.clone(),
            namespace: None,
            meta: self.meta.clone(),
            values: self.values()?,
        })
    }

    fn ingress_values(&self) -> IngressValues<'_> {
        let Some(ingress) = &self.ingress else {
            return IngressValues {
                enabled: Some(false),
                ..Default::default()
            };
        };

        let mut annotations = BTreeMap::from([
            (
                INGRESS_CLASS_KEY.to_owned(),
                ingress
                    .class
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INGRESS_CLASS.to_owned()),
            ),
            (
                TLS_ACME_KEY.to_owned(),
                // TLS is on unless explicitly disabled
                (ingress.tls != Some(false)).to_string(),
            ),
        ]);
        annotations.extend(ingress.annotations.clone());

        IngressValues {
            enabled: ingress.enabled,
            annotations: Some(annotations),
            hosts: Some(vec![ingress.host.as_str()]),
            tls: Some(vec![IngressTlsValues {
                hosts: vec![ingress.host.as_str()],
                secret_name: self.tls_secret_name(),
            }]),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Values<'a> {
    admin_user: &'a str,
    admin_password: &'a str,
    ingress: IngressValues<'a>,
    deployment_strategy: DeploymentStrategy,
    persistence: PersistenceValues<'a>,
    test_framework: TestFramework,

    #[serde(rename = "grafana.ini")]
    grafana_ini: GrafanaIni<'a>,

    datasources: DataSourcesValues<'a>,
}

#[derive(Default, Serialize)]
struct IngressValues<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    hosts: Option<Vec<&'a str>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tls: Option<Vec<IngressTlsValues<'a>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressTlsValues<'a> {
    hosts: Vec<&'a str>,
    secret_name: String,
}

#[derive(Serialize)]
struct DeploymentStrategy {
    #[serde(rename = "type")]
    type_: &'static str,
}

#[derive(Serialize)]
struct TestFramework {
    enabled: bool,
}

#[derive(Serialize)]
struct GrafanaIni<'a> {
    server: ServerSection<'a>,

    #[serde(rename = "auth.anonymous")]
    auth_anonymous: AnonymousAuthSection,

    #[serde(rename = "auth.basic")]
    auth_basic: BasicAuthSection,
}

#[derive(Serialize)]
struct ServerSection<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    root_url: Option<&'a str>,
}

#[derive(Serialize)]
struct AnonymousAuthSection {
    enabled: &'static str,
    org_name: &'static str,
    org_role: &'static str,
}

#[derive(Serialize)]
struct BasicAuthSection {
    enabled: &'static str,
}

#[derive(Serialize)]
struct DataSourcesValues<'a> {
    #[serde(rename = "datasources.yaml")]
    datasources_yaml: DataSourcesFile<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataSourcesFile<'a> {
    api_version: u32,
    datasources: Vec<DataSourceValues<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataSourceValues<'a> {
    name: &'a str,

    #[serde(rename = "type")]
    type_: DataSourceType,

    url: &'a str,
    access: &'static str,
    basic_auth: bool,
    editable: bool,
}
