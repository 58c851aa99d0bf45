//! Input and output records shared by the [components](crate::components).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifies the Helm chart a component deploys.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct HelmMeta {
    pub chart: String,
    pub version: String,
    pub repo: String,
}

/// Persistent storage configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Persistence {
    /// Leaving this unset keeps the chart default.
    pub enabled: Option<bool>,

    /// The volume size in GiB.
    #[serde(rename = "sizeGB")]
    pub size_gb: u32,

    pub storage_class: Option<String>,
}

impl Persistence {
    /// The volume size as Kubernetes quantity, e.g. `10Gi`.
    pub fn size(&self) -> String {
        format!("{size}Gi", size = self.size_gb)
    }
}

/// Ingress resource configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    pub enabled: Option<bool>,
    pub host: String,

    /// The ingress class, defaults to `nginx` where used.
    pub class: Option<String>,

    /// Whether to request a TLS certificate. Only an explicit `false` disables TLS.
    pub tls: Option<bool>,

    /// Additional annotations, these take precedence over the ones a component sets.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Compute resource requests and limits.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ComputeResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceList>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceList>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResourceList {
    /// A CPU quantity, e.g. `500m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// A memory quantity, e.g. `512Mi`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Everything the chart expansion engine needs to render a component.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub release_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(flatten)]
    pub meta: HelmMeta,

    pub values: serde_json::Value,
}
