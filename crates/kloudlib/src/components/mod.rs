//! Component definitions. A component turns a small set of user inputs into the [`Chart`] to
//! deploy, the [`Pipeline`] to run over the rendered manifests, and the derived outputs
//! (hostnames, credentials, connection strings) other components consume.
//!
//! [`Chart`]: crate::commons::Chart
//! [`Pipeline`]: crate::pipeline::Pipeline
use serde::Serialize;

use crate::commons::Persistence;

pub mod grafana;
pub mod image_pull_secret;
pub mod postgresql;

/// The chart values for [`Persistence`]. Unset fields are left to the chart defaults.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistenceValues<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<&'a str>,
}

impl<'a> From<&'a Persistence> for PersistenceValues<'a> {
    fn from(persistence: &'a Persistence) -> Self {
        Self {
            enabled: persistence.enabled,
            size: Some(persistence.size()),
            storage_class: persistence.storage_class.as_deref(),
        }
    }
}
