use k8s_openapi::{Resource, api::core::v1::Service};

use crate::{
    kvp::{self, SKIP_AWAIT_KEY},
    manifest::Manifest,
    transformation::{Error, Transformation},
};

/// Tells the orchestration engine not to wait for a [`Service`] which has no pods behind it.
///
/// Some charts unconditionally create a service for an optional set of replicas. With zero
/// replicas, the service never gets any endpoints, and waiting for it to become ready blocks the
/// deployment forever. With at least one replica this rule does nothing.
///
/// The service is identified by name only, no other object in the namespace is expected to use
/// the same name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkipAwaitWithoutReplicas {
    service_name: String,
    replicas: u32,
}

impl SkipAwaitWithoutReplicas {
    pub fn new(service_name: impl Into<String>, replicas: u32) -> Self {
        Self {
            service_name: service_name.into(),
            replicas,
        }
    }

    /// Targets the `<release>-postgresql-read` service the PostgreSQL chart creates for its read
    /// replicas.
    pub fn postgresql_read(release_name: &str, read_replicas: u32) -> Self {
        Self::new(
            crate::components::postgresql::read_service_name(release_name),
            read_replicas,
        )
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Transformation for SkipAwaitWithoutReplicas {
    fn name(&self) -> &str {
        "skip-await-without-replicas"
    }

    fn transform(&self, mut manifest: Manifest) -> Result<Manifest, Error> {
        if self.replicas > 0
            || manifest.kind() != Service::KIND
            || manifest.name() != Some(self.service_name.as_str())
        {
            return Ok(manifest);
        }

        let object = manifest.to_string();
        if let Some(metadata) = manifest.metadata_mut() {
            if kvp::insert_annotation(metadata, SKIP_AWAIT_KEY, "true") {
                tracing::debug!(%object, "service has no replicas, skipping await");
            }
        }

        Ok(manifest)
    }
}
