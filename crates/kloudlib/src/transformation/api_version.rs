use snafu::ResultExt;

use crate::{
    manifest::Manifest,
    transformation::{Error, RetypeSnafu, Transformation},
};

/// Rewrites the `apiVersion` of every object of `kind` from `from` to `to`.
///
/// Older charts still render objects with API versions the cluster no longer serves, e.g.
/// `apps/v1beta2` StatefulSets. The rewritten object is classified again, so it becomes typed if
/// the new API version is one we know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplaceApiVersion {
    kind: String,
    from: String,
    to: String,
}

impl ReplaceApiVersion {
    pub fn new(kind: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Transformation for ReplaceApiVersion {
    fn name(&self) -> &str {
        "replace-api-version"
    }

    fn transform(&self, manifest: Manifest) -> Result<Manifest, Error> {
        if manifest.kind() != self.kind || manifest.api_version() != self.from {
            return Ok(manifest);
        }

        let object = manifest.to_string();
        let mut dynamic = manifest.into_dynamic().with_context(|_| RetypeSnafu {
            kind: self.kind.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        })?;

        if let Some(types) = &mut dynamic.types {
            types.api_version.clone_from(&self.to);
        }

        tracing::debug!(%object, from = %self.from, to = %self.to, "replaced api version");
        Ok(Manifest::from_dynamic(dynamic))
    }
}
