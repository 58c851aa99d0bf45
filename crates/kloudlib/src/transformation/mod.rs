//! Rules which inspect and rewrite rendered manifests before they are handed to the
//! orchestration engine.
//!
//! A rule takes ownership of a [`Manifest`] and returns the (possibly different) manifest which
//! should take its place. Rules must:
//!
//! - leave manifests they don't recognize untouched, an unknown kind or missing metadata is
//!   never an error,
//! - be idempotent, applying a rule to its own output changes nothing,
//! - derive their match condition from the manifest alone, never from other manifests or from
//!   the order rules run in.
//!
//! Errors returned by a rule indicate a bug in the rule, not bad input, and are propagated to
//! the caller by the [`Pipeline`](crate::pipeline::Pipeline).
use std::fmt::Debug;

use snafu::Snafu;

use crate::manifest::{self, Manifest};

mod api_version;
mod helm_hooks;
mod skip_await;

pub use api_version::ReplaceApiVersion;
pub use helm_hooks::RemoveHelmHooks;
pub use skip_await::SkipAwaitWithoutReplicas;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to retype {kind} object from {from:?} to {to:?}"))]
    Retype {
        source: manifest::Error,
        kind: String,
        from: String,
        to: String,
    },

    #[snafu(display("{message}"))]
    Custom { message: String },
}

impl Error {
    /// Constructs an error for rules defined outside of this crate, e.g. via
    /// [`FnTransformation`].
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }
}

/// A single manifest transformation rule.
pub trait Transformation: Debug + Send + Sync {
    /// A short name identifying the rule in logs and errors.
    fn name(&self) -> &str;

    /// Transforms `manifest`, returning the manifest which takes its place.
    fn transform(&self, manifest: Manifest) -> Result<Manifest, Error>;
}

/// A [`Transformation`] backed by a closure.
///
/// ```
/// # use kloudlib::{manifest::Manifest, transformation::{FnTransformation, Transformation}};
/// let label_team = FnTransformation::new("label-team", |mut manifest: Manifest| {
///     if let Some(metadata) = manifest.metadata_mut() {
///         metadata
///             .labels
///             .get_or_insert_with(Default::default)
///             .insert("team".to_owned(), "data".to_owned());
///     }
///     Ok(manifest)
/// });
///
/// assert_eq!(label_team.name(), "label-team");
/// ```
pub struct FnTransformation<F> {
    name: String,
    transform: F,
}

impl<F> FnTransformation<F>
where
    F: Fn(Manifest) -> Result<Manifest, Error> + Send + Sync,
{
    pub fn new(name: impl Into<String>, transform: F) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }
}

impl<F> Debug for FnTransformation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTransformation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Transformation for FnTransformation<F>
where
    F: Fn(Manifest) -> Result<Manifest, Error> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, manifest: Manifest) -> Result<Manifest, Error> {
        (self.transform)(manifest)
    }
}

impl<T: Transformation + ?Sized> Transformation for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn transform(&self, manifest: Manifest) -> Result<Manifest, Error> {
        (**self).transform(manifest)
    }
}
