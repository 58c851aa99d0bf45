//! Reusable infrastructure component definitions for Kubernetes, and the post-render
//! transformation pipeline used to patch manifests produced by chart expansion.
//!
//! The entry points are:
//!
//! - [`manifest::Manifest`], the typed view of a single rendered object.
//! - [`transformation::Transformation`] and the rules shipped with this crate.
//! - [`pipeline::Pipeline`], an ordered list of rules applied to every manifest.
//! - The [`components`], which assemble chart values and derived outputs.

pub mod commons;
pub mod components;
pub mod kvp;
pub mod logging;
pub mod manifest;
pub mod password;
pub mod pipeline;
pub mod transformation;

// External re-exports
pub use k8s_openapi;
pub use kube;
// Internal re-exports
pub use kloudlib_shared as shared;
