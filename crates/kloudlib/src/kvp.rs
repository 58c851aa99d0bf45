//! Well-known annotation keys and helpers to manipulate annotations on [`ObjectMeta`].
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/annotations/>
//! for more information on Kubernetes annotations.
use std::collections::BTreeMap;

use const_format::concatcp;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// The Helm key prefix.
const HELM_KEY_PREFIX: &str = "helm.sh/";

/// The Pulumi key prefix, understood by the orchestration engine consuming our manifests.
const PULUMI_KEY_PREFIX: &str = "pulumi.com/";

/// The well-known Kubernetes key prefix.
const K8S_KEY_PREFIX: &str = "kubernetes.io/";

/// The Helm hook key `helm.sh/hook`. Objects carrying it only exist to run as a transient step
/// during install or upgrade (e.g. `test`, `pre-install`), and are not steady-state resources.
pub const HELM_HOOK_KEY: &str = concatcp!(HELM_KEY_PREFIX, "hook");

/// The skip-await key `pulumi.com/skipAwait`. When set to `"true"`, the orchestration engine
/// does not block until the object becomes ready.
pub const SKIP_AWAIT_KEY: &str = concatcp!(PULUMI_KEY_PREFIX, "skipAwait");

/// The ingress class key `kubernetes.io/ingress.class`.
pub const INGRESS_CLASS_KEY: &str = concatcp!(K8S_KEY_PREFIX, "ingress.class");

/// The ACME TLS key `kubernetes.io/tls-acme`, picked up by certificate controllers.
pub const TLS_ACME_KEY: &str = concatcp!(K8S_KEY_PREFIX, "tls-acme");

/// Returns the value of the annotation `key`, treating a missing annotation map as empty.
pub fn annotation<'a>(metadata: &'a ObjectMeta, key: &str) -> Option<&'a str> {
    metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(key))
        .map(String::as_str)
}

/// Inserts (or overwrites) the annotation `key`, creating the annotation map if needed.
///
/// Returns `true` if the annotations changed.
pub fn insert_annotation(metadata: &mut ObjectMeta, key: &str, value: &str) -> bool {
    let annotations = metadata.annotations.get_or_insert_with(BTreeMap::new);

    if annotations.get(key).is_some_and(|current| current == value) {
        return false;
    }

    annotations.insert(key.to_owned(), value.to_owned());
    true
}
