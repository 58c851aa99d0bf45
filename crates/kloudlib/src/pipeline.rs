//! An ordered list of [`Transformation`]s applied to every manifest produced by chart expansion.
//!
//! ```
//! use kloudlib::{
//!     pipeline::Pipeline,
//!     transformation::{RemoveHelmHooks, SkipAwaitWithoutReplicas},
//! };
//!
//! let pipeline = Pipeline::new()
//!     .with(RemoveHelmHooks)
//!     .with(SkipAwaitWithoutReplicas::postgresql_read("pg", 0));
//!
//! assert_eq!(pipeline.len(), 2);
//! ```
use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::{
    manifest::Manifest,
    transformation::{self, Transformation},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to apply transformation {transformation:?} to {object}"))]
    ApplyTransformation {
        source: transformation::Error,
        transformation: String,
        object: String,
    },
}

/// Applies each of its rules, in order, to one manifest at a time.
///
/// Every rule sees the manifest as left behind by the rules before it. Manifests are independent
/// of each other, the pipeline keeps no state between them.
#[derive(Debug, Default)]
pub struct Pipeline {
    transformations: Vec<Box<dyn Transformation>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `transformation` and returns the pipeline, for chaining.
    pub fn with(mut self, transformation: impl Transformation + 'static) -> Self {
        self.push(transformation);
        self
    }

    pub fn push(&mut self, transformation: impl Transformation + 'static) -> &mut Self {
        self.transformations.push(Box::new(transformation));
        self
    }

    /// Appends all rules of `other` after the rules of `self`.
    pub fn extend(&mut self, other: Self) -> &mut Self {
        self.transformations.extend(other.transformations);
        self
    }

    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    /// The names of all rules, in the order they run.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transformations
            .iter()
            .map(|transformation| transformation.name())
    }

    /// Runs every rule over `manifest`.
    ///
    /// An absent manifest (e.g. an empty YAML document) is passed through as [`None`]. The first
    /// rule returning an error aborts the run, the error names the object as it was passed in.
    #[instrument(skip_all, fields(object))]
    pub fn apply(&self, manifest: Option<Manifest>) -> Result<Option<Manifest>> {
        let Some(mut manifest) = manifest else {
            tracing::trace!("skipping absent manifest");
            return Ok(None);
        };
        let object = manifest.to_string();
        tracing::Span::current().record("object", object.as_str());

        for transformation in &self.transformations {
            manifest = transformation
                .transform(manifest)
                .with_context(|_| ApplyTransformationSnafu {
                    transformation: transformation.name(),
                    object: object.clone(),
                })?;
        }

        Ok(Some(manifest))
    }

    /// Runs every rule over each of `manifests`, keeping their order.
    #[instrument(skip_all)]
    pub fn apply_all<I>(&self, manifests: I) -> Result<Vec<Option<Manifest>>>
    where
        I: IntoIterator<Item = Option<Manifest>>,
    {
        let manifests = manifests
            .into_iter()
            .map(|manifest| self.apply(manifest))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            count = manifests.len(),
            transformations = self.len(),
            "transformed manifests"
        );
        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde_json::json;

    use super::*;
    use crate::{
        kvp::SKIP_AWAIT_KEY,
        manifest::EmptyList,
        transformation::{
            FnTransformation, RemoveHelmHooks, ReplaceApiVersion, SkipAwaitWithoutReplicas,
        },
    };

    fn parse(input: &str) -> Option<Manifest> {
        serde_yaml::from_str(input).expect("test input is a valid manifest")
    }

    fn pipeline(read_replicas: u32) -> Pipeline {
        Pipeline::new()
            .with(RemoveHelmHooks)
            .with(ReplaceApiVersion::new(
                "StatefulSet",
                "apps/v1beta2",
                "apps/v1",
            ))
            .with(SkipAwaitWithoutReplicas::postgresql_read("pg", read_replicas))
    }

    #[test]
    fn test_pod_becomes_empty_list() {
        let manifest = parse(indoc! {"
            kind: Pod
            apiVersion: v1
            metadata:
              name: x
              annotations:
                helm.sh/hook: test
            spec:
              containers:
                - name: x
                  image: busybox
                  command: [sh, -c, 'pg_isready']
        "});

        let output = pipeline(0).apply(manifest).unwrap();

        assert_eq!(output, Some(Manifest::EmptyList(EmptyList)));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({ "kind": "List", "apiVersion": "v1", "metadata": {}, "items": [] })
        );
    }

    #[test]
    fn absent_manifest_passes_through() {
        assert_eq!(pipeline(0).apply(None).unwrap(), None);
        assert_eq!(Pipeline::new().apply(None).unwrap(), None);
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let manifest = parse(indoc! {"
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: config
            data:
              key: value
        "});

        assert_eq!(Pipeline::new().apply(manifest.clone()).unwrap(), manifest);
    }

    #[test]
    fn applying_twice_equals_applying_once() {
        let manifests = [
            indoc! {"
                apiVersion: v1
                kind: Pod
                metadata:
                  name: x
                  annotations:
                    helm.sh/hook: test
            "},
            indoc! {"
                apiVersion: v1
                kind: Service
                metadata:
                  name: pg-postgresql-read
            "},
            indoc! {"
                apiVersion: apps/v1beta2
                kind: StatefulSet
                metadata:
                  name: pg-postgresql-master
            "},
            indoc! {"
                apiVersion: example.com/v1
                kind: Widget
            "},
        ];

        let pipeline = pipeline(0);
        for input in manifests {
            let once = pipeline.apply(parse(input)).unwrap();
            let twice = pipeline.apply(once.clone()).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn later_rules_see_earlier_results() {
        let pipeline = Pipeline::new()
            .with(RemoveHelmHooks)
            .with(FnTransformation::new("assert-no-hooks", |manifest: Manifest| {
                if manifest.annotation("helm.sh/hook").is_some() {
                    return Err(transformation::Error::custom("hook survived"));
                }
                Ok(manifest)
            }));

        let output = pipeline
            .apply(parse(indoc! {"
                apiVersion: v1
                kind: Pod
                metadata:
                  name: x
                  annotations:
                    helm.sh/hook: test
            "}))
            .unwrap();
        assert_eq!(output, Some(Manifest::EmptyList(EmptyList)));
    }

    #[test]
    fn unmatched_objects_keep_unknown_fields() {
        let input = indoc! {"
            apiVersion: v1
            kind: Service
            metadata:
              name: pg-postgresql
            spec:
              ports:
                - port: 5432
              futureField: keep-me
            extraTopLevel:
              a: 1
        "};

        let output = pipeline(0).apply(parse(input)).unwrap();

        let expected: serde_json::Value = serde_yaml::from_str(input).unwrap();
        assert_eq!(serde_json::to_value(&output).unwrap(), expected);
    }

    #[test]
    fn rule_errors_propagate() {
        let pipeline = Pipeline::new()
            .with(RemoveHelmHooks)
            .with(FnTransformation::new("always-fails", |_| {
                Err(transformation::Error::custom("boom"))
            }));

        let err = pipeline
            .apply(parse(indoc! {"
                apiVersion: v1
                kind: ConfigMap
                metadata:
                  name: config
                  namespace: default
            "}))
            .unwrap_err();

        let Error::ApplyTransformation {
            transformation,
            object,
            ..
        } = &err;
        assert_eq!(transformation, "always-fails");
        assert_eq!(object, "ConfigMap/default/config");
    }

    #[test]
    fn rule_errors_name_the_input_object() {
        let pipeline = Pipeline::new()
            .with(RemoveHelmHooks)
            .with(FnTransformation::new("always-fails", |_| {
                Err(transformation::Error::custom("boom"))
            }));

        let err = pipeline
            .apply(parse(indoc! {"
                apiVersion: v1
                kind: Pod
                metadata:
                  name: pg-test
                  annotations:
                    helm.sh/hook: test
            "}))
            .unwrap_err();

        // The hook rule already replaced the pod with a List when the second rule failed
        let Error::ApplyTransformation { object, .. } = &err;
        assert_eq!(object, "Pod/pg-test");
    }

    #[test]
    fn apply_all_keeps_order() {
        let inputs = vec![
            parse(indoc! {"
                apiVersion: v1
                kind: Service
                metadata:
                  name: pg-postgresql
            "}),
            None,
            parse(indoc! {"
                apiVersion: v1
                kind: Service
                metadata:
                  name: pg-postgresql-read
            "}),
            parse(indoc! {"
                apiVersion: v1
                kind: Pod
                metadata:
                  name: pg-test
                  annotations:
                    helm.sh/hook: test
            "}),
        ];

        let outputs = pipeline(0).apply_all(inputs).unwrap();

        assert_eq!(outputs.len(), 4);
        assert_eq!(
            outputs[0].as_ref().and_then(Manifest::name),
            Some("pg-postgresql")
        );
        assert_eq!(
            outputs[0]
                .as_ref()
                .and_then(|manifest| manifest.annotation(SKIP_AWAIT_KEY)),
            None
        );
        assert!(outputs[1].is_none());
        assert_eq!(
            outputs[2]
                .as_ref()
                .and_then(|manifest| manifest.annotation(SKIP_AWAIT_KEY)),
            Some("true")
        );
        assert_eq!(outputs[3], Some(Manifest::EmptyList(EmptyList)));
    }

    #[test]
    fn read_replicas_disable_skip_await() {
        let outputs = pipeline(2)
            .apply(parse(indoc! {"
                apiVersion: v1
                kind: Service
                metadata:
                  name: pg-postgresql-read
            "}))
            .unwrap();

        assert_eq!(
            outputs
                .as_ref()
                .and_then(|manifest| manifest.annotation(SKIP_AWAIT_KEY)),
            None
        );
    }

    #[test]
    fn names_in_order() {
        assert_eq!(
            pipeline(0).names().collect::<Vec<_>>(),
            [
                "remove-helm-hooks",
                "replace-api-version",
                "skip-await-without-replicas"
            ]
        );
    }
}
