use crate::{
    kvp::HELM_HOOK_KEY,
    manifest::{EmptyList, Manifest},
    transformation::{Error, Transformation},
};

/// Collapses Helm hook objects (e.g. `helm test` pods) into an [`EmptyList`].
///
/// Hooks only run as transient steps during install or upgrade. Submitted as regular objects,
/// the orchestration engine would track them as steady-state resources and wait on them.
///
/// An object counts as a hook if its `helm.sh/hook` annotation is set to a non-empty value.
#[derive(Clone, Copy, Debug, Default)]
pub struct RemoveHelmHooks;

impl Transformation for RemoveHelmHooks {
    fn name(&self) -> &str {
        "remove-helm-hooks"
    }

    fn transform(&self, manifest: Manifest) -> Result<Manifest, Error> {
        match manifest.annotation(HELM_HOOK_KEY) {
            Some(hook) if !hook.is_empty() => {
                tracing::debug!(object = %manifest, hook, "replacing helm hook with an empty list");
                Ok(Manifest::EmptyList(EmptyList))
            }
            _ => Ok(manifest),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn parse(input: &str) -> Manifest {
        serde_yaml::from_str(input).expect("test input is a valid manifest")
    }

    #[rstest]
    #[case::test_pod(indoc! {r#"
        apiVersion: v1
        kind: Pod
        metadata:
          name: x
          annotations:
            helm.sh/hook: test
        spec:
          containers:
            - name: test
              image: busybox
    "#})]
    #[case::pre_install_job(indoc! {r#"
        apiVersion: batch/v1
        kind: Job
        metadata:
          name: migrate
          namespace: db
          annotations:
            helm.sh/hook: pre-install,pre-upgrade
            helm.sh/hook-weight: "-5"
    "#})]
    #[case::unknown_kind(indoc! {r#"
        apiVersion: example.com/v1
        kind: Widget
        metadata:
          name: w
          annotations:
            helm.sh/hook: test-success
        spec:
          size: 3
    "#})]
    fn collapses_hooks(#[case] input: &str) {
        let output = RemoveHelmHooks.transform(parse(input)).unwrap();

        assert_eq!(output, Manifest::EmptyList(EmptyList));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({ "apiVersion": "v1", "kind": "List", "metadata": {}, "items": [] })
        );
    }

    #[rstest]
    #[case::no_annotations(indoc! {"
        apiVersion: v1
        kind: Service
        metadata:
          name: pg-postgresql
    "})]
    #[case::other_annotations(indoc! {"
        apiVersion: v1
        kind: Pod
        metadata:
          name: x
          annotations:
            prometheus.io/scrape: 'true'
    "})]
    #[case::empty_hook(indoc! {"
        apiVersion: v1
        kind: Pod
        metadata:
          name: x
          annotations:
            helm.sh/hook: ''
    "})]
    #[case::no_metadata(indoc! {"
        apiVersion: example.com/v1
        kind: Widget
    "})]
    fn leaves_other_objects_untouched(#[case] input: &str) {
        let manifest = parse(input);
        let output = RemoveHelmHooks.transform(manifest.clone()).unwrap();

        assert_eq!(output, manifest);
    }

    #[test]
    fn is_idempotent() {
        let manifest = parse(indoc! {"
            apiVersion: v1
            kind: Pod
            metadata:
              name: x
              annotations:
                helm.sh/hook: test
        "});

        let once = RemoveHelmHooks.transform(manifest).unwrap();
        let twice = RemoveHelmHooks.transform(once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}
