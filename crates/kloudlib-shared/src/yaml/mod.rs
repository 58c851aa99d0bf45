//! Utility functions for processing data in the YAML file format
use std::io::{Read, Write};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents every error which can be encountered during YAML (de)serialization.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to deserialize YAML document #{index}"))]
    DeserializeYaml {
        source: serde_yaml::Error,
        index: usize,
    },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },
}

/// Provides configurable options during YAML serialization.
///
/// For most people the default implementation [`SerializeOptions::default()`] is sufficient as it
/// enables explicit document and disables singleton map serialization, which is the layout
/// Kubernetes tooling expects.
#[derive(Clone, Copy, Debug)]
pub struct SerializeOptions {
    /// Adds leading triple dashes (`---`) to the output string.
    pub explicit_document: bool,

    /// Serialize enum variants as YAML maps using the variant name as the key.
    pub singleton_map: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            explicit_document: true,
            singleton_map: false,
        }
    }
}

/// Serializes the given data structure and writes it to a [`Writer`](Write).
pub fn serialize<T, W>(value: &T, mut writer: W, options: SerializeOptions) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    if options.explicit_document {
        writer
            .write_all(b"---\n")
            .context(WriteDocumentSeparatorSnafu)?;
    }

    let mut serializer = serde_yaml::Serializer::new(writer);

    if options.singleton_map {
        serde_yaml::with::singleton_map_recursive::serialize(value, &mut serializer)
            .context(SerializeYamlSnafu)?;
    } else {
        value
            .serialize(&mut serializer)
            .context(SerializeYamlSnafu)?;
    }

    Ok(())
}

/// Serializes every item of `documents` as its own YAML document, separated by `---`.
///
/// The separator is always written, regardless of [`SerializeOptions::explicit_document`],
/// otherwise the documents could not be told apart when read back.
pub fn serialize_documents<'a, T, I, W>(
    documents: I,
    mut writer: W,
    options: SerializeOptions,
) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
    W: Write,
{
    let options = SerializeOptions {
        explicit_document: true,
        ..options
    };

    for document in documents {
        serialize(document, &mut writer, options)?;
    }

    Ok(())
}

/// Reads a multi-document YAML stream and deserializes every document into `T`.
///
/// Documents which are `null` (or contain nothing at all) are returned as [`None`], so the caller
/// keeps the positional correspondence between input and output.
pub fn deserialize_documents<T, R>(reader: R) -> Result<Vec<Option<T>>>
where
    T: DeserializeOwned,
    R: Read,
{
    serde_yaml::Deserializer::from_reader(reader)
        .enumerate()
        .map(|(index, document)| {
            Option::<T>::deserialize(document).context(DeserializeYamlSnafu { index })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    type Document = BTreeMap<String, String>;

    #[rstest]
    #[case::multiple_documents(indoc! {"
        ---
        kind: Service
        ---
        kind: Pod
    "}, &[Some("Service"), Some("Pod")])]
    #[case::without_leading_separator(indoc! {"
        kind: Service
        ---
        kind: Pod
    "}, &[Some("Service"), Some("Pod")])]
    #[case::null_document(indoc! {"
        ---
        kind: Service
        --- null
        ---
        kind: Pod
    "}, &[Some("Service"), None, Some("Pod")])]
    #[case::single_null_document("null\n", &[None])]
    fn reads_documents_in_order(#[case] input: &str, #[case] expected: &[Option<&str>]) {
        let documents: Vec<Option<Document>> =
            deserialize_documents(input.as_bytes()).expect("test input is valid YAML");

        let kinds: Vec<_> = documents
            .iter()
            .map(|document| document.as_ref().and_then(|doc| doc.get("kind")).map(String::as_str))
            .collect();
        assert_eq!(kinds, expected);
    }

    #[test]
    fn reports_broken_document_index() {
        let input = indoc! {"
            ---
            kind: Service
            ---
            - not
            - a
            - mapping
        "};

        let err = deserialize_documents::<Document, _>(input.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::DeserializeYaml { index: 1, .. }));
    }

    #[test]
    fn writes_document_separators() {
        let documents = vec![
            Some(Document::from([("kind".to_owned(), "Service".to_owned())])),
            None,
        ];

        let mut buffer = Vec::new();
        serialize_documents(&documents, &mut buffer, SerializeOptions::default()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "---\nkind: Service\n---\nnull\n");
    }
}
