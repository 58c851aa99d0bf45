//! A typed view of a single object produced by chart expansion.
//!
//! Rendered charts contain arbitrary objects. The kinds our transformations care about are
//! parsed into their [`k8s_openapi`] types, everything else is kept as a [`DynamicObject`] so
//! no information is lost on the way back out. An object of a known kind is only typed if the
//! typed struct reproduces it exactly, fields the struct doesn't model keep it dynamic.
use std::{collections::BTreeMap, fmt::Display};

use k8s_openapi::{
    api::{
        apps::v1::StatefulSet,
        batch::v1::Job,
        core::v1::{Pod, Service},
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kube::core::{DynamicObject, TypeMeta};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, DeserializeOwned},
    ser::SerializeStruct,
};
use snafu::{ResultExt, Snafu};

use crate::kvp;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to convert {object} into a dynamic object"))]
    ConvertToDynamic {
        source: serde_json::Error,
        object: String,
    },
}

/// One rendered object, as handed from chart expansion to the orchestration engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Manifest {
    Service(Box<Service>),
    Pod(Box<Pod>),
    Job(Box<Job>),
    StatefulSet(Box<StatefulSet>),

    /// The inert placeholder objects are collapsed into. See [`EmptyList`].
    EmptyList(EmptyList),

    /// Any object which is not one of the kinds above, or which did not parse as its typed
    /// counterpart.
    Dynamic(Box<DynamicObject>),
}

impl Manifest {
    /// Classifies `object` by its `apiVersion` and `kind`.
    ///
    /// This never fails: an object of a known kind which doesn't parse as the typed struct, or
    /// which carries fields the typed struct would drop, stays [`Manifest::Dynamic`].
    pub fn from_dynamic(object: DynamicObject) -> Self {
        let typed = match &object.types {
            Some(types) if is::<Service>(types) => parse_typed(&object).map(Self::Service),
            Some(types) if is::<Pod>(types) => parse_typed(&object).map(Self::Pod),
            Some(types) if is::<Job>(types) => parse_typed(&object).map(Self::Job),
            Some(types) if is::<StatefulSet>(types) => {
                parse_typed(&object).map(Self::StatefulSet)
            }
            Some(_) if EmptyList::matches(&object) => Some(Self::EmptyList(EmptyList)),
            _ => None,
        };

        typed.unwrap_or_else(|| Self::Dynamic(Box::new(object)))
    }

    /// Converts `self` into a [`DynamicObject`], e.g. to edit fields the typed structs don't
    /// allow to change (like `apiVersion`).
    pub fn into_dynamic(self) -> Result<DynamicObject, Error> {
        let object = self.to_string();
        let value = match self {
            Self::Dynamic(object) => return Ok(*object),
            Self::Service(service) => serde_json::to_value(service),
            Self::Pod(pod) => serde_json::to_value(pod),
            Self::Job(job) => serde_json::to_value(job),
            Self::StatefulSet(stateful_set) => serde_json::to_value(stateful_set),
            Self::EmptyList(list) => serde_json::to_value(list),
        };

        value
            .and_then(serde_json::from_value)
            .context(ConvertToDynamicSnafu { object })
    }

    pub fn api_version(&self) -> &str {
        match self {
            Self::Service(_) => resource_api_version::<Service>(),
            Self::Pod(_) => resource_api_version::<Pod>(),
            Self::Job(_) => resource_api_version::<Job>(),
            Self::StatefulSet(_) => resource_api_version::<StatefulSet>(),
            Self::EmptyList(_) => EmptyList::API_VERSION,
            Self::Dynamic(object) => match &object.types {
                Some(types) => types.api_version.as_str(),
                None => untyped_field(object, "apiVersion"),
            },
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Service(_) => resource_kind::<Service>(),
            Self::Pod(_) => resource_kind::<Pod>(),
            Self::Job(_) => resource_kind::<Job>(),
            Self::StatefulSet(_) => resource_kind::<StatefulSet>(),
            Self::EmptyList(_) => EmptyList::KIND,
            Self::Dynamic(object) => match &object.types {
                Some(types) => types.kind.as_str(),
                None => untyped_field(object, "kind"),
            },
        }
    }

    /// The object metadata, or [`None`] for the [`EmptyList`] placeholder, which has none.
    pub fn metadata(&self) -> Option<&ObjectMeta> {
        match self {
            Self::Service(service) => Some(&service.metadata),
            Self::Pod(pod) => Some(&pod.metadata),
            Self::Job(job) => Some(&job.metadata),
            Self::StatefulSet(stateful_set) => Some(&stateful_set.metadata),
            Self::EmptyList(_) => None,
            Self::Dynamic(object) => Some(&object.metadata),
        }
    }

    pub fn metadata_mut(&mut self) -> Option<&mut ObjectMeta> {
        match self {
            Self::Service(service) => Some(&mut service.metadata),
            Self::Pod(pod) => Some(&mut pod.metadata),
            Self::Job(job) => Some(&mut job.metadata),
            Self::StatefulSet(stateful_set) => Some(&mut stateful_set.metadata),
            Self::EmptyList(_) => None,
            Self::Dynamic(object) => Some(&mut object.metadata),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata()?.name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata()?.namespace.as_deref()
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata()?.annotations.as_ref()
    }

    /// Returns the value of the annotation `key`. Missing metadata or a missing annotation map
    /// are treated as "no annotations".
    pub fn annotation(&self, key: &str) -> Option<&str> {
        kvp::annotation(self.metadata()?, key)
    }
}

impl Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind() {
            "" => "<unknown kind>",
            kind => kind,
        };
        let name = self.name().unwrap_or("<unnamed>");

        match self.namespace() {
            Some(namespace) => write!(f, "{kind}/{namespace}/{name}"),
            None => write!(f, "{kind}/{name}"),
        }
    }
}

impl From<Service> for Manifest {
    fn from(service: Service) -> Self {
        Self::Service(Box::new(service))
    }
}

impl From<Pod> for Manifest {
    fn from(pod: Pod) -> Self {
        Self::Pod(Box::new(pod))
    }
}

impl From<Job> for Manifest {
    fn from(job: Job) -> Self {
        Self::Job(Box::new(job))
    }
}

impl From<StatefulSet> for Manifest {
    fn from(stateful_set: StatefulSet) -> Self {
        Self::StatefulSet(Box::new(stateful_set))
    }
}

impl From<DynamicObject> for Manifest {
    fn from(object: DynamicObject) -> Self {
        Self::from_dynamic(object)
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Service(service) => service.serialize(serializer),
            Self::Pod(pod) => pod.serialize(serializer),
            Self::Job(job) => job.serialize(serializer),
            Self::StatefulSet(stateful_set) => stateful_set.serialize(serializer),
            Self::EmptyList(list) => list.serialize(serializer),
            Self::Dynamic(object) => object.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let serde_json::Value::Object(mut fields) = serde_json::Value::deserialize(deserializer)?
        else {
            return Err(de::Error::custom("a manifest must be a mapping"));
        };

        // Chart templates are allowed to omit the metadata, our object model is not
        let metadata = match fields.remove("metadata") {
            None | Some(serde_json::Value::Null) => ObjectMeta::default(),
            Some(metadata) => serde_json::from_value(metadata).map_err(de::Error::custom)?,
        };

        // Without both apiVersion and kind there is no TypeMeta, whichever one is present stays
        // in the data
        let api_version = fields.get("apiVersion").and_then(serde_json::Value::as_str);
        let kind = fields.get("kind").and_then(serde_json::Value::as_str);
        let types = match (api_version, kind) {
            (Some(api_version), Some(kind)) => Some(TypeMeta {
                api_version: api_version.to_owned(),
                kind: kind.to_owned(),
            }),
            _ => None,
        };
        if types.is_some() {
            fields.remove("apiVersion");
            fields.remove("kind");
        }

        Ok(Self::from_dynamic(DynamicObject {
            types,
            metadata,
            data: serde_json::Value::Object(fields),
        }))
    }
}

/// The minimal, valid and inert object a manifest is collapsed into when it must not be tracked
/// by the orchestration engine.
///
/// It always serializes as `{apiVersion: v1, kind: List, metadata: {}, items: []}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmptyList;

impl EmptyList {
    pub const API_VERSION: &str = "v1";
    pub const KIND: &str = "List";

    fn matches(object: &DynamicObject) -> bool {
        let Some(types) = &object.types else {
            return false;
        };
        if types.api_version != Self::API_VERSION || types.kind != Self::KIND {
            return false;
        }
        if object.metadata != ObjectMeta::default() {
            return false;
        }

        match &object.data {
            serde_json::Value::Object(fields) => {
                fields.len() == 1
                    && fields
                        .get("items")
                        .and_then(serde_json::Value::as_array)
                        .is_some_and(Vec::is_empty)
            }
            _ => false,
        }
    }
}

impl Serialize for EmptyList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut list = serializer.serialize_struct("List", 4)?;
        list.serialize_field("apiVersion", Self::API_VERSION)?;
        list.serialize_field("kind", Self::KIND)?;
        list.serialize_field("metadata", &serde_json::Map::new())?;
        list.serialize_field("items", &[] as &[serde_json::Value])?;
        list.end()
    }
}

fn is<K: k8s_openapi::Resource>(types: &TypeMeta) -> bool {
    types.api_version == K::API_VERSION && types.kind == K::KIND
}

fn resource_api_version<K: k8s_openapi::Resource>() -> &'static str {
    K::API_VERSION
}

fn resource_kind<K: k8s_openapi::Resource>() -> &'static str {
    K::KIND
}

/// Reads `apiVersion` or `kind` from an object which lacks the other one.
fn untyped_field<'a>(object: &'a DynamicObject, key: &str) -> &'a str {
    object
        .data
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
}

fn parse_typed<K>(object: &DynamicObject) -> Option<Box<K>>
where
    K: Serialize + DeserializeOwned,
{
    let parsed = serde_json::to_value(object).and_then(|value| {
        let typed: K = serde_json::from_value(value.clone())?;
        let lossless = serde_json::to_value(&typed)? == value;
        Ok((typed, lossless))
    });

    match parsed {
        Ok((typed, true)) => Some(Box::new(typed)),
        Ok((_, false)) => {
            tracing::trace!(
                name = ?object.metadata.name,
                "object has fields its typed resource doesn't model, keeping it dynamic"
            );
            None
        }
        Err(error) => {
            tracing::trace!(
                %error,
                name = ?object.metadata.name,
                "object did not parse as its typed resource, keeping it dynamic"
            );
            None
        }
    }
}
