//! # JSON:API Wire Types
//!
//! Serde representations of the JSON:API document shape:
//!
//! * **[`Document`]**: top-level `data`, `included`, `meta`, `links` and `errors` members.
//! * **[`Resource`]**: a typed, identified resource object with attributes and relationships.
//! * **[`Relationship`]**: a named pointer whose [`Linkage`] is either to-one or to-many.
//!
//! ## References
//!
//! * [JSON:API v1.1](https://jsonapi.org/format/1.1/)
use crate::ordered::OrderedMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A minimal `{type, id}` reference to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Resource linkage of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    ToOne(ResourceIdentifier),
    ToMany(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationship {
    /// `None` for a missing `data` member, `Some(None)` for an explicit `null`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<Option<Linkage>>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub links: OrderedMap<Option<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Relationship {
    pub fn to_one(identifier: ResourceIdentifier) -> Self {
        Self {
            data: Some(Some(Linkage::ToOne(identifier))),
            ..Default::default()
        }
    }

    pub fn to_many(identifiers: Vec<ResourceIdentifier>) -> Self {
        Self {
            data: Some(Some(Linkage::ToMany(identifiers))),
            ..Default::default()
        }
    }
}

// Only called when the member is present, so `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A link member, either a bare URL or a link object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    Url(String),
    Object {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Value>,
    },
}

impl Link {
    pub fn href(&self) -> &str {
        match self {
            Link::Url(href) => href,
            Link::Object { href, .. } => href,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub attributes: OrderedMap<Value>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub relationships: OrderedMap<Relationship>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub links: OrderedMap<Option<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Resource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            attributes: OrderedMap::new(),
            relationships: OrderedMap::new(),
            links: OrderedMap::new(),
            meta: None,
        }
    }

    /// Returns the `{type, id}` pair, if the resource has an identity.
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.kind.clone(), id.clone()))
    }
}

/// Primary data of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Resource),
}

impl PrimaryData {
    pub fn resources(&self) -> &[Resource] {
        match self {
            PrimaryData::Many(resources) => resources,
            PrimaryData::One(resource) => std::slice::from_ref(resource),
        }
    }
}

/// A JSON:API error object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A top-level JSON:API document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub links: OrderedMap<Option<Link>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<Value>,
}

impl Document {
    /// A write payload carrying a single resource.
    pub fn single(resource: Resource) -> Self {
        Self {
            data: Some(PrimaryData::One(resource)),
            ..Default::default()
        }
    }

    /// The primary resources, empty for `data: null` or a missing `data` member.
    pub fn primary(&self) -> &[Resource] {
        self.data.as_ref().map(PrimaryData::resources).unwrap_or(&[])
    }

    /// Returns the URL of a top-level link such as `next` or `last`, skipping `null` links.
    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name)?.as_ref().map(Link::href)
    }
}
