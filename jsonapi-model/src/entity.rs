//! # Entity
//!
//! An [`Entity`] is a shared handle to one resource instance. Cloning the handle does not copy
//! the instance: every clone observes the same identity, attributes and relations, and
//! [`Entity::ptr_eq`] tells whether two handles point at the same instance. This is what lets
//! an assembled response graph represent shared and circular relationships.
//!
//! ## State
//!
//! * **Identity**: `None` until the resource exists on the server. An entity with a non-empty
//!   identity is *persisted*, which alone decides whether [`Entity::save`] creates or updates.
//! * **Attributes**: an [`OrderedMap`] of JSON values, in assignment order. Attributes
//!   registered as dates are validated and normalized to their configured format on write,
//!   and parsed back into [`DateTime<FixedOffset>`] on read.
//! * **Relations**: an [`OrderedMap`] of [`Relation`] values. A name can never be both an
//!   attribute and a relation.
//!
//! ## Ownership
//!
//! Entities assembled from one response share a [`Graph`] that owns all of them. Relations
//! between members of the same graph are held weakly, and every handle into the graph keeps
//! the whole graph alive, so a circular graph is freed once its last handle is dropped.
//!
//! Relations set between entities that do not share a graph hold their targets strongly.
//! A cycle built that way by hand stays alive until [`Entity::clear_relations`] breaks it.
//!
//! ## Persistence
//!
//! [`Entity::save`], [`Entity::create`], [`Entity::delete`] and [`Entity::fresh`] each issue a
//! single request through the type's transport. Transport failures reach the caller unchanged.
use crate::{
    config::{ConfigError, EntityType},
    date,
    document::{Document, PrimaryData, Relationship, Resource, ResourceIdentifier},
    error::Error,
    model::Model,
    ordered::OrderedMap,
    query::{self, Query},
    registry::Registry,
    relation::{ToManyRelation, ToOneRelation},
    response::{Refresh, SaveResponse},
};
use chrono::{DateTime, FixedOffset};
use http::Method;
use serde_json::Value;
use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};
use tracing::debug;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributeError {
    #[error("Attribute '{attribute}' expects a date, got '{value}'")]
    InvalidDate { attribute: String, value: String },
    #[error("Date format '{format}' of attribute '{attribute}' cannot render the value")]
    UnsupportedFormat { attribute: String, format: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntityError {
    #[error("'{0}' is already a relation and cannot be used as an attribute")]
    AttributeIsRelation(String),
    #[error("'{0}' is already an attribute and cannot be used as a relation")]
    RelationIsAttribute(String),
}

/// The value of a relation slot, decided when the relation is set.
#[derive(Debug, Clone)]
pub enum Relation {
    /// Explicitly empty. Never serialized.
    Absent,
    One(Entity),
    Many(Vec<Entity>),
}

impl Relation {
    /// The related entities, in order.
    pub fn entities(&self) -> &[Entity] {
        match self {
            Relation::Absent => &[],
            Relation::One(entity) => std::slice::from_ref(entity),
            Relation::Many(entities) => entities,
        }
    }

    /// Only persisted targets can be referenced. A relation without any is left out.
    fn to_relationship(&self) -> Option<Relationship> {
        match self {
            Relation::Absent => None,
            Relation::One(entity) => entity.resource_identifier().map(Relationship::to_one),
            Relation::Many(entities) => {
                let identifiers: Vec<_> = entities
                    .iter()
                    .filter_map(Entity::resource_identifier)
                    .collect();
                (!identifiers.is_empty()).then(|| Relationship::to_many(identifiers))
            }
        }
    }
}

/// An attribute as read through its type's date configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Date(DateTime<FixedOffset>),
    Json(Value),
}

/// Owns every entity assembled from one response document.
pub(crate) struct Graph {
    members: Vec<Arc<EntityInner>>,
}

impl Graph {
    pub(crate) fn new(members: &[Entity]) -> Arc<Self> {
        Arc::new(Self {
            members: members.iter().map(|e| e.inner.clone()).collect(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }
}

#[derive(Clone)]
enum Target {
    Owned(Entity),
    Member(Weak<EntityInner>),
}

#[derive(Clone)]
enum Slot {
    Absent,
    One(Target),
    Many(Vec<Target>),
}

#[derive(Default)]
struct EntityState {
    id: Option<String>,
    attributes: OrderedMap<Value>,
    relations: OrderedMap<Slot>,
}

struct EntityInner {
    registry: Arc<Registry>,
    ty: Arc<EntityType>,
    state: RwLock<EntityState>,
}

#[derive(Clone)]
pub struct Entity {
    inner: Arc<EntityInner>,
    graph: Option<Arc<Graph>>,
}

impl Entity {
    pub(crate) fn new(registry: Arc<Registry>, ty: Arc<EntityType>) -> Self {
        Self {
            inner: Arc::new(EntityInner {
                registry,
                ty,
                state: RwLock::new(EntityState::default()),
            }),
            graph: None,
        }
    }

    /// A handle to the same instance that keeps `graph` alive.
    pub(crate) fn in_graph(&self, graph: &Arc<Graph>) -> Entity {
        Entity {
            inner: self.inner.clone(),
            graph: Some(graph.clone()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EntityState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntityState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.inner.ty
    }

    pub fn resource_type(&self) -> &str {
        self.inner.ty.resource_type()
    }

    pub fn id(&self) -> Option<String> {
        self.read().id.clone()
    }

    pub fn set_id(&self, id: Option<String>) {
        self.write().id = id;
    }

    /// The identity, when it is usable for addressing the resource.
    fn persisted_id(&self) -> Option<String> {
        self.id().filter(|id| !id.is_empty())
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted_id().is_some()
    }

    pub fn resource_identifier(&self) -> Option<ResourceIdentifier> {
        self.persisted_id()
            .map(|id| ResourceIdentifier::new(self.resource_type(), id))
    }

    // Attributes

    /// The stored JSON value, without date interpretation.
    pub fn raw_attribute(&self, name: &str) -> Option<Value> {
        self.read().attributes.get(name).cloned()
    }

    /// Reads an attribute, parsing it as a date if its type registers it as one.
    pub fn attribute(&self, name: &str) -> Result<Option<AttributeValue>, AttributeError> {
        let Some(value) = self.raw_attribute(name) else {
            return Ok(None);
        };

        match self.inner.ty.date_format(name) {
            None => Ok(Some(AttributeValue::Json(value))),
            Some(_) if value.is_null() => Ok(Some(AttributeValue::Json(value))),
            Some(format) => parse_date(name, &value, format)
                .map(AttributeValue::Date)
                .map(Some),
        }
    }

    /// Reads a date attribute. Values stored under plain attributes are parsed as ISO 8601.
    pub fn date(&self, name: &str) -> Result<Option<DateTime<FixedOffset>>, AttributeError> {
        let Some(value) = self.raw_attribute(name).filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let format = self.inner.ty.date_format(name).unwrap_or(ISO_FORMAT);
        parse_date(name, &value, format).map(Some)
    }

    pub fn attributes(&self) -> OrderedMap<Value> {
        self.read().attributes.clone()
    }

    /// Writes an attribute.
    ///
    /// Values of date attributes must parse as a date and are stored in the configured format.
    pub fn set_attribute(&self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let value = match self.inner.ty.date_format(name) {
            Some(format) if !value.is_null() => {
                let parsed = parse_date(name, &value, format)?;
                Value::String(format_date(name, &parsed, format)?)
            }
            _ => value,
        };

        let mut state = self.write();
        if state.relations.contains_key(name) {
            return Err(EntityError::AttributeIsRelation(name.to_string()).into());
        }
        state.attributes.insert(name, value);
        Ok(())
    }

    /// Writes a date, in the attribute's configured format or ISO 8601 for plain attributes.
    pub fn set_date(&self, name: &str, value: DateTime<FixedOffset>) -> Result<(), Error> {
        let format = self.inner.ty.date_format(name).unwrap_or(ISO_FORMAT);
        let formatted = format_date(name, &value, format)?;
        self.set_attribute(name, formatted)
    }

    pub fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.write().attributes.remove(name)
    }

    // Relations

    fn target(&self, entity: &Entity) -> Target {
        match (&self.graph, &entity.graph) {
            (Some(own), Some(theirs)) if Arc::ptr_eq(own, theirs) => {
                Target::Member(Arc::downgrade(&entity.inner))
            }
            _ => Target::Owned(entity.clone()),
        }
    }

    fn upgrade(&self, target: &Target) -> Option<Entity> {
        match target {
            Target::Owned(entity) => Some(entity.clone()),
            Target::Member(weak) => weak.upgrade().map(|inner| Entity {
                inner,
                graph: self.graph.clone(),
            }),
        }
    }

    fn to_slot(&self, relation: Relation) -> Slot {
        match relation {
            Relation::Absent => Slot::Absent,
            Relation::One(entity) => Slot::One(self.target(&entity)),
            Relation::Many(entities) => {
                Slot::Many(entities.iter().map(|e| self.target(e)).collect())
            }
        }
    }

    fn to_relation(&self, slot: &Slot) -> Relation {
        match slot {
            Slot::One(target) => self.upgrade(target).map_or(Relation::Absent, Relation::One),
            Slot::Many(targets) => {
                Relation::Many(targets.iter().filter_map(|t| self.upgrade(t)).collect())
            }
            Slot::Absent => Relation::Absent,
        }
    }

    pub fn relation(&self, name: &str) -> Option<Relation> {
        let slot = self.read().relations.get(name).cloned()?;
        Some(self.to_relation(&slot))
    }

    pub fn relations(&self) -> OrderedMap<Relation> {
        let slots = self.read().relations.clone();
        slots
            .iter()
            .map(|(name, slot)| (name, self.to_relation(slot)))
            .collect()
    }

    pub fn set_relation(&self, name: &str, relation: Relation) -> Result<(), EntityError> {
        let slot = self.to_slot(relation);
        let mut state = self.write();
        if state.attributes.contains_key(name) {
            return Err(EntityError::RelationIsAttribute(name.to_string()));
        }
        state.relations.insert(name, slot);
        Ok(())
    }

    pub fn remove_relation(&self, name: &str) -> Option<Relation> {
        let slot = self.write().relations.remove(name)?;
        Some(self.to_relation(&slot))
    }

    /// Drops every loaded relation. Breaks reference cycles built with [`Entity::set_relation`]
    /// between entities that do not share a response graph.
    pub fn clear_relations(&self) {
        self.write().relations.clear();
    }

    /// Declares a to-one relation named `name` towards `M`.
    pub fn has_one<M: Model>(&self, name: &str) -> Result<ToOneRelation<M>, ConfigError> {
        ToOneRelation::new(self.clone(), name)
    }

    /// Declares a to-many relation named `name` towards `M`.
    pub fn has_many<M: Model>(&self, name: &str) -> Result<ToManyRelation<M>, ConfigError> {
        ToManyRelation::new(self.clone(), name)
    }

    /// Dotted paths of every relation loaded on this entity and, recursively, on its related
    /// entities. Each relation comes before its nested paths.
    ///
    /// An entity already being walked is not entered again, so circular graphs terminate.
    pub fn relation_keys(&self) -> Vec<String> {
        self.relation_keys_with_prefix("")
    }

    pub fn relation_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys = Vec::new();
        let mut path = vec![self.clone()];
        self.collect_relation_keys(prefix, &mut path, &mut keys);

        let mut seen = HashSet::new();
        keys.retain(|key| seen.insert(key.clone()));
        keys
    }

    fn collect_relation_keys(&self, prefix: &str, path: &mut Vec<Entity>, keys: &mut Vec<String>) {
        for (name, relation) in self.relations() {
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}.{name}")
            };

            let entities = relation.entities();
            if matches!(relation, Relation::Absent) {
                continue;
            }
            keys.push(key.clone());

            for related in entities {
                if path.iter().any(|e| e.ptr_eq(related)) {
                    continue;
                }
                path.push(related.clone());
                related.collect_relation_keys(&key, path, keys);
                path.pop();
            }
        }
    }

    // Wire representation

    /// Overwrites identity and attributes from a wire resource. Relations are left untouched.
    pub fn populate_from_resource(&self, resource: &Resource) -> Result<(), Error> {
        self.set_id(resource.id.clone());
        for (name, value) in resource.attributes.iter() {
            self.set_attribute(name, value.clone())?;
        }
        Ok(())
    }

    /// The write representation: read-only attributes and unpopulated relations are left out,
    /// and the identity is only present once persisted.
    pub fn to_resource(&self) -> Resource {
        let ty = &self.inner.ty;
        // Related entities are locked while serializing relations, and may include `self`.
        let relations = self.relations();
        let state = self.read();

        let mut resource = Resource::new(ty.resource_type());
        resource.id = state.id.clone().filter(|id| !id.is_empty());
        resource.attributes = state
            .attributes
            .iter()
            .filter(|(name, _)| !ty.is_read_only(name))
            .map(|(name, value)| (name, value.clone()))
            .collect();
        drop(state);

        resource.relationships = relations
            .iter()
            .filter_map(|(name, relation)| Some((name, relation.to_relationship()?)))
            .collect();

        resource
    }

    pub fn to_document(&self) -> Document {
        Document::single(self.to_resource())
    }

    // Queries and persistence

    /// Opens a query over this entity's type.
    pub fn query(&self) -> Query<Entity> {
        Query::new(self.inner.registry.clone(), self.inner.ty.clone())
    }

    /// Creates the resource if it is not persisted yet, otherwise updates it.
    pub async fn save(&self) -> Result<SaveResponse<Entity>, Error> {
        let Some(id) = self.persisted_id() else {
            return self.create().await;
        };

        let url = self.inner.ty.resource_url(&id)?;
        let response = self.write_request(Method::PATCH, url).await?;
        Ok(self.adopt_identity(response))
    }

    /// Creates the resource, sending every writable attribute and populated relation.
    pub async fn create(&self) -> Result<SaveResponse<Entity>, Error> {
        let url = self.inner.ty.collection_url()?;
        let response = self.write_request(Method::POST, url).await?;
        Ok(self.adopt_identity(response))
    }

    /// Deletes the resource. Fails without issuing a request if it was never persisted.
    pub async fn delete(&self) -> Result<(), Error> {
        let id = self.persisted_id().ok_or(Error::MissingIdentity("delete"))?;
        let url = self.inner.ty.resource_url(&id)?;
        query::dispatch(&self.inner.ty, Method::DELETE, url, None).await?;
        Ok(())
    }

    /// Fetches the current server state of this resource, including every relation path
    /// currently loaded on it.
    pub async fn fresh(&self) -> Result<Refresh<Entity>, Error> {
        let Some(id) = self.persisted_id() else {
            return Ok(Refresh::NoIdentity);
        };

        let query = self.query().with(self.relation_keys());
        match query.find(&id).await {
            Ok(response) => Ok(response
                .into_data()
                .map_or(Refresh::NotFound, Refresh::Found)),
            Err(Error::Transport(e)) if e.is_not_found() => Ok(Refresh::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn write_request(
        &self,
        method: Method,
        url: String,
    ) -> Result<crate::transport::ApiResponse, Error> {
        let mut resource = self.to_resource();
        if method == Method::POST {
            resource.id = None;
        }
        let payload = serde_json::to_value(Document::single(resource)).map_err(Error::Payload)?;
        query::dispatch(&self.inner.ty, method, url, Some(payload)).await
    }

    fn adopt_identity(&self, response: crate::transport::ApiResponse) -> SaveResponse<Entity> {
        let document = response
            .body
            .and_then(|body| serde_json::from_value::<Document>(body).ok());

        let returned_id = match document.as_ref().and_then(|d| d.data.as_ref()) {
            Some(PrimaryData::One(resource)) => resource.id.clone().filter(|id| !id.is_empty()),
            _ => None,
        };

        if let Some(id) = returned_id {
            debug!(resource_type = self.resource_type(), %id, "Adopted identity");
            self.set_id(Some(id));
        }

        SaveResponse::new(self.clone(), response.status, document)
    }
}

impl fmt::Debug for Entity {
    // Relations only print their names: graphs may be circular.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Entity")
            .field("type", &self.resource_type())
            .field("id", &state.id)
            .field("attributes", &state.attributes)
            .field("relations", &state.relations.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn parse_date(
    attribute: &str,
    value: &Value,
    format: &str,
) -> Result<DateTime<FixedOffset>, AttributeError> {
    value
        .as_str()
        .and_then(|raw| date::parse(raw, format))
        .ok_or_else(|| AttributeError::InvalidDate {
            attribute: attribute.to_string(),
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
}

fn format_date(
    attribute: &str,
    value: &DateTime<FixedOffset>,
    format: &str,
) -> Result<String, AttributeError> {
    date::format(value, format).ok_or_else(|| AttributeError::UnsupportedFormat {
        attribute: attribute.to_string(),
        format: format.to_string(),
    })
}
