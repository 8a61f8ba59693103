//! # Relation Descriptors
//!
//! A descriptor binds an owner entity, a relation name and the related model type. It offers
//! two things:
//!
//! * **Loaded state**: [`ToOneRelation::loaded`] / [`ToManyRelation::loaded`] read what the owner
//!   currently holds under that name, without touching the network. The mutators
//!   ([`ToManyRelation::attach`], [`ToManyRelation::detach`], [`ToOneRelation::associate`],
//!   [`ToOneRelation::dissociate`]) only change that in-memory state; the change is persisted by
//!   the owner's next [`Entity::save`].
//! * **Querying**: the same chainable surface as a type-level [`Query`], scoped to the owner's
//!   relation endpoint (`<base>/<owner endpoint>/<owner id>/<relation>`). Fetching is always an
//!   explicit call.
use crate::{
    config::ConfigError,
    entity::{Entity, EntityError, Relation},
    error::Error,
    model::Model,
    query::{IncludePaths, Query, SortDirection},
    response::{PluralResponse, SingularResponse},
};
use std::fmt::Display;

fn same_entity(a: &Entity, b: &Entity) -> bool {
    a.ptr_eq(b)
        || matches!(
            (a.resource_identifier(), b.resource_identifier()),
            (Some(x), Some(y)) if x == y
        )
}

macro_rules! query_surface {
    () => {
        pub fn filter(mut self, attribute: &str, value: impl Display) -> Self {
            self.query = self.query.filter(attribute, value);
            self
        }

        pub fn order_by(
            mut self,
            attribute: &str,
            direction: impl Into<Option<SortDirection>>,
        ) -> Self {
            self.query = self.query.order_by(attribute, direction);
            self
        }

        pub fn with(mut self, paths: impl IncludePaths) -> Self {
            self.query = self.query.with(paths);
            self
        }

        pub fn option(mut self, key: &str, value: impl Display) -> Self {
            self.query = self.query.option(key, value);
            self
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        pub fn owner(&self) -> &Entity {
            &self.owner
        }

        pub fn query(&self) -> &Query<M> {
            &self.query
        }
    };
}

#[derive(Debug, Clone)]
pub struct ToOneRelation<M> {
    owner: Entity,
    name: String,
    query: Query<M>,
}

impl<M: Model> ToOneRelation<M> {
    pub(crate) fn new(owner: Entity, name: &str) -> Result<Self, ConfigError> {
        let query = owner.registry().query::<M>()?.related_to(owner.clone(), name);
        Ok(Self {
            owner,
            name: name.to_string(),
            query,
        })
    }

    query_surface!();

    /// The related entity currently held by the owner.
    pub fn loaded(&self) -> Option<M> {
        match self.owner.relation(&self.name)? {
            Relation::One(entity) => Some(M::from_entity(entity)),
            _ => None,
        }
    }

    pub fn associate(&self, related: &M) -> Result<(), EntityError> {
        self.owner
            .set_relation(&self.name, Relation::One(related.as_ref().clone()))
    }

    pub fn dissociate(&self) -> Result<(), EntityError> {
        self.owner.set_relation(&self.name, Relation::Absent)
    }

    /// Fetches the related resource from the relation endpoint.
    pub async fn get(&self) -> Result<SingularResponse<M>, Error> {
        self.query.get_related().await
    }
}

#[derive(Debug, Clone)]
pub struct ToManyRelation<M> {
    owner: Entity,
    name: String,
    query: Query<M>,
}

impl<M: Model> ToManyRelation<M> {
    pub(crate) fn new(owner: Entity, name: &str) -> Result<Self, ConfigError> {
        let query = owner.registry().query::<M>()?.related_to(owner.clone(), name);
        Ok(Self {
            owner,
            name: name.to_string(),
            query,
        })
    }

    query_surface!();

    pub fn limit(mut self, limit: u32) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    /// The related entities currently held by the owner, `None` if the relation is not loaded.
    pub fn loaded(&self) -> Option<Vec<M>> {
        match self.owner.relation(&self.name)? {
            Relation::Many(entities) => Some(entities.into_iter().map(M::from_entity).collect()),
            Relation::One(entity) => Some(vec![M::from_entity(entity)]),
            Relation::Absent => None,
        }
    }

    fn loaded_entities(&self) -> Vec<Entity> {
        self.owner
            .relation(&self.name)
            .map(|relation| relation.entities().to_vec())
            .unwrap_or_default()
    }

    /// Appends `related` to the owner's relation unless it is already there.
    pub fn attach(&self, related: &M) -> Result<(), EntityError> {
        let related = related.as_ref();
        let mut entities = self.loaded_entities();
        if !entities.iter().any(|e| same_entity(e, related)) {
            entities.push(related.clone());
        }
        self.owner.set_relation(&self.name, Relation::Many(entities))
    }

    /// Removes `related` from the owner's relation. Returns whether it was there.
    pub fn detach(&self, related: &M) -> Result<bool, EntityError> {
        let related = related.as_ref();
        let mut entities = self.loaded_entities();
        let before = entities.len();
        entities.retain(|e| !same_entity(e, related));
        let removed = entities.len() != before;
        self.owner.set_relation(&self.name, Relation::Many(entities))?;
        Ok(removed)
    }

    /// Fetches a page of related resources from the relation endpoint.
    pub async fn get(&self, page: Option<u32>) -> Result<PluralResponse<M>, Error> {
        self.query.get(page).await
    }

    pub async fn first(&self) -> Result<SingularResponse<M>, Error> {
        self.query.first().await
    }
}
