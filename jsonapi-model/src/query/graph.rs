//! # Graph Assembly
//!
//! Turns a response [`Document`] into entities with their relations wired.
//!
//! ## How it works
//!
//! 1. Primary and included resources are pooled by `(type, id)`.
//! 2. Exactly one [`Entity`] is built per pooled resource and populated from it. Every
//!    reference to the same `(type, id)` resolves to that one instance, which is how shared
//!    and circular relationships are represented.
//! 3. Relationship linkage is resolved against the pool. A reference to a resource that was
//!    not included resolves to a stub entity carrying only its identity (again, one stub per
//!    `(type, id)`). Explicit `null` linkage sets an empty relation.
//! 4. Every pooled entity and stub joins one [`Graph`], which owns them. Relations between
//!    members are wired weakly through it, so the graph is freed along with its last handle.
//! 5. The primary entities are returned in document order.
//!
//! Building and wiring are separate passes, so a cycle never causes recursion.
use crate::{
    config::EntityType,
    document::{Document, Linkage, Resource, ResourceIdentifier},
    entity::{Entity, Graph, Relation},
    error::Error,
    registry::Registry,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, trace};

struct GraphBuilder<'a> {
    registry: &'a Arc<Registry>,
    queried: &'a Arc<EntityType>,
    entities: HashMap<ResourceIdentifier, Entity>,
    members: Vec<Entity>,
}

impl<'a> GraphBuilder<'a> {
    fn entity_type(&self, resource_type: &str) -> Arc<EntityType> {
        if resource_type == self.queried.resource_type() {
            self.queried.clone()
        } else {
            self.registry.resolve_type(resource_type)
        }
    }

    fn build(&mut self, resource: &Resource) -> Result<Entity, Error> {
        let entity = Entity::new(self.registry.clone(), self.entity_type(&resource.kind));
        entity.populate_from_resource(resource)?;
        self.members.push(entity.clone());
        Ok(entity)
    }

    fn resolve(&mut self, identifier: &ResourceIdentifier) -> Entity {
        if let Some(entity) = self.entities.get(identifier) {
            return entity.clone();
        }

        trace!(
            resource_type = %identifier.kind,
            id = %identifier.id,
            "Stubbing resource missing from document"
        );
        let stub = Entity::new(self.registry.clone(), self.entity_type(&identifier.kind));
        stub.set_id(Some(identifier.id.clone()));
        self.entities.insert(identifier.clone(), stub.clone());
        self.members.push(stub.clone());
        stub
    }

    /// The relations declared by `resource`, with targets resolved but not yet wired.
    fn link(&mut self, resource: &Resource) -> Vec<(String, Relation)> {
        let mut links = Vec::new();
        for (name, relationship) in resource.relationships.iter() {
            let relation = match &relationship.data {
                Some(Some(Linkage::ToOne(identifier))) => Relation::One(self.resolve(identifier)),
                Some(Some(Linkage::ToMany(identifiers))) => {
                    Relation::Many(identifiers.iter().map(|id| self.resolve(id)).collect())
                }
                Some(None) => Relation::Absent,
                // Links or meta only: nothing is known about the related data.
                None => continue,
            };
            links.push((name.to_string(), relation));
        }
        links
    }
}

fn bind(relation: Relation, graph: &Arc<Graph>) -> Relation {
    match relation {
        Relation::Absent => Relation::Absent,
        Relation::One(entity) => Relation::One(entity.in_graph(graph)),
        Relation::Many(entities) => {
            Relation::Many(entities.iter().map(|e| e.in_graph(graph)).collect())
        }
    }
}

/// Assembles `document` into entities and returns the primary ones, in order.
///
/// `queried` is the type the request was issued for; resources of other types get their
/// registered type, or one configured by the registry defaults.
pub fn assemble(
    registry: &Arc<Registry>,
    queried: &Arc<EntityType>,
    document: &Document,
) -> Result<Vec<Entity>, Error> {
    let mut builder = GraphBuilder {
        registry,
        queried,
        entities: HashMap::new(),
        members: Vec::new(),
    };

    let mut primary = Vec::with_capacity(document.primary().len());
    let mut built: Vec<(Entity, &Resource)> = Vec::new();

    for resource in document.primary() {
        let entity = match resource.identifier() {
            Some(identifier) => match builder.entities.get(&identifier) {
                Some(entity) => entity.clone(),
                None => {
                    let entity = builder.build(resource)?;
                    builder.entities.insert(identifier, entity.clone());
                    built.push((entity.clone(), resource));
                    entity
                }
            },
            None => {
                let entity = builder.build(resource)?;
                built.push((entity.clone(), resource));
                entity
            }
        };
        primary.push(entity);
    }

    for resource in &document.included {
        let Some(identifier) = resource.identifier() else {
            continue;
        };
        if builder.entities.contains_key(&identifier) {
            continue;
        }
        let entity = builder.build(resource)?;
        builder.entities.insert(identifier, entity.clone());
        built.push((entity, resource));
    }

    let mut wiring = Vec::with_capacity(built.len());
    for (entity, resource) in &built {
        let links = builder.link(resource);
        wiring.push((entity, links));
    }

    let graph = Graph::new(&builder.members);
    for (entity, links) in wiring {
        let owner = entity.in_graph(&graph);
        for (name, relation) in links {
            owner.set_relation(&name, bind(relation, &graph))?;
        }
    }

    debug!(
        resource_type = queried.resource_type(),
        primary = primary.len(),
        pooled = graph.len(),
        "Assembled document"
    );

    Ok(primary.iter().map(|e| e.in_graph(&graph)).collect())
}
