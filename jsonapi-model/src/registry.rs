//! # Registry
//!
//! The [`Registry`] is the explicit, immutable replacement for per-class static configuration:
//! every entity type an application talks to is registered once, at startup, with its
//! [`ModelConfig`]. Registry-wide defaults (base URL, transport, page size...) apply to every type
//! that does not override them.
//!
//! The registry is shared behind an `Arc`; entities and queries keep a handle to it so that
//! related resources of other types can be resolved while assembling response graphs.
use crate::{
    config::{ConfigError, EntityType, ModelConfig, RegistryConfig},
    entity::Entity,
    model::Model,
    pagination::{PageParamNames, PaginationStrategy},
    query::Query,
    transport::Transport,
};
use std::{collections::HashMap, fmt, sync::Arc};

pub struct Registry {
    defaults: Arc<ModelConfig>,
    types: HashMap<String, Arc<EntityType>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Builds a registry from a deserialized [`RegistryConfig`], binding `transport` as the
    /// default transport.
    pub fn from_config(
        config: RegistryConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>, ConfigError> {
        config
            .models
            .into_iter()
            .fold(
                Registry::builder().defaults(config.defaults),
                RegistryBuilder::register,
            )
            .transport(transport)
            .build()
    }

    pub fn defaults(&self) -> &ModelConfig {
        &self.defaults
    }

    /// Looks up a registered entity type.
    pub fn entity_type(&self, resource_type: &str) -> Result<&Arc<EntityType>, ConfigError> {
        self.types
            .get(resource_type)
            .ok_or_else(|| ConfigError::UnknownType(resource_type.to_string()))
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// The registered type, or a type configured by the registry defaults alone.
    pub(crate) fn resolve_type(&self, resource_type: &str) -> Arc<EntityType> {
        match self.types.get(resource_type) {
            Some(ty) => ty.clone(),
            None => Arc::new(EntityType::unregistered(
                resource_type,
                self.defaults.clone(),
            )),
        }
    }

    /// Opens a query over the type of `M`.
    pub fn query<M: Model>(self: &Arc<Self>) -> Result<Query<M>, ConfigError> {
        let ty = self.entity_type(M::RESOURCE_TYPE)?.clone();
        Ok(Query::new(self.clone(), ty))
    }

    /// Opens an untyped query over a registered resource type.
    pub fn query_type(self: &Arc<Self>, resource_type: &str) -> Result<Query<Entity>, ConfigError> {
        let ty = self.entity_type(resource_type)?.clone();
        Ok(Query::new(self.clone(), ty))
    }

    /// Creates a new, not yet persisted entity of a registered resource type.
    pub fn new_entity(self: &Arc<Self>, resource_type: &str) -> Result<Entity, ConfigError> {
        let ty = self.entity_type(resource_type)?.clone();
        Ok(Entity::new(self.clone(), ty))
    }

    pub fn new_model<M: Model>(self: &Arc<Self>) -> Result<M, ConfigError> {
        self.new_entity(M::RESOURCE_TYPE).map(M::from_entity)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("defaults", &self.defaults)
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    defaults: ModelConfig,
    models: Vec<ModelConfig>,
}

impl RegistryBuilder {
    /// Replaces the registry-wide defaults. Any resource type set on `defaults` is ignored.
    pub fn defaults(mut self, defaults: ModelConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.defaults.base_url = Some(base_url.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.defaults.transport = Some(transport);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.defaults.page_size = Some(page_size);
        self
    }

    pub fn pagination(mut self, strategy: PaginationStrategy) -> Self {
        self.defaults.pagination = Some(strategy);
        self
    }

    pub fn page_params(mut self, names: PageParamNames) -> Self {
        self.defaults = self.defaults.page_params(names);
        self
    }

    pub fn register(mut self, config: ModelConfig) -> Self {
        self.models.push(config);
        self
    }

    pub fn build(self) -> Result<Arc<Registry>, ConfigError> {
        let mut defaults = self.defaults;
        defaults.resource_type = None;
        let defaults = Arc::new(defaults);

        let mut types = HashMap::with_capacity(self.models.len());
        for config in self.models {
            let ty = EntityType::new(config, defaults.clone())?;
            let name = ty.resource_type().to_string();
            if types.contains_key(&name) {
                return Err(ConfigError::DuplicateType(name));
            }
            types.insert(name, Arc::new(ty));
        }

        Ok(Arc::new(Registry { defaults, types }))
    }
}
