//! # Entity Type Configuration
//!
//! Each entity type is described by a [`ModelConfig`]: its resource type name, where its
//! endpoint lives, how it paginates, which attributes are read-only and which ones hold dates.
//!
//! Registering a config in a [`crate::Registry`] produces an immutable [`EntityType`]. Values a
//! type leaves unset fall back to the registry-wide defaults (itself a `ModelConfig`). The
//! *effective* value is computed on first access and cached for the lifetime of the type; a
//! required value missing from both places is a [`ConfigError`].
//!
//! Configs can be built in code or loaded with `serde` through [`RegistryConfig`]. The transport
//! binding is never deserialized and has to be supplied programmatically.
use crate::{
    ordered::OrderedMap,
    pagination::{DEFAULT_PAGE_SIZE, PageParamNames, PaginationStrategy},
    transport::Transport,
};
use serde::Deserialize;
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Entity type configuration is missing its resource type name")]
    MissingResourceType,
    #[error("No base URL configured for resource type '{0}'")]
    MissingBaseUrl(String),
    #[error("No transport bound for resource type '{0}'")]
    MissingTransport(String),
    #[error("Resource type '{0}' is registered twice")]
    DuplicateType(String),
    #[error("Resource type '{0}' is not registered")]
    UnknownType(String),
    #[error("Invalid registry configuration: '{0}'")]
    Invalid(String),
}

/// Configuration of a single entity type, or the registry-wide defaults.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub resource_type: Option<String>,
    pub base_url: Option<String>,
    pub endpoint: Option<String>,
    pub page_size: Option<u32>,
    pub pagination: Option<PaginationStrategy>,
    pub page_number_param: Option<String>,
    pub page_size_param: Option<String>,
    pub page_offset_param: Option<String>,
    pub page_limit_param: Option<String>,
    pub read_only: Vec<String>,
    /// Attribute name to `chrono` format string.
    pub dates: OrderedMap<String>,
    #[serde(skip)]
    pub transport: Option<Arc<dyn Transport>>,
}

impl ModelConfig {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: Some(resource_type.into()),
            ..Default::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the path segment used in URLs, which defaults to the resource type name.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn pagination(mut self, strategy: PaginationStrategy) -> Self {
        self.pagination = Some(strategy);
        self
    }

    pub fn page_params(mut self, names: PageParamNames) -> Self {
        self.page_number_param = Some(names.number);
        self.page_size_param = Some(names.size);
        self.page_offset_param = Some(names.offset);
        self.page_limit_param = Some(names.limit);
        self
    }

    pub fn read_only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_only.extend(names.into_iter().map(Into::into));
        self
    }

    /// Registers `attribute` as a date, stored using the `chrono` `format`.
    pub fn date(mut self, attribute: impl Into<String>, format: impl Into<String>) -> Self {
        self.dates.insert(attribute, format.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("resource_type", &self.resource_type)
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("page_size", &self.page_size)
            .field("pagination", &self.pagination)
            .field("read_only", &self.read_only)
            .field("dates", &self.dates)
            .field("transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

/// A serializable description of a whole registry: defaults plus one entry per entity type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub defaults: ModelConfig,
    pub models: Vec<ModelConfig>,
}

impl RegistryConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// A registered entity type: its own config, the registry defaults, and cached effective values.
pub struct EntityType {
    resource_type: String,
    config: ModelConfig,
    defaults: Arc<ModelConfig>,
    base_url: OnceLock<Result<String, ConfigError>>,
    transport: OnceLock<Result<Arc<dyn Transport>, ConfigError>>,
    page_params: OnceLock<PageParamNames>,
}

impl EntityType {
    pub(crate) fn new(
        config: ModelConfig,
        defaults: Arc<ModelConfig>,
    ) -> Result<Self, ConfigError> {
        let resource_type = config
            .resource_type
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingResourceType)?;

        Ok(Self {
            resource_type,
            config,
            defaults,
            base_url: OnceLock::new(),
            transport: OnceLock::new(),
            page_params: OnceLock::new(),
        })
    }

    /// A type for resources nobody registered, configured only by the registry defaults.
    pub(crate) fn unregistered(resource_type: &str, defaults: Arc<ModelConfig>) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            config: ModelConfig::new(resource_type),
            defaults,
            base_url: OnceLock::new(),
            transport: OnceLock::new(),
            page_params: OnceLock::new(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// The base URL without trailing slashes.
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        self.base_url
            .get_or_init(|| {
                self.config
                    .base_url
                    .as_ref()
                    .or(self.defaults.base_url.as_ref())
                    .map(|url| url.trim_end_matches('/').to_string())
                    .ok_or_else(|| ConfigError::MissingBaseUrl(self.resource_type.clone()))
            })
            .as_deref()
            .map_err(Clone::clone)
    }

    pub fn transport(&self) -> Result<&Arc<dyn Transport>, ConfigError> {
        self.transport
            .get_or_init(|| {
                self.config
                    .transport
                    .as_ref()
                    .or(self.defaults.transport.as_ref())
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingTransport(self.resource_type.clone()))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn endpoint(&self) -> &str {
        self.config
            .endpoint
            .as_deref()
            .map(|e| e.trim_matches('/'))
            .unwrap_or(self.resource_type.as_str())
    }

    pub fn page_size(&self) -> u32 {
        self.config
            .page_size
            .or(self.defaults.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn pagination(&self) -> PaginationStrategy {
        self.config
            .pagination
            .or(self.defaults.pagination)
            .unwrap_or_default()
    }

    pub fn page_params(&self) -> &PageParamNames {
        self.page_params.get_or_init(|| {
            let defaults = PageParamNames::default();
            let pick = |own: &Option<String>, inherited: &Option<String>, fallback: String| {
                own.clone().or_else(|| inherited.clone()).unwrap_or(fallback)
            };

            PageParamNames {
                number: pick(
                    &self.config.page_number_param,
                    &self.defaults.page_number_param,
                    defaults.number,
                ),
                size: pick(
                    &self.config.page_size_param,
                    &self.defaults.page_size_param,
                    defaults.size,
                ),
                offset: pick(
                    &self.config.page_offset_param,
                    &self.defaults.page_offset_param,
                    defaults.offset,
                ),
                limit: pick(
                    &self.config.page_limit_param,
                    &self.defaults.page_limit_param,
                    defaults.limit,
                ),
            }
        })
    }

    /// Read-only attributes are never sent back to the server.
    pub fn is_read_only(&self, attribute: &str) -> bool {
        self.config
            .read_only
            .iter()
            .chain(&self.defaults.read_only)
            .any(|name| name == attribute)
    }

    /// The `chrono` format of a date attribute, `None` for plain attributes.
    pub fn date_format(&self, attribute: &str) -> Option<&str> {
        self.config
            .dates
            .get(attribute)
            .or_else(|| self.defaults.dates.get(attribute))
            .map(String::as_str)
    }

    /// `<base>/<endpoint>`
    pub fn collection_url(&self) -> Result<String, ConfigError> {
        Ok(format!("{}/{}", self.base_url()?, self.endpoint()))
    }

    /// `<base>/<endpoint>/<id>`
    pub fn resource_url(&self, id: &str) -> Result<String, ConfigError> {
        Ok(format!("{}/{}", self.collection_url()?, id))
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("resource_type", &self.resource_type)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_type(config: ModelConfig, defaults: ModelConfig) -> EntityType {
        EntityType::new(config, Arc::new(defaults)).unwrap()
    }

    #[test]
    fn test_missing_resource_type_is_rejected() {
        let result = EntityType::new(ModelConfig::default(), Arc::default());
        assert!(matches!(result, Err(ConfigError::MissingResourceType)));
    }

    #[test]
    fn test_missing_base_url_is_reported_on_use() {
        let ty = entity_type(ModelConfig::new("books"), ModelConfig::default());

        assert_eq!(
            ty.collection_url(),
            Err(ConfigError::MissingBaseUrl("books".to_string()))
        );
        assert!(matches!(
            ty.transport(),
            Err(ConfigError::MissingTransport(t)) if t == "books"
        ));
    }

    #[test]
    fn test_type_values_override_defaults() {
        let defaults = ModelConfig::default()
            .base_url("https://api.test/")
            .page_size(25)
            .read_only(["created-at"]);
        let ty = entity_type(
            ModelConfig::new("books")
                .endpoint("/library/books/")
                .pagination(PaginationStrategy::Offset)
                .read_only(["isbn"])
                .date("published-at", "%Y-%m-%d"),
            defaults,
        );

        assert_eq!(ty.base_url(), Ok("https://api.test"));
        assert_eq!(ty.endpoint(), "library/books");
        assert_eq!(
            ty.resource_url("7").as_deref(),
            Ok("https://api.test/library/books/7")
        );
        assert_eq!(ty.page_size(), 25);
        assert_eq!(ty.pagination(), PaginationStrategy::Offset);
        assert!(ty.is_read_only("isbn"));
        assert!(ty.is_read_only("created-at"));
        assert!(!ty.is_read_only("title"));
        assert_eq!(ty.date_format("published-at"), Some("%Y-%m-%d"));
        assert_eq!(ty.date_format("title"), None);
    }

    #[test]
    fn test_registry_config_from_json() {
        let config = RegistryConfig::from_json(
            r#"{
                "defaults": { "base_url": "https://api.test", "pagination": "offset" },
                "models": [
                    { "resource_type": "books", "page_limit_param": "limit", "dates": { "published-at": "%Y-%m-%d" } }
                ]
            }"#,
        )
        .unwrap();

        let ty = entity_type(config.models[0].clone(), config.defaults);
        assert_eq!(ty.pagination(), PaginationStrategy::Offset);
        assert_eq!(ty.page_params().limit, "limit");
        assert_eq!(ty.page_params().offset, "page[offset]");
        assert_eq!(ty.date_format("published-at"), Some("%Y-%m-%d"));
    }

    #[test]
    fn test_registry_config_rejects_unknown_fields() {
        let result = RegistryConfig::from_json(r#"{ "models": [{ "resource_typ": "books" }] }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
