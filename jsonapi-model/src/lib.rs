//! # jsonapi-model
//!
//! `jsonapi-model` maps typed entity models onto a remote collection exposed through the
//! [JSON:API](https://jsonapi.org) convention. Applications declare their entity types once,
//! then query, save and delete them without writing HTTP calls or parsing documents by hand.
//!
//! ## Key Components
//!
//! * **[`Registry`]:** The immutable set of entity types an application talks to, each with its
//!   [`ModelConfig`] (resource type, base URL, pagination, read-only and date attributes,
//!   transport binding).
//! * **[`Entity`]:** A shared handle to one resource instance: identity, ordered attributes and
//!   loaded relations. Knows how to serialize itself into a write payload and how to
//!   save, create, delete and refresh itself.
//! * **[`Query`]:** The builder accumulating filters, includes, sorting, pagination and raw
//!   options. Terminal calls issue exactly one request and assemble the response document
//!   into a graph of entities where shared and circular references are the same instance.
//! * **[`ToOneRelation`] & [`ToManyRelation`]:** Relation descriptors scoped to an owner's
//!   relation endpoint.
//! * **[`Transport`]:** The seam to the network. Bring your own, or enable the `reqwest`
//!   feature for [`transport::ReqwestTransport`].
//!
//! ## Typed models
//!
//! ```rust,no_run
//! use jsonapi_model::{Model, ModelConfig, Registry, ToOneRelation, model};
//! # use std::sync::Arc;
//!
//! model! {
//!     pub struct Book => "books";
//!     pub struct Author => "authors";
//! }
//!
//! impl Book {
//!     pub fn author(&self) -> Result<ToOneRelation<Author>, jsonapi_model::ConfigError> {
//!         self.has_one("author")
//!     }
//! }
//!
//! # async fn run(transport: Arc<dyn jsonapi_model::Transport>) -> Result<(), jsonapi_model::Error> {
//! let registry = Registry::builder()
//!     .base_url("https://api.example.com")
//!     .transport(transport)
//!     .register(ModelConfig::new("books").read_only(["created-at"]))
//!     .register(ModelConfig::new("authors"))
//!     .build()?;
//!
//! let books = Book::query(&registry)?
//!     .filter("genre", "sci-fi")
//!     .with("author")
//!     .get(None)
//!     .await?;
//!
//! for book in books.data() {
//!     let author = book.author()?.loaded();
//!     println!("{:?} by {:?}", book.raw_attribute("title"), author.map(|a| a.id()));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! * `reqwest`: Enables [`transport::ReqwestTransport`].
pub mod config;
pub mod date;
pub mod document;
pub mod entity;
pub mod error;
pub mod model;
pub mod ordered;
pub mod pagination;
pub mod query;
pub mod registry;
pub mod relation;
pub mod response;
pub mod transport;

pub use config::{ConfigError, EntityType, ModelConfig, RegistryConfig};
pub use entity::{AttributeError, AttributeValue, Entity, EntityError, Relation};
pub use error::Error;
pub use model::{FromEntity, Model};
pub use pagination::{PageParamNames, PageRequest, PaginationStrategy};
pub use query::{IncludePaths, Query, SortDirection};
pub use registry::{Registry, RegistryBuilder};
pub use relation::{ToManyRelation, ToOneRelation};
pub use response::{PageState, PluralResponse, Refresh, SaveResponse, SingularResponse};
pub use transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Type alias for the standard boxed error used by transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
