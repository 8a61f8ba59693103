//! # Typed Models
//!
//! A model is a thin, typed wrapper around an [`Entity`] bound to one resource type. The
//! [`model!`](crate::model!) macro declares one in a line; models deref to [`Entity`], so every
//! entity operation is available on them, and they add typed relation accessors written by hand:
//!
//! ```rust
//! use jsonapi_model::{ConfigError, ToManyRelation, model};
//!
//! model! {
//!     pub struct Author => "authors";
//!     pub struct Book => "books";
//! }
//!
//! impl Author {
//!     pub fn books(&self) -> Result<ToManyRelation<Book>, ConfigError> {
//!         self.has_many("books")
//!     }
//! }
//! ```
//!
//! The associated functions of [`Model`] open a query on the model's type and apply one
//! operation, mirroring the chainable [`Query`] surface.
use crate::{
    config::ConfigError,
    entity::Entity,
    error::Error,
    query::{IncludePaths, Query, SortDirection},
    registry::Registry,
    response::{PluralResponse, SingularResponse},
};
use std::{fmt::Display, future::Future, sync::Arc};

/// Conversion from an assembled [`Entity`] into the type a query yields.
pub trait FromEntity: Sized {
    fn from_entity(entity: Entity) -> Self;
}

impl FromEntity for Entity {
    fn from_entity(entity: Entity) -> Self {
        entity
    }
}

pub trait Model: FromEntity + AsRef<Entity> + Send + Sync + 'static {
    /// The JSON:API resource type name this model is registered under.
    const RESOURCE_TYPE: &'static str;

    /// A new, not yet persisted instance.
    fn new(registry: &Arc<Registry>) -> Result<Self, ConfigError> {
        registry.new_model::<Self>()
    }

    fn query(registry: &Arc<Registry>) -> Result<Query<Self>, ConfigError> {
        registry.query::<Self>()
    }

    fn get(
        registry: &Arc<Registry>,
        page: Option<u32>,
    ) -> impl Future<Output = Result<PluralResponse<Self>, Error>> + Send {
        async move { Self::query(registry)?.get(page).await }
    }

    fn first(
        registry: &Arc<Registry>,
    ) -> impl Future<Output = Result<SingularResponse<Self>, Error>> + Send {
        async move { Self::query(registry)?.first().await }
    }

    fn find(
        registry: &Arc<Registry>,
        id: &str,
    ) -> impl Future<Output = Result<SingularResponse<Self>, Error>> + Send {
        async move { Self::query(registry)?.find(id).await }
    }

    fn with(
        registry: &Arc<Registry>,
        paths: impl IncludePaths,
    ) -> Result<Query<Self>, ConfigError> {
        Ok(Self::query(registry)?.with(paths))
    }

    fn limit(registry: &Arc<Registry>, limit: u32) -> Result<Query<Self>, ConfigError> {
        Ok(Self::query(registry)?.limit(limit))
    }

    fn filter(
        registry: &Arc<Registry>,
        attribute: &str,
        value: impl Display,
    ) -> Result<Query<Self>, ConfigError> {
        Ok(Self::query(registry)?.filter(attribute, value))
    }

    fn order_by(
        registry: &Arc<Registry>,
        attribute: &str,
        direction: impl Into<Option<SortDirection>>,
    ) -> Result<Query<Self>, ConfigError> {
        Ok(Self::query(registry)?.order_by(attribute, direction))
    }

    fn option(
        registry: &Arc<Registry>,
        key: &str,
        value: impl Display,
    ) -> Result<Query<Self>, ConfigError> {
        Ok(Self::query(registry)?.option(key, value))
    }
}

/// Declares typed models: a newtype over [`Entity`] implementing [`Model`], [`FromEntity`],
/// `AsRef<Entity>` and `Deref<Target = Entity>`.
#[macro_export]
macro_rules! model {
    ($($(#[$meta:meta])* $vis:vis struct $name:ident => $resource_type:literal;)+) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Debug)]
            $vis struct $name($crate::Entity);

            impl $crate::FromEntity for $name {
                fn from_entity(entity: $crate::Entity) -> Self {
                    Self(entity)
                }
            }

            impl ::std::convert::AsRef<$crate::Entity> for $name {
                fn as_ref(&self) -> &$crate::Entity {
                    &self.0
                }
            }

            impl ::std::ops::Deref for $name {
                type Target = $crate::Entity;

                fn deref(&self) -> &Self::Target {
                    &self.0
                }
            }

            impl $crate::Model for $name {
                const RESOURCE_TYPE: &'static str = $resource_type;
            }
        )+
    };
}
