#![allow(dead_code)]

use jsonapi_model::{
    ConfigError, ModelConfig, PaginationStrategy, Registry, ToManyRelation, ToOneRelation, model,
};
use library_service::{BASE_URL, MockApi};
use std::sync::Arc;

model! {
    pub struct Book => "books";
    pub struct Author => "authors";
}

impl Book {
    pub fn author(&self) -> Result<ToOneRelation<Author>, ConfigError> {
        self.has_one("author")
    }
}

impl Author {
    pub fn books(&self) -> Result<ToManyRelation<Book>, ConfigError> {
        self.has_many("books")
    }
}

pub fn books_config() -> ModelConfig {
    ModelConfig::new("books")
        .read_only(["created-at"])
        .date("published-at", "%Y-%m-%d")
}

pub fn registry(api: &Arc<MockApi>) -> Arc<Registry> {
    Registry::builder()
        .base_url(BASE_URL)
        .transport(api.clone())
        .register(books_config())
        .register(ModelConfig::new("authors"))
        .build()
        .unwrap()
}

pub fn offset_registry(api: &Arc<MockApi>) -> Arc<Registry> {
    Registry::builder()
        .base_url(BASE_URL)
        .transport(api.clone())
        .pagination(PaginationStrategy::Offset)
        .register(books_config())
        .register(ModelConfig::new("authors"))
        .build()
        .unwrap()
}

pub fn url(path: &str) -> String {
    format!("{BASE_URL}/{path}")
}
