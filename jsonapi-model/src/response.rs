//! # Response Wrappers
//!
//! Typed views over the documents returned by terminal operations:
//!
//! * **[`PluralResponse`]**: a page of results plus pagination state and navigation.
//! * **[`SingularResponse`]**: at most one result.
//! * **[`SaveResponse`]**: the outcome of a create or update.
//! * **[`Refresh`]**: the outcome of [`crate::Entity::fresh`].
use crate::{
    document::{Document, Link, PrimaryData},
    entity::Entity,
    error::Error,
    model::FromEntity,
    ordered::OrderedMap,
    pagination::{PageRequest, PaginationStrategy},
    query::{self, Query},
};
use http::StatusCode;
use serde_json::Value;

/// The window a [`PluralResponse`] holds. `page` is a page number or an offset, depending on
/// the strategy; `size` is the page size or the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub strategy: PaginationStrategy,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug)]
pub struct PluralResponse<T> {
    data: Vec<T>,
    page: PageState,
    meta: Option<Value>,
    links: OrderedMap<Option<Link>>,
    query: Query<T>,
}

impl<T> PluralResponse<T> {
    pub(crate) fn new(data: Vec<T>, page: PageState, document: Document, query: Query<T>) -> Self {
        Self {
            data,
            page,
            meta: document.meta,
            links: document.links,
            query,
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn page_state(&self) -> PageState {
        self.page
    }

    /// The page number, or the offset for offset-based pagination.
    pub fn page(&self) -> u32 {
        self.page.page
    }

    pub fn page_size(&self) -> u32 {
        self.page.size
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    pub fn links(&self) -> &OrderedMap<Option<Link>> {
        &self.links
    }

    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name)?.as_ref().map(Link::href)
    }

    /// Total number of resources in the collection, from `meta.page.total`, `meta.total` or
    /// `meta.total-count`.
    pub fn total(&self) -> Option<u64> {
        let meta = self.meta.as_ref()?;
        meta.pointer("/page/total")
            .or_else(|| meta.get("total"))
            .or_else(|| meta.get("total-count"))
            .and_then(Value::as_u64)
    }

    pub fn page_count(&self) -> Option<u32> {
        let total = self.total()?;
        let pages = total.div_ceil(u64::from(self.page.size.max(1)));
        u32::try_from(pages).ok()
    }

    /// The page value of the last window, from the total count or the `last` link.
    fn last_page_value(&self) -> Option<u32> {
        if let Some(total) = self.total() {
            return Some(self.page.strategy.last(total, self.page.size));
        }

        let names = self.query.entity_type().page_params();
        let key = match self.page.strategy {
            PaginationStrategy::PageNumber => &names.number,
            PaginationStrategy::Offset => &names.offset,
        };
        query::query_param(self.link("last")?, key)?.parse().ok()
    }

    pub fn has_next(&self) -> bool {
        if self.link("next").is_some() {
            return true;
        }
        let next = self.page.strategy.next(self.page.page, self.page.size);
        self.last_page_value().is_some_and(|last| next <= last)
    }

    pub fn has_previous(&self) -> bool {
        self.link("prev").is_some()
            || self
                .page
                .strategy
                .previous(self.page.page, self.page.size)
                .is_some()
    }
}

impl<T: FromEntity> PluralResponse<T> {
    async fn fetch_page(&self, page: u32) -> Result<Self, Error> {
        self.query
            .get_window(PageRequest {
                page: Some(page),
                size: Some(self.page.size),
            })
            .await
    }

    /// Fetches the following window, `None` when this is the last one.
    pub async fn next(&self) -> Result<Option<Self>, Error> {
        if !self.has_next() {
            return Ok(None);
        }
        let next = self.page.strategy.next(self.page.page, self.page.size);
        self.fetch_page(next).await.map(Some)
    }

    /// Fetches the preceding window, `None` when this is the first one.
    pub async fn previous(&self) -> Result<Option<Self>, Error> {
        match self.page.strategy.previous(self.page.page, self.page.size) {
            Some(previous) => self.fetch_page(previous).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn first_page(&self) -> Result<Self, Error> {
        self.fetch_page(self.page.strategy.first()).await
    }

    /// Fetches the last window, `None` when neither a total nor a `last` link tells where it is.
    pub async fn last_page(&self) -> Result<Option<Self>, Error> {
        match self.last_page_value() {
            Some(last) => self.fetch_page(last).await.map(Some),
            None => Ok(None),
        }
    }
}

impl<'a, T> IntoIterator for &'a PluralResponse<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[derive(Debug, Clone)]
pub struct SingularResponse<T> {
    data: Option<T>,
    meta: Option<Value>,
    links: OrderedMap<Option<Link>>,
}

impl<T> SingularResponse<T> {
    pub(crate) fn new(data: Option<T>, document: Document) -> Self {
        Self {
            data,
            meta: document.meta,
            links: document.links,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    pub fn links(&self) -> &OrderedMap<Option<Link>> {
        &self.links
    }
}

#[derive(Debug, Clone)]
pub struct SaveResponse<T> {
    model: T,
    status: StatusCode,
    document: Option<Document>,
}

impl<T> SaveResponse<T> {
    pub(crate) fn new(model: T, status: StatusCode, document: Option<Document>) -> Self {
        Self {
            model,
            status,
            document,
        }
    }

    /// The saved model. Its identity is the one returned by the server, when there was one.
    pub fn model(&self) -> &T {
        &self.model
    }

    pub fn into_model(self) -> T {
        self.model
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response document, if the server sent one.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// The identity reported by the server.
    pub fn id(&self) -> Option<&str> {
        match self.document.as_ref()?.data.as_ref()? {
            PrimaryData::One(resource) => resource.id.as_deref(),
            PrimaryData::Many(_) => None,
        }
    }
}

impl SaveResponse<Entity> {
    /// Wraps the saved entity in a typed model.
    pub fn cast<M: FromEntity>(self) -> SaveResponse<M> {
        SaveResponse {
            model: M::from_entity(self.model),
            status: self.status,
            document: self.document,
        }
    }
}

/// The outcome of re-fetching an entity.
#[derive(Debug, Clone)]
pub enum Refresh<T> {
    /// The entity was never persisted; nothing was requested.
    NoIdentity,
    /// The server no longer knows the resource.
    NotFound,
    Found(T),
}

impl<T> Refresh<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Refresh::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Refresh<U> {
        match self {
            Refresh::NoIdentity => Refresh::NoIdentity,
            Refresh::NotFound => Refresh::NotFound,
            Refresh::Found(value) => Refresh::Found(f(value)),
        }
    }
}

impl Refresh<Entity> {
    pub fn cast<M: FromEntity>(self) -> Refresh<M> {
        self.map(M::from_entity)
    }
}
