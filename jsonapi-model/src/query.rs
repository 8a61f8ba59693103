//! # Query Builder
//!
//! A [`Query`] accumulates the intent of a read: filters, sorting, relation includes,
//! pagination and raw query-parameter overrides. Mutators consume and return the builder so
//! calls chain; terminal operations ([`Query::get`], [`Query::first`], [`Query::find`]) borrow
//! it, issue exactly one request, and never change its state.
//!
//! ## Query parameters
//!
//! | intent     | parameter                                   |
//! |------------|---------------------------------------------|
//! | filter     | `filter[<attribute>]=<value>`               |
//! | include    | `include=author,author.books`               |
//! | sort       | `sort=title,-published-at`                  |
//! | pagination | strategy dependent, e.g. `page[number]=2`   |
//! | option     | verbatim, applied last, wins on collision   |
//!
//! ## Scope
//!
//! A query either targets its type's collection (`<base>/<endpoint>`) or, when opened through
//! a relation descriptor, an owner's relation endpoint (`<base>/<owner>/<id>/<relation>`).
//!
//! Response documents are turned into entity graphs by [`graph`].
pub mod graph;

use crate::{
    config::EntityType,
    document::Document,
    entity::Entity,
    error::Error,
    model::FromEntity,
    ordered::OrderedMap,
    pagination::PageRequest,
    registry::Registry,
    response::{PageState, PluralResponse, SingularResponse},
    transport::{ApiRequest, ApiResponse},
};
use http::Method;
use std::{fmt, fmt::Display, marker::PhantomData, sync::Arc};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One include path or many, each possibly dotted (`author.books`).
pub trait IncludePaths {
    fn into_paths(self) -> Vec<String>;
}

impl IncludePaths for &str {
    fn into_paths(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IncludePaths for String {
    fn into_paths(self) -> Vec<String> {
        vec![self]
    }
}

impl<S: Into<String>> IncludePaths for Vec<S> {
    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String>, const N: usize> IncludePaths for [S; N] {
    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl IncludePaths for &[&str] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(|path| path.to_string()).collect()
    }
}

#[derive(Clone)]
enum Scope {
    Collection,
    Related {
        owner: Entity,
        relation: String,
    },
}

pub struct Query<T = Entity> {
    registry: Arc<Registry>,
    ty: Arc<EntityType>,
    scope: Scope,
    filters: Vec<(String, String)>,
    sorts: Vec<(String, SortDirection)>,
    includes: Vec<String>,
    page: PageRequest,
    options: OrderedMap<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            ty: self.ty.clone(),
            scope: self.scope.clone(),
            filters: self.filters.clone(),
            sorts: self.sorts.clone(),
            includes: self.includes.clone(),
            page: self.page,
            options: self.options.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("resource_type", &self.ty.resource_type())
            .field("filters", &self.filters)
            .field("sorts", &self.sorts)
            .field("includes", &self.includes)
            .field("page", &self.page)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T> Query<T> {
    pub(crate) fn new(registry: Arc<Registry>, ty: Arc<EntityType>) -> Self {
        Self {
            registry,
            ty,
            scope: Scope::Collection,
            filters: Vec::new(),
            sorts: Vec::new(),
            includes: Vec::new(),
            page: PageRequest::default(),
            options: OrderedMap::new(),
            _marker: PhantomData,
        }
    }

    /// Scopes the query to `owner`'s `relation` endpoint.
    pub(crate) fn related_to(mut self, owner: Entity, relation: &str) -> Self {
        self.scope = Scope::Related {
            owner,
            relation: relation.to_string(),
        };
        self
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    pub fn page_request(&self) -> PageRequest {
        self.page
    }

    /// Adds a `filter[<attribute>]=<value>` condition.
    pub fn filter(mut self, attribute: &str, value: impl Display) -> Self {
        self.filters.push((attribute.to_string(), value.to_string()));
        self
    }

    /// Sorts by `attribute`, ascending unless told otherwise.
    pub fn order_by(
        mut self,
        attribute: &str,
        direction: impl Into<Option<SortDirection>>,
    ) -> Self {
        let direction = direction.into().unwrap_or_default();
        self.sorts.push((attribute.to_string(), direction));
        self
    }

    /// Includes one or more relation paths in the response.
    pub fn with(mut self, paths: impl IncludePaths) -> Self {
        for path in paths.into_paths() {
            if !path.is_empty() && !self.includes.contains(&path) {
                self.includes.push(path);
            }
        }
        self
    }

    /// Limits the number of results per request (the page size, or the offset limit).
    pub fn limit(mut self, limit: u32) -> Self {
        self.page.size = Some(limit);
        self
    }

    /// Selects the page number (or offset) used when [`Query::get`] is called without one.
    pub fn page(mut self, page: u32) -> Self {
        self.page.page = Some(page);
        self
    }

    /// Sets a raw query parameter, overriding anything the builder generates for `key`.
    pub fn option(mut self, key: &str, value: impl Display) -> Self {
        self.options.insert(key, value.to_string());
        self
    }

    /// The query parameters of a list request for the current state.
    pub fn params(&self) -> Vec<(String, String)> {
        self.build_params(Some(self.page)).into_iter().collect()
    }

    /// The URL of a list request for the current state.
    pub fn url(&self) -> Result<String, Error> {
        render_url(&self.scope_url()?, &self.build_params(Some(self.page)))
    }

    fn build_params(&self, page: Option<PageRequest>) -> OrderedMap<String> {
        let mut params = OrderedMap::new();

        for (attribute, value) in &self.filters {
            params.insert(format!("filter[{attribute}]"), value.clone());
        }

        if !self.includes.is_empty() {
            params.insert("include", self.includes.join(","));
        }

        if !self.sorts.is_empty() {
            let sort = self
                .sorts
                .iter()
                .map(|(attribute, direction)| match direction {
                    SortDirection::Asc => attribute.clone(),
                    SortDirection::Desc => format!("-{attribute}"),
                })
                .collect::<Vec<_>>()
                .join(",");
            params.insert("sort", sort);
        }

        if let Some(page) = page {
            let strategy = self.ty.pagination();
            for (key, value) in strategy.params(self.ty.page_params(), page, self.ty.page_size()) {
                params.insert(key, value);
            }
        }

        for (key, value) in self.options.iter() {
            params.insert(key, value.clone());
        }

        params
    }

    fn scope_url(&self) -> Result<String, Error> {
        match &self.scope {
            Scope::Collection => Ok(self.ty.collection_url()?),
            Scope::Related { owner, relation } => {
                let id = owner
                    .resource_identifier()
                    .ok_or(Error::MissingIdentity("query relations of"))?
                    .id;
                let owner_url = owner.entity_type().resource_url(&id)?;
                Ok(format!("{owner_url}/{relation}"))
            }
        }
    }

    async fn fetch(&self, url: String) -> Result<(Document, Vec<Entity>), Error> {
        let response = dispatch(&self.ty, Method::GET, url.clone(), None).await?;
        let document = match response.body {
            Some(body) => serde_json::from_value::<Document>(body)
                .map_err(|source| Error::Document { url, source })?,
            None => Document::default(),
        };
        let primary = graph::assemble(&self.registry, &self.ty, &document)?;
        Ok((document, primary))
    }
}

impl<T: FromEntity> Query<T> {
    /// Fetches one page of the collection. `page` defaults to the page set on the builder,
    /// then to the first page.
    pub async fn get(&self, page: Option<u32>) -> Result<PluralResponse<T>, Error> {
        let request = PageRequest {
            page: page.or(self.page.page),
            size: self.page.size,
        };
        self.get_window(request).await
    }

    pub(crate) async fn get_window(
        &self,
        request: PageRequest,
    ) -> Result<PluralResponse<T>, Error> {
        let strategy = self.ty.pagination();
        let state = PageState {
            strategy,
            page: request.page.unwrap_or_else(|| strategy.first()),
            size: request.size.unwrap_or_else(|| self.ty.page_size()),
        };

        let url = render_url(&self.scope_url()?, &self.build_params(Some(request)))?;
        let (document, primary) = self.fetch(url).await?;

        Ok(PluralResponse::new(
            primary.into_iter().map(T::from_entity).collect(),
            state,
            document,
            self.clone(),
        ))
    }

    /// Fetches the first matching resource only.
    pub async fn first(&self) -> Result<SingularResponse<T>, Error> {
        let request = PageRequest {
            page: Some(self.ty.pagination().first()),
            size: Some(1),
        };
        let url = render_url(&self.scope_url()?, &self.build_params(Some(request)))?;
        let (document, primary) = self.fetch(url).await?;
        Ok(SingularResponse::new(
            primary.into_iter().next().map(T::from_entity),
            document,
        ))
    }

    /// Fetches a single resource by identity.
    ///
    /// An empty `data` member resolves to `None`; a missing resource is whatever error the
    /// transport reports for it (usually a `404` status).
    pub async fn find(&self, id: &str) -> Result<SingularResponse<T>, Error> {
        let url = render_url(&self.ty.resource_url(id)?, &self.build_params(None))?;
        self.get_single(url).await
    }

    /// Fetches the single resource behind a to-one relation endpoint.
    pub(crate) async fn get_related(&self) -> Result<SingularResponse<T>, Error> {
        let url = render_url(&self.scope_url()?, &self.build_params(None))?;
        self.get_single(url).await
    }

    async fn get_single(&self, url: String) -> Result<SingularResponse<T>, Error> {
        let (document, primary) = self.fetch(url).await?;
        Ok(SingularResponse::new(
            primary.into_iter().next().map(T::from_entity),
            document,
        ))
    }
}

/// Sends one request through the type's transport.
pub(crate) async fn dispatch(
    ty: &EntityType,
    method: Method,
    url: String,
    body: Option<serde_json::Value>,
) -> Result<ApiResponse, Error> {
    let transport = ty.transport()?;
    debug!(%method, %url, resource_type = ty.resource_type(), "Dispatching request");
    Ok(transport.send(ApiRequest::new(method, url, body)).await?)
}

/// Appends `params` to `base` as an `application/x-www-form-urlencoded` query.
fn render_url(base: &str, params: &OrderedMap<String>) -> Result<String, Error> {
    let mut url = Url::parse(base).map_err(|source| Error::InvalidUrl {
        url: base.to_string(),
        source,
    })?;

    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(key, value)| (key, value.as_str())));
    }

    Ok(url.into())
}

/// Reads a query parameter back from a URL, such as a pagination link. Relative links are
/// read against a placeholder base since only their query matters.
pub(crate) fn query_param(link: &str, key: &str) -> Option<String> {
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost/").ok()?.join(link).ok()?
        }
        Err(_) => return None,
    };

    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
