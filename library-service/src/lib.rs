//! # Library Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide an in-memory JSON:API backend
//! and document fixtures for integration testing `jsonapi-model`.
//! It is not intended for production use.
//!
//! [`MockApi`] answers canned responses keyed by method and URL, records every request it
//! receives, and answers `404 Not Found` to anything it does not know. URLs match by their
//! decoded query pairs, so routes may be written as `books?page[number]=1`.
pub mod fixtures;

use async_trait::async_trait;
use http::{Method, StatusCode};
use jsonapi_model::{ApiRequest, ApiResponse, Transport, TransportError};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use url::{Position, Url};

pub const BASE_URL: &str = "https://library.test/api";

struct Route {
    method: Method,
    url: String,
    status: StatusCode,
    body: Option<Value>,
}

#[derive(Default)]
pub struct MockApi {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a response. A later registration for the same method and URL wins.
    pub fn on(&self, method: Method, url: &str, status: StatusCode, body: Option<Value>) {
        self.routes.lock().unwrap().push(Route {
            method,
            url: url.to_string(),
            status,
            body,
        });
    }

    pub fn on_get(&self, url: &str, body: Value) {
        self.on(Method::GET, url, StatusCode::OK, Some(body));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockApi {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let matched = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|route| route.method == request.method && same_url(&route.url, &request.url))
            .map(|route| (route.status, route.body.clone()));

        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        match matched {
            Some((status, body)) if status.is_success() => Ok(ApiResponse::new(status, body)),
            Some((status, body)) => Err(TransportError::Status { url, status, body }),
            None => Err(TransportError::Status {
                url,
                status: StatusCode::NOT_FOUND,
                body: Some(fixtures::not_found()),
            }),
        }
    }
}

fn same_url(route: &str, requested: &str) -> bool {
    match (Url::parse(route), Url::parse(requested)) {
        (Ok(route), Ok(requested)) => {
            route[..Position::AfterPath] == requested[..Position::AfterPath]
                && route.query_pairs().eq(requested.query_pairs())
        }
        _ => route == requested,
    }
}
