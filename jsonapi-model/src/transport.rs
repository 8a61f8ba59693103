//! # Transport
//!
//! The boundary between the model layer and the network. The model layer never talks HTTP
//! itself: every terminal operation builds one [`ApiRequest`] and hands it to a
//! [`Transport`] implementation, which performs it and returns an [`ApiResponse`].
//!
//! ## Contract
//!
//! * A transport returns `Ok` only for successful statuses. Any other outcome (network
//!   failure, non-success status, undecodable body) is a [`TransportError`], which the model
//!   layer propagates to the caller unchanged.
//! * Retries, caching, authentication and timeouts are the transport's business.
//!
//! With the `reqwest` feature enabled, [`ReqwestTransport`] provides a ready-made
//! implementation on top of `reqwest::Client`.
use crate::BoxError;
use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};

/// The JSON:API media type, sent as `Accept` and `Content-Type` on every request.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request to '{url}' failed with status {status}")]
    Status {
        url: String,
        status: StatusCode,
        body: Option<serde_json::Value>,
    },
    #[error("Failed to reach '{url}': '{source}'")]
    Network {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("Response body from '{url}' is not valid JSON: '{source}'")]
    MalformedBody {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// The HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// A single request issued by the model layer.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a request carrying the JSON:API `Accept` and `Content-Type` headers.
    pub fn new(method: Method, url: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        let mut headers = HeaderMap::new();
        let media_type = HeaderValue::from_static(JSON_API_MEDIA_TYPE);
        headers.insert(header::ACCEPT, media_type.clone());
        headers.insert(header::CONTENT_TYPE, media_type);

        Self {
            method,
            url: url.into(),
            headers,
            body,
        }
    }
}

/// A successful response. `body` is `None` for empty bodies (e.g. `204 No Content`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs `request`, mapping any non-success outcome to a [`TransportError`].
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;

    async fn get(&self, url: &str) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::new(Method::GET, url, None)).await
    }

    async fn delete(&self, url: &str) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::new(Method::DELETE, url, None)).await
    }

    async fn head(&self, url: &str) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::new(Method::HEAD, url, None)).await
    }

    async fn post(
        &self,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::new(Method::POST, url, body)).await
    }

    async fn put(
        &self,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::new(Method::PUT, url, body)).await
    }

    async fn patch(
        &self,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, TransportError> {
        self.send(ApiRequest::new(Method::PATCH, url, body)).await
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use super::{ApiRequest, ApiResponse, Transport, TransportError};
    use async_trait::async_trait;

    /// A [`Transport`] backed by a `reqwest::Client`.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            let url = request.url;
            let mut builder = self
                .client
                .request(request.method, url.as_str())
                .headers(request.headers);

            if let Some(body) = &request.body {
                let bytes = serde_json::to_vec(body).map_err(|source| {
                    TransportError::MalformedBody {
                        url: url.clone(),
                        source,
                    }
                })?;
                builder = builder.body(bytes);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Network {
                    url: url.clone(),
                    source: e.into(),
                })?;

            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::Network {
                    url: url.clone(),
                    source: e.into(),
                })?;

            if !status.is_success() {
                let body = serde_json::from_slice(&bytes).ok();
                return Err(TransportError::Status { url, status, body });
            }

            if bytes.is_empty() {
                return Ok(ApiResponse::new(status, None));
            }

            let body = serde_json::from_slice(&bytes)
                .map_err(|source| TransportError::MalformedBody { url, source })?;

            Ok(ApiResponse::new(status, Some(body)))
        }
    }
}
