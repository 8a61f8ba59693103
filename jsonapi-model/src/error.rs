use crate::{
    config::ConfigError,
    entity::{AttributeError, EntityError},
    transport::TransportError,
};

/// Errors returned by model and query operations.
///
/// Transport failures are wrapped as they come, so the caller can inspect the exact
/// [`TransportError`] the transport produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Attribute(#[from] AttributeError),
    #[error(transparent)]
    Entity(#[from] EntityError),
    #[error("Cannot {0} a model with no identity")]
    MissingIdentity(&'static str),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Response from '{url}' is not a JSON:API document: '{source}'")]
    Document {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid request URL '{url}': '{source}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to encode write payload: '{0}'")]
    Payload(#[source] serde_json::Error),
}

impl Error {
    /// The transport error behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}
