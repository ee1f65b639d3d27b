use thiserror::Error;

/// The common error type used by this crate
///
/// None of these reach the host page: the [`crate::Loader`] logs and
/// absorbs them at its boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParleyEmbedError {
    /// A widget URL could not be parsed or extended
    #[error("Invalid widget URL: {0}")]
    InvalidUrl(String),

    /// The page has no `document.body` to mount into yet
    #[error("Document body is not available")]
    MissingBody,

    /// A message was addressed to a transport that has no live window
    #[error("Transport is detached: {0}")]
    DetachedTransport(String),

    /// A message or configuration could not be encoded as JSON
    #[error("Could not encode: {0}")]
    Encode(String),

    /// The page runtime rejected a DOM operation
    #[error("Host operation failed: {0}")]
    Host(String),
}

impl From<url::ParseError> for ParleyEmbedError {
    fn from(value: url::ParseError) -> Self {
        ParleyEmbedError::InvalidUrl(format!("{value}"))
    }
}

impl From<serde_json::Error> for ParleyEmbedError {
    fn from(value: serde_json::Error) -> Self {
        ParleyEmbedError::Encode(format!("{value}"))
    }
}
