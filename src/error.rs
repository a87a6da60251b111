use std::sync::Arc;

/// Result type used throughout the Subless client.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to Subless.
///
/// The type is `Clone` because a single settings failure is handed to every operation waiting on
/// it.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A configured base URL cannot be used to build endpoint URLs.
    #[error("invalid base url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// A required configuration value is missing from the environment.
    #[error("missing configuration value: {0}")]
    MissingConfiguration(&'static str),

    /// The service rejected the request as unauthorized.
    #[error("unauthorized, session cookie is likely missing or expired")]
    Unauthorized,

    /// The client was created outside a Tokio runtime, so its background tasks cannot start.
    #[error("no Tokio runtime available to run the client")]
    NoRuntime,

    /// The settings loader ended without producing a value. This should normally never happen.
    #[error("settings are unavailable")]
    SettingsUnavailable,

    /// The response body is not the JSON the service is expected to send.
    #[error("malformed response from service")]
    MalformedResponse(#[source] Arc<serde_json::Error>),

    /// Network error or non-success response status.
    #[error(transparent)]
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::MalformedResponse(Arc::new(value))
    }
}
