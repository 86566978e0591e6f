//! Error types for the sentiment service

/// Result type alias using the service's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for sentiment operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model produced a probability vector that violates its class schema
    #[error("invalid model output: {0}")]
    InvalidModelOutput(String),

    /// The local classifier could not be initialized
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The remote completion backend could not be used
    #[error("external service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    /// Document store read/write errors
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed client input
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure causes for the remote completion backend.
///
/// A missing credential and a failed call are kept apart so callers can tell
/// a deployment problem from a transient one.
#[derive(Debug, thiserror::Error)]
pub enum ExternalServiceError {
    /// No credential configured in the environment
    #[error("no credential configured, set {0}")]
    MissingCredential(&'static str),

    /// Transport-level failure (connect, timeout, TLS)
    #[error("request failed: {0}")]
    Request(String),

    /// The remote answered with a non-success status (auth, quota, ...)
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl Error {
    /// Create a new invalid model output error
    pub fn invalid_model_output(msg: impl Into<String>) -> Self {
        Self::InvalidModelOutput(msg.into())
    }

    /// Create a new model unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable kind, used for metrics labels and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidModelOutput(_) => "invalid_model_output",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::ExternalService(_) => "external_service_error",
            Self::Storage(_) => "storage_error",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Config(_) => "configuration_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
