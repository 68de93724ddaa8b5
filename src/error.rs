//! Error types for the relay.

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Object store read failures. Fatal for the record being processed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Object store HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The raw bytes could not be interpreted as a mail message at all.
#[derive(Debug, thiserror::Error)]
#[error("Malformed message: {reason}")]
pub struct MalformedMessage {
    pub reason: String,
}

impl MalformedMessage {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A record-level failure: the record could not be fetched or parsed.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Malformed(#[from] MalformedMessage),
}

/// Parameter store lookups. Always absorbed by the subscriber directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Parameter not found: {0}")]
    NotFound(String),

    #[error("Invalid parameter name: {0}")]
    InvalidName(String),

    #[error("Failed to decode subscriber list {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures building the forwarded message.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Subscriber set is empty")]
    NoSubscribers,

    #[error("No valid subscriber addresses for {target}")]
    NoValidRecipients { target: String },

    #[error("Invalid forwarding address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),
}

/// Outbound transport failures. Never retried locally.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Transport {transport} rejected message: {reason}")]
    Rejected { transport: String, reason: String },

    #[error("Transport {transport} failed: {reason}")]
    Transport { transport: String, reason: String },
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
