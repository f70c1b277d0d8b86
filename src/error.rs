//! Error types for oraclewire.

use thiserror::Error;

/// Main error type for all oracle operations.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Attempted to register a handler under an empty query name.
    #[error("empty query name")]
    EmptyQueryName,

    /// A handler is already registered for this query name.
    #[error("query {0:?} is already registered")]
    DuplicateQuery(String),

    /// No handler is registered for the requested query.
    #[error("invalid query {0:?}")]
    UnknownQuery(String),

    /// Raw query text does not follow the grammar.
    #[error("invalid query")]
    InvalidQuery,

    /// An argument pair is not of the form `key=value`.
    #[error("invalid argument {0:?}, should be in format key=value")]
    InvalidArgument(String),

    /// Argument is missing or cannot be converted to the requested type.
    #[error("argument {key:?}: {reason}")]
    ArgumentType {
        /// Argument key.
        key: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// The handler declined to answer (application-level failure).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Payload could not be decoded into query text.
    #[error("decode error: {0}")]
    Decode(String),

    /// Base64 payload decoding error.
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded payload is not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON serialization/deserialization error (configuration).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// The backend has no registration for this identity.
    #[error("oracle {0} is not registered")]
    NotRegistered(String),

    /// The backend does not know the referenced query.
    #[error("unknown query id {0}")]
    UnknownQueryId(String),

    /// The external channel reported a failure.
    #[error("channel error: {0}")]
    Channel(String),

    /// The oracle task panicked or was aborted.
    #[error("oracle task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias using OracleError.
pub type Result<T> = std::result::Result<T, OracleError>;
