//! Error types for engine calls and relationship synchronization.

use std::fmt;

/// Errors that can occur when talking to the authorization engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Failed to connect to the engine.
    ConnectionFailed(String),
    /// The engine answered with an error status.
    Server(String),
    /// The request timed out.
    Timeout,
    /// Invalid client configuration (endpoint, token, TLS).
    InvalidConfig(String),
    /// A streaming response failed part-way through.
    Stream(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ConnectionFailed(msg) => write!(f, "engine connection failed: {}", msg),
            EngineError::Server(msg) => write!(f, "engine error: {}", msg),
            EngineError::Timeout => write!(f, "engine request timed out"),
            EngineError::InvalidConfig(msg) => write!(f, "invalid engine config: {}", msg),
            EngineError::Stream(msg) => write!(f, "engine stream failed: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<tonic::transport::Error> for EngineError {
    fn from(err: tonic::transport::Error) -> Self {
        EngineError::ConnectionFailed(err.to_string())
    }
}

impl From<tonic::Status> for EngineError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::DeadlineExceeded => EngineError::Timeout,
            tonic::Code::Unavailable => EngineError::ConnectionFailed(status.message().to_string()),
            _ => EngineError::Server(status.message().to_string()),
        }
    }
}

/// Errors raised while syncing a relationship.
#[derive(Debug)]
pub enum SyncError {
    /// A required field (type, id, relation) was empty.
    Validation(String),
    /// The engine rejected or failed the mutation.
    Engine(EngineError),
    /// A custom handler reported a failure.
    Handler(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Validation(msg) => write!(f, "invalid relationship: {}", msg),
            SyncError::Engine(err) => write!(f, "{}", err),
            SyncError::Handler(msg) => write!(f, "handler failed: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for SyncError {
    fn from(err: EngineError) -> Self {
        SyncError::Engine(err)
    }
}
