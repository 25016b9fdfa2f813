use http::{Method, StatusCode};
use thiserror::Error;

use crate::models::envelope::ApiErrorBody;

/// Transport-level failure: no HTTP response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkFailure {
    /// The request budget elapsed.
    #[error("Request timed out")]
    Timeout,

    /// DNS resolution or the TCP/TLS connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other transport error.
    #[error("Network error: {0}")]
    Other(String),
}

impl From<&reqwest::Error> for NetworkFailure {
    fn from(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            NetworkFailure::Timeout
        } else if error.is_connect() {
            NetworkFailure::ConnectionFailed(error.to_string())
        } else {
            NetworkFailure::Other(error.to_string())
        }
    }
}

/// Why a token renewal could not produce a new access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailureKind {
    /// No refresh token was stored.
    MissingRefreshToken,
    /// The refresh endpoint answered with an error status.
    Rejected(StatusCode),
    /// The refresh call never got a response.
    Network(NetworkFailure),
    /// The refresh endpoint answered 2xx with an unusable body.
    InvalidPayload,
}

/// The shared outcome handed to every request waiting on one refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RefreshFailure {
    pub kind: RefreshFailureKind,
    pub message: String,
}

impl RefreshFailure {
    pub fn new(kind: RefreshFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies an error returned by the refresh endpoint.
    pub fn from_error(error: &ClientError) -> Self {
        let kind = match error {
            ClientError::Network(network) => RefreshFailureKind::Network(network.clone()),
            other => match other.status() {
                Some(status) => RefreshFailureKind::Rejected(status),
                None => RefreshFailureKind::InvalidPayload,
            },
        };
        Self::new(kind, error.user_message())
    }

    pub fn missing_refresh_token() -> Self {
        Self::new(
            RefreshFailureKind::MissingRefreshToken,
            "No refresh token available",
        )
    }
}

/// The client's error type.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// No response was received.
    #[error(transparent)]
    Network(#[from] NetworkFailure),

    /// The API answered with a structured error envelope.
    #[error("API error {status} ({code}): {message}", code = .body.code, message = .body.message)]
    Api {
        status: StatusCode,
        method: Method,
        body: ApiErrorBody,
    },

    /// The API answered with an error status but no parseable error object.
    #[error("Invalid response format (HTTP {status})")]
    MalformedResponse { status: StatusCode, method: Method },

    /// The session could not be renewed and has been cleared.
    #[error("Session expired: {0}")]
    SessionExpired(RefreshFailure),

    /// A refresh was requested without a stored refresh token.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// Client-side input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A success response carried a body that could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A `Result` type that uses `ClientError` as the error type.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// The HTTP status, when a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } | ClientError::MalformedResponse { status, .. } => {
                Some(*status)
            }
            ClientError::SessionExpired(_) => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// The structured error body, if the API sent one.
    pub fn api_body(&self) -> Option<&ApiErrorBody> {
        match self {
            ClientError::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    /// A human-readable message: the server's own message when it sent one,
    /// otherwise this error's display text.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { body, .. } if !body.message.trim().is_empty() => {
                body.message.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<sonic_rs::Error> for ClientError {
    fn from(error: sonic_rs::Error) -> Self {
        ClientError::Decode(error.to_string())
    }
}

impl From<redis::RedisError> for ClientError {
    fn from(error: redis::RedisError) -> Self {
        ClientError::Storage(format!("Redis error: {}", error))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> Self {
        ClientError::Storage(format!("IO error: {}", error))
    }
}

impl From<garde::Report> for ClientError {
    fn from(report: garde::Report) -> Self {
        ClientError::Validation(report.to_string())
    }
}
