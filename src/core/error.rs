//! Typed error handling for crudkit
//!
//! Every failure the gateway can produce is reported to the caller as a
//! [`GatewayError`]. Callers match on the variant (or on [`ErrorKind`]) to
//! decide what to show and whether to retry.
//!
//! # Error Categories
//!
//! - [`GatewayError`]: Errors produced by a request going through the gateway
//! - [`ConfigError`]: Errors related to configuration parsing and validation
//!
//! # Example
//!
//! ```rust,ignore
//! use crudkit::prelude::*;
//!
//! match gateway.request(HttpMethod::Get, "/todos", RequestOptions::default()).await {
//!     Ok(todos) => println!("{}", todos),
//!     Err(GatewayError::HttpStatus { status: 404, .. }) => println!("no todos"),
//!     Err(e) if e.is_retryable() => println!("try again later: {}", e),
//!     Err(e) => eprintln!("request failed: {}", e),
//! }
//! ```

use serde::Serialize;
use std::fmt;

/// Coarse classification of a [`GatewayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Timeout,
    HttpStatus,
    NetworkUnreachable,
    Cancelled,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Timeout => "Timeout",
            ErrorKind::HttpStatus => "HttpStatus",
            ErrorKind::NetworkUnreachable => "NetworkUnreachable",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Errors produced by a request issued through the gateway
///
/// Cloneable so that a single de-duplicated result can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The request did not settle before its timeout elapsed
    Timeout {
        method: String,
        url: String,
        timeout_ms: u64,
    },

    /// The server answered with a non-2xx status
    HttpStatus {
        url: String,
        status: u16,
        status_text: String,
    },

    /// No response was received
    NetworkUnreachable { url: String, message: String },

    /// The request was aborted through the cancellation registry
    Cancelled { key: String },

    /// Anything else (body decoding, request building, ...)
    Other { message: String },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Timeout {
                method,
                url,
                timeout_ms,
            } => {
                write!(f, "{} {} timed out after {}ms", method, url, timeout_ms)
            }
            GatewayError::HttpStatus {
                url,
                status,
                status_text,
            } => {
                write!(f, "HTTP {} {} for {}", status, status_text, url)
            }
            GatewayError::NetworkUnreachable { url, message } => {
                write!(f, "Network unreachable for {}: {}", url, message)
            }
            GatewayError::Cancelled { key } => write!(f, "Request cancelled: {}", key),
            GatewayError::Other { message } => write!(f, "Request failed: {}", message),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Serializable error shape handed to presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl GatewayError {
    pub fn other(message: impl Into<String>) -> Self {
        GatewayError::Other {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Timeout { .. } => ErrorKind::Timeout,
            GatewayError::HttpStatus { .. } => ErrorKind::HttpStatus,
            GatewayError::NetworkUnreachable { .. } => ErrorKind::NetworkUnreachable,
            GatewayError::Cancelled { .. } => ErrorKind::Cancelled,
            GatewayError::Other { .. } => ErrorKind::Other,
        }
    }

    /// HTTP status code, only present for [`GatewayError::HttpStatus`]
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Timeout { .. } => "REQUEST_TIMEOUT",
            GatewayError::HttpStatus { status, .. } if *status >= 500 => "SERVER_ERROR",
            GatewayError::HttpStatus { status: 404, .. } => "NOT_FOUND",
            GatewayError::HttpStatus { .. } => "CLIENT_ERROR",
            GatewayError::NetworkUnreachable { .. } => "NETWORK_UNREACHABLE",
            GatewayError::Cancelled { .. } => "REQUEST_CANCELLED",
            GatewayError::Other { .. } => "REQUEST_FAILED",
        }
    }

    /// Whether a caller-side retry policy may try this request again
    ///
    /// Cancellation is never retried: someone asked for the request to stop.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Timeout { .. } | GatewayError::NetworkUnreachable { .. } => true,
            GatewayError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            GatewayError::Cancelled { .. } | GatewayError::Other { .. } => false,
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
            status: self.status(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::other(format!("invalid JSON: {}", err))
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}
