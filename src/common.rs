//! # Common Types and Utilities
//!
//! This module provides the types shared by every layer of the gateway:
//! - The `GatewayError` taxonomy and the `GatewayResult` alias
//! - Constants describing the backend contract and the sanitizer placeholder
//! - Small helpers to render error chains

use std::error::Error;

/// Placeholder that replaces the backend base URL in any text sent to a caller.
pub const SANITIZED_URL_PLACEHOLDER: &str = "https://<host>:<port>/...";
/// Column width of the base64 lines of a PEM body.
pub const PEM_LINE_WIDTH: usize = 64;
/// Response format requested from, and reported to, the backend.
pub const PEM_RESPONSE_FORMAT: &str = "PEM";
/// Sentinel used by the backend (and by the gateway) for "no CRL available".
pub const NULL_CRL: &str = "null";
/// Separator between the messages of an error chain.
pub const ERROR_CHAIN_SEPARATOR: &str = " --- ";

pub type GatewayResult<R> = Result<R, GatewayError>;

/// Represents errors that can occur while serving a tool call
///
/// Validation errors describe caller input and may be echoed verbatim, every other
/// variant may carry backend-origin text and has to be sanitized before it leaves
/// the gateway.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("{message}")]
    InvalidParams {
        message: String,
        field: String,
        value: String,
    },
    #[error("Failed to parse PEM certificate: {reason}")]
    Parse {
        field: String,
        value: String,
        reason: String,
    },
    #[error("Backend unavailable: {0}")]
    Transport(String),
    #[error("Backend returned status {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("Unexpected backend payload: {0}")]
    Payload(String),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    IO(String),
}

impl GatewayError {
    pub fn invalid_params(message: impl Into<String>, field: &str, value: &str) -> Self {
        GatewayError::InvalidParams {
            message: message.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the error was raised while talking to the CA backend.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_) | GatewayError::Backend { .. } | GatewayError::Payload(_)
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(error_chain(&e))
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::IO(format!("{:?}", e))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Payload(e.to_string())
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(e: serde_yaml::Error) -> Self {
        GatewayError::Configuration(e.to_string())
    }
}

/// Renders an error together with all of its sources
///
/// # Arguments
/// * `error` - The outermost error
///
/// # Returns
/// The messages of the whole `source()` chain joined by `ERROR_CHAIN_SEPARATOR`
pub fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(ERROR_CHAIN_SEPARATOR);
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
