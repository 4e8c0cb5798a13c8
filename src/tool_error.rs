use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::common::GatewayError;
use crate::sanitizer::sanitize;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Protocol level error delivered to the caller of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: i32,
    pub message: String,
    pub data: Value,
}

impl ToolError {
    pub fn new(code: i32, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn invalid_params(message: impl Into<String>, field: &str, value: &str) -> Self {
        Self::new(INVALID_PARAMS, message, json!({ "field": field, "value": value }))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Unknown method or tool: {}", method), Value::Null)
    }

    /// Maps a gateway failure onto the protocol taxonomy
    ///
    /// Caller input is echoed as is, backend-origin text goes through the sanitizer.
    pub fn from_gateway_error(error: GatewayError, backend_base_url: &str) -> Self {
        match error {
            GatewayError::InvalidParams { message, field, value } => Self::invalid_params(message, &field, &value),
            GatewayError::Parse { field, value, reason } => Self::new(
                INVALID_PARAMS,
                "Failed to parse PEM certificate.",
                json!({ "field": field, "value": value, "reason": reason }),
            ),
            error @ (GatewayError::Transport(_) | GatewayError::Backend { .. } | GatewayError::Payload(_)) => {
                Self::new(
                    INTERNAL_ERROR,
                    "CA backend request failed.",
                    Value::String(sanitize(&error.to_string(), backend_base_url)),
                )
            }
            error @ (GatewayError::Configuration(_) | GatewayError::IO(_)) => Self::new(
                INTERNAL_ERROR,
                "Internal gateway error.",
                Value::String(sanitize(&error.to_string(), backend_base_url)),
            ),
        }
    }
}
