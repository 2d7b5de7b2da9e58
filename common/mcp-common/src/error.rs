//! Error conversion for MCP servers
//!
//! Domain errors reach the client as MCP errors whose `data` field carries an
//! [`ErrorPayload`], so callers can branch on `kind` instead of parsing text.

use rmcp::ErrorData as McpError;
use serde::Serialize;

/// Structured error body attached to MCP errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Stable machine-readable kind, e.g. `permission_denied`
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Backend error number, when the backend reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

impl ErrorPayload {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: Option<u32>) -> Self {
        self.code = code;
        self
    }
}

/// JSON-RPC error family an [`ErrorPayload`] is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidParams,
    InvalidRequest,
    NotFound,
    Internal,
}

/// Build an MCP error carrying a structured payload
pub fn payload_error(category: ErrorCategory, payload: ErrorPayload) -> McpError {
    let message = format!("{}: {}", payload.kind, payload.message);
    let data = serde_json::to_value(&payload).ok();
    match category {
        ErrorCategory::InvalidParams => McpError::invalid_params(message, data),
        ErrorCategory::InvalidRequest => McpError::invalid_request(message, data),
        ErrorCategory::NotFound => McpError::resource_not_found(message, data),
        ErrorCategory::Internal => McpError::internal_error(message, data),
    }
}

/// Conversion into an MCP error
///
/// Implement this for domain error types so handlers can use
/// [`ResultExt::to_mcp_err`] with `?`.
pub trait IntoMcpError {
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("JSON error: {}", self), None)
    }
}

impl IntoMcpError for anyhow::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("{:#}", self), None)
    }
}

impl IntoMcpError for String {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(self, None)
    }
}

impl IntoMcpError for &str {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(self.to_string(), None)
    }
}

/// `to_mcp_err()` for any `Result` whose error implements [`IntoMcpError`]
pub trait ResultExt<T> {
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(|e| e.into_mcp_error())
    }
}

/// Invalid params error with a plain message
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}
