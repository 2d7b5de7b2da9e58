//! Error types for the MSSQL gateway
//!
//! Three layers: configuration errors abort startup, connection errors and
//! operation errors are reported per request. None are retried.

use mcp_common::{payload_error, ErrorCategory, ErrorPayload, IntoMcpError, McpError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration value {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to load settings from {}: {reason}", path.display())]
    Settings { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    Unreachable,
    AuthRejected,
    NotFound,
    Unknown,
}

impl ConnectionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::AuthRejected => "auth_rejected",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        }
    }

    /// Best-effort mapping of SQL Server login error numbers
    pub fn from_server_code(code: u32) -> Self {
        match code {
            // login failed, untrusted domain, account disabled/locked, password expired/must change
            18456 | 18452 | 18470 | 18486 | 18487 | 18488 => Self::AuthRejected,
            // cannot open database requested by the login, database does not exist
            4060 | 911 => Self::NotFound,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to establish a session
#[derive(Error, Debug, Clone)]
#[error("connection failed ({kind}): {message}")]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
}

impl ConnectionError {
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationErrorKind {
    PermissionDenied,
    NotFound,
    QueryFailed,
}

impl OperationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::QueryFailed => "query_failed",
        }
    }
}

impl fmt::Display for OperationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statement issued on an open session failed
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: OperationErrorKind,
    pub message: String,
    /// SQL Server error number, when the server reported one
    pub code: Option<u32>,
}

impl OperationError {
    pub fn new(kind: OperationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: Option<u32>) -> Self {
        self.code = code;
        self
    }
}

/// Anything a dispatched operation can fail with
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

impl GatewayError {
    /// Stable kind string, e.g. `connection.auth_rejected` or `query_failed`
    pub fn kind(&self) -> String {
        match self {
            GatewayError::Connection(e) => format!("connection.{}", e.kind),
            GatewayError::Operation(e) => e.kind.to_string(),
        }
    }
}

impl IntoMcpError for GatewayError {
    fn into_mcp_error(self) -> McpError {
        let kind = self.kind();
        match self {
            GatewayError::Connection(e) => {
                payload_error(ErrorCategory::Internal, ErrorPayload::new(kind, e.message))
            }
            GatewayError::Operation(e) => {
                let category = match e.kind {
                    OperationErrorKind::PermissionDenied => ErrorCategory::InvalidRequest,
                    OperationErrorKind::NotFound => ErrorCategory::NotFound,
                    OperationErrorKind::QueryFailed => ErrorCategory::Internal,
                };
                payload_error(category, ErrorPayload::new(kind, e.message).with_code(e.code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_codes() {
        assert_eq!(
            ConnectionErrorKind::from_server_code(18456),
            ConnectionErrorKind::AuthRejected
        );
        assert_eq!(
            ConnectionErrorKind::from_server_code(4060),
            ConnectionErrorKind::NotFound
        );
        assert_eq!(
            ConnectionErrorKind::from_server_code(1205),
            ConnectionErrorKind::Unknown
        );
    }

    #[test]
    fn test_gateway_error_kind_strings() {
        let err: GatewayError =
            ConnectionError::new(ConnectionErrorKind::AuthRejected, "Login failed").into();
        assert_eq!(err.kind(), "connection.auth_rejected");

        let err: GatewayError =
            OperationError::new(OperationErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind(), "permission_denied");
    }

    #[test]
    fn test_mcp_error_payload() {
        let err: GatewayError =
            OperationError::new(OperationErrorKind::QueryFailed, "Invalid object name 'nope'.")
                .with_code(Some(208))
                .into();

        let mcp = err.into_mcp_error();
        let data = mcp.data.expect("payload");
        assert_eq!(data["kind"], "query_failed");
        assert_eq!(data["code"], 208);
        assert!(data["message"].as_str().unwrap().contains("nope"));
    }

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::new(ConnectionErrorKind::Unreachable, "timed out");
        assert_eq!(err.to_string(), "connection failed (unreachable): timed out");
    }
}
