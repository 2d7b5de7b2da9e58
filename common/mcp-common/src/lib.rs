//! MCP Common - Shared plumbing for MCP servers
//!
//! - **Initialization**: [`init_tracing`] and the `serve_stdio!` macro
//! - **Results**: helpers for building `CallToolResult` responses
//! - **Errors**: [`IntoMcpError`] plus structured error payloads ([`ErrorPayload`])
//! - **Embeddable**: [`EmbeddableMcp`] for driving a server in-process
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{serve_stdio, json_success};
//!
//! // main.rs
//! serve_stdio!(MyServer, "my_mcp");
//!
//! // tool implementation
//! fn my_tool(&self) -> Result<CallToolResult, McpError> {
//!     json_success(&self.load()?)
//! }
//! ```

pub mod embeddable;
pub mod error;
pub mod init;
pub mod result;

pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use error::{
    invalid_params, payload_error, ErrorCategory, ErrorPayload, IntoMcpError, ResultExt,
};
pub use init::init_tracing;
pub use result::json_success;

pub use rmcp::{
    model::{CallToolResult, Tool},
    ErrorData as McpError,
};

pub use async_trait::async_trait;
