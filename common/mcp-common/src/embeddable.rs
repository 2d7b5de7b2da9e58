//! In-process execution of MCP servers
//!
//! [`EmbeddableMcp`] lets a host call a server's tools directly by name,
//! without spawning a subprocess or speaking the stdio transport.
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//!
//! let result = server
//!     .call_tool("execute_query", serde_json::json!({ "query": "SELECT 1 AS x" }))
//!     .await?;
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;

/// Error type for embedded tool calls
#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    /// No tool with that name
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Parameters did not deserialize into the tool's parameter type
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    /// The tool returned an MCP error
    #[error("mcp error: {}", .0.message)]
    McpError(rmcp::ErrorData),
}

impl From<rmcp::ErrorData> for EmbeddableError {
    fn from(err: rmcp::ErrorData) -> Self {
        EmbeddableError::McpError(err)
    }
}

pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// MCP server callable in-process
///
/// Implementations are `Send + Sync` so tools can be called concurrently
/// from multiple tasks.
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    /// Name used in MCP configuration files
    fn server_name(&self) -> &str;

    /// All tools with their input schemas
    fn list_tools(&self) -> Vec<Tool>;

    /// Call a tool by name with JSON parameters
    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    fn server_description(&self) -> Option<&str> {
        None
    }
}
