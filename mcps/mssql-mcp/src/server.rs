//! MSSQL MCP Server implementation
//!
//! Tools delegate to the handlers module; table resources to the resources
//! module. Both go through one [`Dispatcher`], which opens a fresh connection
//! per call.

use std::sync::Arc;
use std::time::Duration;

use mcp_common::{
    async_trait, CallToolResult, EmbeddableError, EmbeddableMcp, EmbeddableResult, McpError, Tool,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        ListResourcesResult, PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult,
        ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router, RoleServer,
};
use serde_json::Value;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::gateway::{Gateway, TdsConnector};
use crate::handlers;
use crate::params::*;
use crate::resources;

const INSTRUCTIONS: &str = "Microsoft SQL Server MCP server. \
     Use list_tables to discover tables, read_table to sample a table's rows, \
     and execute_query to run T-SQL. execute_query runs statements verbatim and \
     can modify data; what it may do is decided solely by the database login's grants. \
     Tables are also published as mssql://<schema.table>/data resources.";

/// The MSSQL MCP Server
#[derive(Clone)]
pub struct MssqlMcpServer {
    dispatcher: Dispatcher,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Tool Router - Each tool delegates to its handler
// ============================================================================

#[tool_router]
impl MssqlMcpServer {
    /// Resolve configuration from the environment and build the server
    ///
    /// Fails if any `MSSQL_*` credential is missing; the binary must not start
    /// serving without a complete configuration.
    pub fn new() -> anyhow::Result<Self> {
        let config = ServerConfig::resolve()?;

        tracing::info!(
            driver = %config.connection.driver,
            host = %config.connection.host,
            database = %config.connection.database,
            user = %config.connection.user,
            "Resolved database configuration"
        );

        Ok(Self::with_config(config))
    }

    /// Build a server talking TDS with an already-resolved configuration
    pub fn with_config(config: ServerConfig) -> Self {
        let ServerConfig {
            connection,
            settings,
        } = config;

        let gateway = Gateway::new(Arc::new(TdsConnector::new(
            connection,
            settings.connection.clone(),
        )))
        .with_timeouts(
            Duration::from_secs(settings.connection.connect_timeout_secs),
            Duration::from_secs(settings.connection.query_timeout_secs),
        );

        Self::with_dispatcher(Dispatcher::new(gateway, &settings.limits))
    }

    /// Build a server around any dispatcher (custom connectors, tests)
    pub fn with_dispatcher(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List all base tables in the configured database as schema-qualified names. Order is whatever the catalog returns.")]
    async fn list_tables(&self) -> Result<CallToolResult, McpError> {
        handlers::list_tables(&self.dispatcher).await
    }

    #[tool(description = "Read rows from a table. Returns column names and rows as JSON. Row count is capped by 'limit' or, if omitted, the server's default read limit.")]
    async fn read_table(
        &self,
        Parameters(params): Parameters<ReadTableParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::read_table(&self.dispatcher, params).await
    }

    #[tool(description = "Execute a T-SQL statement verbatim. Returns column names and rows for queries, or rows_affected for other statements. Not read-only: INSERT, UPDATE, DELETE and DDL run if the database login is granted them.")]
    async fn execute_query(
        &self,
        Parameters(params): Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::execute_query(&self.dispatcher, params).await
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for MssqlMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        resources::list(&self.dispatcher).await
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        resources::read(&self.dispatcher, &request.uri).await
    }
}

// ============================================================================
// EmbeddableMcp Implementation
// ============================================================================

#[async_trait]
impl EmbeddableMcp for MssqlMcpServer {
    fn server_name(&self) -> &str {
        "mssql"
    }

    fn server_description(&self) -> Option<&str> {
        Some(INSTRUCTIONS)
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        match name {
            "list_tables" => self.list_tables().await.map_err(Into::into),

            "read_table" => {
                let params: ReadTableParams = serde_json::from_value(params)?;
                self.read_table(Parameters(params)).await.map_err(Into::into)
            }

            "execute_query" => {
                let params: ExecuteQueryParams = serde_json::from_value(params)?;
                self.execute_query(Parameters(params))
                    .await
                    .map_err(Into::into)
            }

            _ => Err(EmbeddableError::ToolNotFound(name.to_string())),
        }
    }
}
