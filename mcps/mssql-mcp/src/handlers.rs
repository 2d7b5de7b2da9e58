//! Tool handlers
//!
//! Each handler validates params, calls the dispatcher and renders the
//! outcome as JSON. Gateway errors become MCP errors carrying
//! `{kind, message, code?}`.

use mcp_common::{invalid_params, json_success, CallToolResult, McpError, ResultExt};

use crate::dispatcher::Dispatcher;
use crate::params::*;
use crate::types::{AffectedResponse, QueryResponse, StatementOutcome, TableIdentifier, TableListResponse};

pub async fn list_tables(dispatcher: &Dispatcher) -> Result<CallToolResult, McpError> {
    let tables = dispatcher.list_tables().await.to_mcp_err()?;

    json_success(&TableListResponse {
        count: tables.len(),
        tables,
    })
}

pub async fn read_table(
    dispatcher: &Dispatcher,
    params: ReadTableParams,
) -> Result<CallToolResult, McpError> {
    let table: TableIdentifier = params
        .table
        .parse()
        .map_err(|e| invalid_params(format!("Invalid table '{}': {}", params.table, e)))?;

    if params.limit == Some(0) {
        return Err(invalid_params("limit must be greater than zero"));
    }

    let set = dispatcher.read_table(&table, params.limit).await.to_mcp_err()?;

    json_success(&QueryResponse::from(set))
}

pub async fn execute_query(
    dispatcher: &Dispatcher,
    params: ExecuteQueryParams,
) -> Result<CallToolResult, McpError> {
    if params.query.trim().is_empty() {
        return Err(invalid_params("query cannot be empty"));
    }

    match dispatcher.execute_query(&params.query).await.to_mcp_err()? {
        StatementOutcome::Rows(set) => json_success(&QueryResponse::from(set)),
        StatementOutcome::Affected { rows_affected } => {
            json_success(&AffectedResponse { rows_affected })
        }
    }
}
