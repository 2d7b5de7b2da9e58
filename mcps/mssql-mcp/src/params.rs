//! Parameter types for MSSQL MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReadTableParams {
    #[schemars(
        description = "Table to read, as returned by list_tables (e.g. 'dbo.orders' or '[sales].[order.lines]')"
    )]
    pub table: String,

    #[schemars(description = "Maximum rows to return (optional, defaults to the server's read limit; never above the server's result row cap)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteQueryParams {
    #[schemars(description = "T-SQL to execute verbatim. May modify data if the database login is allowed to.")]
    pub query: String,
}
