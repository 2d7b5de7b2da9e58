//! Integration tests for mssql-mcp against a live SQL Server
//!
//! These tests require:
//! - A reachable SQL Server instance
//! - `MSSQL_DRIVER`, `MSSQL_HOST`, `MSSQL_USER`, `MSSQL_PASSWORD` and
//!   `MSSQL_DATABASE` set for a login that can create temp tables
//!
//! # Running tests
//!
//! ```bash
//! # Local container
//! docker run -e ACCEPT_EULA=Y -e MSSQL_SA_PASSWORD='Passw0rd!' -p 1433:1433 \
//!     mcr.microsoft.com/mssql/server:2022-latest
//!
//! MSSQL_DRIVER="ODBC Driver 18 for SQL Server" MSSQL_HOST=localhost \
//! MSSQL_USER=sa MSSQL_PASSWORD='Passw0rd!' MSSQL_DATABASE=master \
//!     cargo test -p mssql-mcp --test integration -- --ignored
//! ```
//!
//! A local container presents a self-signed certificate; set
//! `trust_server_certificate = true` under `[connection]` in the file named
//! by `MSSQL_MCP_CONFIG_PATH`.

use std::collections::HashSet;

use mcp_common::{EmbeddableError, EmbeddableMcp};
use mssql_mcp::{MssqlMcpServer, ServerConfig};
use rmcp::model::{CallToolResult, RawContent};
use serde_json::{json, Value};

/// Build a server from the environment, or `None` when it is not configured
fn live_server() -> Option<MssqlMcpServer> {
    match ServerConfig::resolve() {
        Ok(config) => Some(MssqlMcpServer::with_config(config)),
        Err(e) => {
            eprintln!("Skipping: {}", e);
            None
        }
    }
}

fn body(result: &CallToolResult) -> Value {
    match &result.content[0].raw {
        RawContent::Text(text) => serde_json::from_str(&text.text).unwrap(),
        other => panic!("expected text content, got {other:?}"),
    }
}

fn error_kind(err: EmbeddableError) -> String {
    match err {
        EmbeddableError::McpError(e) => e.data.expect("error payload")["kind"]
            .as_str()
            .unwrap()
            .to_string(),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// READ-ONLY TESTS
// ============================================================================

#[tokio::test]
#[ignore = "integration test - requires a SQL Server instance"]
async fn select_one() {
    let Some(server) = live_server() else { return };

    let result = server
        .call_tool("execute_query", json!({ "query": "SELECT 1 AS x" }))
        .await
        .unwrap();

    let json = body(&result);
    assert_eq!(json["columns"], json!(["x"]));
    assert_eq!(json["rows"], json!([[1]]));
}

#[tokio::test]
#[ignore = "integration test - requires a SQL Server instance"]
async fn missing_table_is_query_failed() {
    let Some(server) = live_server() else { return };

    let err = server
        .call_tool(
            "execute_query",
            json!({ "query": "SELECT * FROM dbo.mssql_mcp_no_such_table" }),
        )
        .await
        .unwrap_err();

    assert_eq!(error_kind(err), "query_failed");
}

#[tokio::test]
#[ignore = "integration test - requires a SQL Server instance"]
async fn list_tables_is_stable() {
    let Some(server) = live_server() else { return };

    let tables = |result: CallToolResult| -> HashSet<String> {
        body(&result)["tables"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t.as_str().unwrap().to_string())
            .collect()
    };

    let first = tables(server.call_tool("list_tables", json!({})).await.unwrap());
    let second = tables(server.call_tool("list_tables", json!({})).await.unwrap());
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "integration test - requires a SQL Server instance"]
async fn read_missing_table_is_not_found() {
    let Some(server) = live_server() else { return };

    let err = server
        .call_tool("read_table", json!({ "table": "dbo.mssql_mcp_no_such_table" }))
        .await
        .unwrap_err();

    assert_eq!(error_kind(err), "not_found");
}

#[tokio::test]
#[ignore = "integration test - requires a SQL Server instance"]
async fn read_table_respects_limit() {
    let Some(server) = live_server() else { return };

    let result = server
        .call_tool("read_table", json!({ "table": "sys.objects", "limit": 3 }))
        .await
        .unwrap();

    assert!(body(&result)["row_count"].as_u64().unwrap() <= 3);
}

// ============================================================================
// WRITE TESTS (temp tables only, dropped with the session)
// ============================================================================

#[tokio::test]
#[ignore = "integration test - requires a SQL Server instance"]
async fn batch_reports_rows_affected() {
    let Some(server) = live_server() else { return };

    let result = server
        .call_tool(
            "execute_query",
            json!({
                "query": "CREATE TABLE #mcp_probe (id INT); \
                          INSERT INTO #mcp_probe VALUES (1), (2), (3);"
            }),
        )
        .await
        .unwrap();

    assert_eq!(body(&result)["rows_affected"], 3);
}

#[tokio::test]
#[ignore = "integration test - requires a SQL Server instance"]
async fn temp_table_does_not_outlive_its_call() {
    let Some(server) = live_server() else { return };

    server
        .call_tool(
            "execute_query",
            json!({ "query": "CREATE TABLE #mcp_scoped (id INT)" }),
        )
        .await
        .unwrap();

    let err = server
        .call_tool("execute_query", json!({ "query": "SELECT * FROM #mcp_scoped" }))
        .await
        .unwrap_err();

    assert_eq!(error_kind(err), "query_failed");
}
