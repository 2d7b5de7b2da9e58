//! MSSQL MCP - Microsoft SQL Server access for MCP clients
//!
//! Refuses to start unless the full set of `MSSQL_*` credentials is present.

use mssql_mcp::MssqlMcpServer;

mcp_common::serve_stdio!(MssqlMcpServer, "mssql_mcp");
