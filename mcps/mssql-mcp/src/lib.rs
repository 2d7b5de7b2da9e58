//! MSSQL MCP Library
//!
//! Exposes a Microsoft SQL Server database to MCP clients: list tables,
//! read a capped sample of a table, and run arbitrary T-SQL. Every call opens
//! its own connection and releases it before returning.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use mssql_mcp::MssqlMcpServer;
//!
//! let server = MssqlMcpServer::new()?;
//! // Use with in-memory transport or serve via stdio
//! ```
//!
//! - Credentials come from `MSSQL_DRIVER`, `MSSQL_HOST`, `MSSQL_USER`,
//!   `MSSQL_PASSWORD` and `MSSQL_DATABASE`
//! - Timeouts and row limits come from `~/.binks/mssql.toml` when present

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod params;
pub mod resources;
pub mod server;
#[cfg(test)]
mod testing;
pub mod types;

// Re-export main server type
pub use server::MssqlMcpServer;

// Re-export parameter types for direct API usage
pub use params::*;

pub use config::{ConnectionConfig, ServerConfig, Settings};
pub use dispatcher::Dispatcher;
pub use error::{ConnectionError, ConnectionErrorKind, GatewayError, OperationError, OperationErrorKind};
pub use gateway::{Connector, Gateway, Session, TdsConnector};
pub use types::{ResultSet, ScalarValue, StatementOutcome, TableIdentifier};
