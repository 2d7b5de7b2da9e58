//! Connection gateway
//!
//! The only place driver-level state lives. A [`Connector`] opens sessions;
//! [`Gateway::open`] wraps one in a [`Connection`] that is used for exactly one
//! operation and then closed. Dropping a [`Connection`] that was never closed
//! still releases its socket, so early returns, panics and cancelled requests
//! cannot leak sessions.

mod tds;

pub use tds::TdsConnector;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConnectionError, ConnectionErrorKind};
use crate::types::StatementOutcome;

/// Error reported by the driver while running a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// SQL Server error number, when the failure came from the server
    pub code: Option<u32>,
    pub message: String,
}

impl DriverError {
    pub fn server(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (error {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// Opens driver sessions
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>, ConnectionError>;
}

/// A live driver session
#[async_trait]
pub trait Session: Send {
    /// Run a batch verbatim
    ///
    /// Returns the first result set, keeping at most `max_rows` rows (and
    /// flagging it truncated if more arrived), or the affected-row count when
    /// the batch produced no result set.
    async fn run(
        &mut self,
        sql: &str,
        max_rows: Option<usize>,
    ) -> Result<StatementOutcome, DriverError>;

    /// Graceful shutdown of the session
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Hands out one connection per operation
#[derive(Clone)]
pub struct Gateway {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl Gateway {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connect_timeout: Duration::from_secs(15),
            query_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, query: Duration) -> Self {
        self.connect_timeout = connect;
        self.query_timeout = query;
        self
    }

    /// Open a session, bounded by the connect timeout
    pub async fn open(&self) -> Result<Connection, ConnectionError> {
        match tokio::time::timeout(self.connect_timeout, self.connector.connect()).await {
            Ok(Ok(session)) => Ok(Connection {
                session: Some(session),
                query_timeout: self.query_timeout,
            }),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Err(ConnectionError::new(
                ConnectionErrorKind::Unreachable,
                format!(
                    "no session established within {}s",
                    self.connect_timeout.as_secs()
                ),
            )),
        }
    }
}

/// One open session, scoped to a single operation
pub struct Connection {
    session: Option<Box<dyn Session>>,
    query_timeout: Duration,
}

impl Connection {
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Run a batch, bounded by the query timeout
    pub async fn run(
        &mut self,
        sql: &str,
        max_rows: Option<usize>,
    ) -> Result<StatementOutcome, DriverError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| DriverError::client("connection is closed"))?;

        let outcome = tokio::time::timeout(self.query_timeout, session.run(sql, max_rows)).await;
        match outcome {
            Ok(result) => result,
            Err(_elapsed) => {
                // The session is mid-response and unusable; drop it now.
                self.session = None;
                Err(DriverError::client(format!(
                    "query timed out after {}s",
                    self.query_timeout.as_secs()
                )))
            }
        }
    }

    /// Release the session. Closing a closed connection does nothing.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::debug!("session close reported an error: {}", e);
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("connection dropped while open; socket released without logout");
        }
    }
}
