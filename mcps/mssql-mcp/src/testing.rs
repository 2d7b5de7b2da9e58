//! In-memory connector for unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ConnectionError, ConnectionErrorKind};
use crate::gateway::{Connector, DriverError, Session};
use crate::types::{ResultSet, ScalarValue, StatementOutcome};

type Responder = Arc<dyn Fn(&str) -> Result<StatementOutcome, DriverError> + Send + Sync>;

/// Observations shared between a mock connector and the test
#[derive(Clone, Default)]
pub struct Counters {
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    /// Sessions dropped, whether or not they were closed first
    pub released: Arc<AtomicUsize>,
    pub statements: Arc<Mutex<Vec<String>>>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

pub struct MockConnector {
    responder: Responder,
    counters: Counters,
    refuse: Option<ConnectionErrorKind>,
    connect_delay: Option<Duration>,
    query_delay: Option<Duration>,
}

impl MockConnector {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<StatementOutcome, DriverError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            counters: Counters::default(),
            refuse: None,
            connect_delay: None,
            query_delay: None,
        }
    }

    /// Every connect attempt fails with `kind`
    pub fn refusing(kind: ConnectionErrorKind) -> Self {
        let mut mock = Self::new(|_| Err(DriverError::client("not connected")));
        mock.refuse = Some(kind);
        mock
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, ConnectionError> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(kind) = self.refuse {
            return Err(ConnectionError::new(kind, "mock refused the login"));
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            responder: self.responder.clone(),
            counters: self.counters.clone(),
            query_delay: self.query_delay,
        }))
    }
}

struct MockSession {
    responder: Responder,
    counters: Counters,
    query_delay: Option<Duration>,
}

#[async_trait]
impl Session for MockSession {
    async fn run(
        &mut self,
        sql: &str,
        _max_rows: Option<usize>,
    ) -> Result<StatementOutcome, DriverError> {
        self.counters.statements.lock().unwrap().push(sql.to_string());
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(sql)
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A row-returning outcome with the given columns
pub fn rows(columns: &[&str], rows: Vec<Vec<ScalarValue>>) -> StatementOutcome {
    let mut set = ResultSet::new(columns.iter().map(|c| c.to_string()).collect());
    set.rows = rows;
    StatementOutcome::Rows(set)
}
