//! Operation dispatcher
//!
//! Maps `list_tables`, `read_table` and `execute_query` onto SQL issued
//! through the [`Gateway`]. Each call opens its own connection, runs one
//! batch, closes the connection and returns. Nothing is shared or cached
//! between calls.

use crate::config::LimitSettings;
use crate::error::{GatewayError, OperationError, OperationErrorKind};
use crate::gateway::{DriverError, Gateway};
use crate::types::{ResultSet, StatementOutcome, TableIdentifier};

const LIST_TABLES_SQL: &str = "SELECT TABLE_SCHEMA, TABLE_NAME \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_TYPE = 'BASE TABLE'";

/// Invalid object name
const ERR_INVALID_OBJECT: u32 = 208;

/// Permission denied on object / column / statement, database access denied
const PERMISSION_ERRORS: &[u32] = &[229, 230, 262, 297, 300, 916, 15247];

fn is_permission_denied(err: &DriverError) -> bool {
    err.code.is_some_and(|code| PERMISSION_ERRORS.contains(&code))
}

/// Classification used by the catalog and table reads
fn classify(err: DriverError) -> OperationError {
    let kind = match err.code {
        _ if is_permission_denied(&err) => OperationErrorKind::PermissionDenied,
        Some(ERR_INVALID_OBJECT) => OperationErrorKind::NotFound,
        _ => OperationErrorKind::QueryFailed,
    };
    OperationError::new(kind, err.message).with_code(err.code)
}

#[derive(Clone)]
pub struct Dispatcher {
    gateway: Gateway,
    default_read_limit: usize,
    max_result_rows: usize,
}

impl Dispatcher {
    pub fn new(gateway: Gateway, limits: &LimitSettings) -> Self {
        Self {
            gateway,
            default_read_limit: limits.default_read_limit,
            max_result_rows: limits.max_result_rows,
        }
    }

    pub fn default_read_limit(&self) -> usize {
        self.default_read_limit
    }

    /// Open a connection, run one batch, close the connection
    async fn run_scoped(
        &self,
        sql: &str,
        max_rows: Option<usize>,
    ) -> Result<Result<StatementOutcome, DriverError>, GatewayError> {
        let mut conn = self.gateway.open().await?;
        let result = conn.run(sql, max_rows).await;
        conn.close().await;
        Ok(result)
    }

    /// Base tables visible to the configured principal, in catalog order
    ///
    /// No ordering is imposed; compare results as sets.
    pub async fn list_tables(&self) -> Result<Vec<TableIdentifier>, GatewayError> {
        let outcome = self
            .run_scoped(LIST_TABLES_SQL, None)
            .await
            .inspect_err(|e| tracing::warn!(operation = "list_tables", "{}", e))?;

        let set = match outcome {
            Ok(StatementOutcome::Rows(set)) => set,
            Ok(StatementOutcome::Affected { .. }) => {
                return Err(OperationError::new(
                    OperationErrorKind::QueryFailed,
                    "catalog query returned no result set",
                )
                .into())
            }
            Err(e) => {
                let err = classify(e);
                tracing::warn!(operation = "list_tables", kind = %err.kind, "{}", err.message);
                return Err(err.into());
            }
        };

        let tables = set
            .rows
            .iter()
            .filter_map(|row| match row.as_slice() {
                [schema, name] => Some(TableIdentifier::new(schema.as_text(), name.as_text()?)),
                _ => None,
            })
            .collect::<Vec<_>>();

        tracing::info!(operation = "list_tables", count = tables.len(), "listed tables");
        Ok(tables)
    }

    /// Up to `limit` rows of a table (the configured default when `None`)
    ///
    /// The limit never exceeds `max_result_rows`. When a larger limit is
    /// lowered and the ceiling is reached, the set is flagged truncated.
    pub async fn read_table(
        &self,
        table: &TableIdentifier,
        limit: Option<usize>,
    ) -> Result<ResultSet, GatewayError> {
        let requested = limit.unwrap_or(self.default_read_limit);
        let limit = requested.min(self.max_result_rows);
        let sql = format!("SELECT TOP ({}) * FROM {}", limit, table.quoted());

        let outcome = self
            .run_scoped(&sql, Some(limit))
            .await
            .inspect_err(|e| tracing::warn!(operation = "read_table", table = %table, "{}", e))?;

        match outcome {
            Ok(StatementOutcome::Rows(mut set)) => {
                set.truncate(limit);
                // TOP already bounded the read; hitting the caller's own limit is not truncation.
                set.truncated = requested > limit && set.rows.len() == limit;
                tracing::info!(
                    operation = "read_table",
                    table = %table,
                    rows = set.rows.len(),
                    limit,
                    truncated = set.truncated,
                    "read table"
                );
                Ok(set)
            }
            Ok(StatementOutcome::Affected { .. }) => Err(OperationError::new(
                OperationErrorKind::QueryFailed,
                format!("reading {} returned no result set", table),
            )
            .into()),
            Err(e) => {
                let err = classify(e);
                tracing::warn!(operation = "read_table", table = %table, kind = %err.kind, "{}", err.message);
                Err(err.into())
            }
        }
    }

    /// Run caller-supplied SQL exactly as given
    ///
    /// This is the trust boundary: the statement is not parsed, rewritten or
    /// restricted by type. Whatever the configured database principal is
    /// granted will run, including statements that modify data or schema.
    /// Least-privilege grants on that principal are the only enforcement.
    pub async fn execute_query(&self, sql: &str) -> Result<StatementOutcome, GatewayError> {
        tracing::info!(operation = "execute_query", length = sql.len(), "executing statement");
        tracing::debug!(operation = "execute_query", statement = %sql);

        let outcome = self
            .run_scoped(sql, Some(self.max_result_rows))
            .await
            .inspect_err(|e| tracing::warn!(operation = "execute_query", "{}", e))?;

        match outcome {
            Ok(StatementOutcome::Rows(mut set)) => {
                set.truncate(self.max_result_rows);
                tracing::info!(
                    operation = "execute_query",
                    rows = set.rows.len(),
                    truncated = set.truncated,
                    "statement returned rows"
                );
                Ok(StatementOutcome::Rows(set))
            }
            Ok(affected @ StatementOutcome::Affected { .. }) => {
                tracing::info!(operation = "execute_query", ?affected, "statement completed");
                Ok(affected)
            }
            Err(e) => {
                let err = OperationError::new(OperationErrorKind::QueryFailed, e.to_string())
                    .with_code(e.code);
                tracing::warn!(operation = "execute_query", code = ?e.code, "{}", e.message);
                Err(err.into())
            }
        }
    }
}
