//! SQL Server sessions over TDS (tiberius on a tokio TCP stream)

use async_trait::async_trait;
use futures::TryStreamExt;
use std::borrow::Cow;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, QueryItem, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{Connector, DriverError, Session};
use crate::config::{ConnectionConfig, ConnectionSettings};
use crate::error::{ConnectionError, ConnectionErrorKind};
use crate::types::{ResultSet, ScalarValue, StatementOutcome};

type TdsClient = Client<Compat<TcpStream>>;

const APPLICATION_NAME: &str = "mssql-mcp";

/// Production connector: one fresh TDS login per session
pub struct TdsConnector {
    connection: ConnectionConfig,
    settings: ConnectionSettings,
}

impl TdsConnector {
    pub fn new(connection: ConnectionConfig, settings: ConnectionSettings) -> Self {
        Self {
            connection,
            settings,
        }
    }

    fn tds_config(&self) -> Config {
        let (host, port) = split_host_port(&self.connection.host, self.settings.port);

        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.database(&self.connection.database);
        config.application_name(APPLICATION_NAME);
        config.authentication(AuthMethod::sql_server(
            &self.connection.user,
            self.connection.password.expose(),
        ));
        config.encryption(if self.settings.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::Off
        });
        if self.settings.trust_server_certificate {
            config.trust_cert();
        }
        config
    }
}

#[async_trait]
impl Connector for TdsConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, ConnectionError> {
        let config = self.tds_config();

        let client = match login(config.clone()).await {
            Ok(client) => client,
            // Azure SQL gateways answer the first login with a redirect.
            Err(tiberius::error::Error::Routing { host, port }) => {
                tracing::debug!("following server redirect to {}:{}", host, port);
                let mut config = config;
                config.host(&host);
                config.port(port);
                login(config).await.map_err(connection_error)?
            }
            Err(e) => return Err(connection_error(e)),
        };

        Ok(Box::new(TdsSession { client }))
    }
}

async fn login(config: Config) -> tiberius::Result<TdsClient> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}

fn connection_error(err: tiberius::error::Error) -> ConnectionError {
    let kind = match &err {
        tiberius::error::Error::Io { .. } => ConnectionErrorKind::Unreachable,
        tiberius::error::Error::Server(token) => ConnectionErrorKind::from_server_code(token.code()),
        _ => ConnectionErrorKind::Unknown,
    };
    let message = match &err {
        tiberius::error::Error::Server(token) => token.message().to_string(),
        other => other.to_string(),
    };
    ConnectionError::new(kind, message)
}

/// Split `host,port` or `host:port`; a named instance (`host\inst`) keeps the fallback port
fn split_host_port(raw: &str, fallback: u16) -> (&str, u16) {
    let split = raw.rsplit_once(',').or_else(|| {
        raw.rsplit_once(':')
            .filter(|(host, _)| !host.contains(':'))
    });
    match split {
        Some((host, port)) => match port.trim().parse() {
            Ok(port) => (host.trim(), port),
            Err(_) => (raw, fallback),
        },
        None => (raw, fallback),
    }
}

impl From<tiberius::error::Error> for DriverError {
    fn from(err: tiberius::error::Error) -> Self {
        match &err {
            tiberius::error::Error::Server(token) => DriverError::server(token.code(), token.message()),
            other => DriverError::client(other.to_string()),
        }
    }
}

struct TdsSession {
    client: TdsClient,
}

impl TdsSession {
    /// Row count of the previous batch, as the session reports it
    async fn last_row_count(&mut self) -> Result<u64, DriverError> {
        let row = self
            .client
            .simple_query("SELECT CAST(@@ROWCOUNT AS BIGINT)")
            .await?
            .into_row()
            .await?;

        let count = row.and_then(|r| r.get::<i64, _>(0)).unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl Session for TdsSession {
    async fn run(
        &mut self,
        sql: &str,
        max_rows: Option<usize>,
    ) -> Result<StatementOutcome, DriverError> {
        let mut first: Option<ResultSet> = None;
        let mut later_sets = 0usize;

        {
            let mut stream = self.client.simple_query(sql).await?;
            while let Some(item) = stream.try_next().await? {
                match item {
                    QueryItem::Metadata(meta) if first.is_none() => {
                        let columns = meta.columns().iter().map(|c| c.name().to_string()).collect();
                        first = Some(ResultSet::new(columns));
                    }
                    QueryItem::Metadata(_) => later_sets += 1,
                    QueryItem::Row(row) if later_sets == 0 => {
                        if let Some(set) = first.as_mut() {
                            if max_rows.map_or(true, |max| set.rows.len() < max) {
                                set.rows.push(row_values(row));
                            } else {
                                set.truncated = true;
                            }
                        }
                    }
                    QueryItem::Row(_) => {}
                }
            }
        }

        if later_sets > 0 {
            tracing::debug!("batch returned {} additional result sets; kept the first", later_sets);
        }

        match first {
            Some(set) => Ok(StatementOutcome::Rows(set)),
            None => Ok(StatementOutcome::Affected {
                rows_affected: self.last_row_count().await?,
            }),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.client.close().await?;
        Ok(())
    }
}

// ============================================================================
// Value Coercion
// ============================================================================

fn row_values(row: Row) -> Vec<ScalarValue> {
    row.into_iter().map(scalar_from).collect()
}

fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> ScalarValue) -> ScalarValue {
    value.map(f).unwrap_or(ScalarValue::Null)
}

fn scalar_from(data: ColumnData<'static>) -> ScalarValue {
    match data {
        ColumnData::U8(v) => or_null(v, |n| ScalarValue::Int(i64::from(n))),
        ColumnData::I16(v) => or_null(v, |n| ScalarValue::Int(i64::from(n))),
        ColumnData::I32(v) => or_null(v, |n| ScalarValue::Int(i64::from(n))),
        ColumnData::I64(v) => or_null(v, ScalarValue::Int),
        ColumnData::F32(v) => or_null(v, |f| ScalarValue::Float(f64::from(f))),
        ColumnData::F64(v) => or_null(v, ScalarValue::Float),
        ColumnData::Bit(v) => or_null(v, ScalarValue::Bool),
        ColumnData::String(v) => or_null(v, |s| ScalarValue::Text(s.into_owned())),
        ColumnData::Guid(v) => or_null(v, |g| ScalarValue::Text(g.to_string())),
        ColumnData::Binary(v) => or_null(v, |b: Cow<'static, [u8]>| {
            ScalarValue::Text(format!("0x{}", hex::encode_upper(b.as_ref())))
        }),
        ColumnData::Numeric(v) => or_null(v, |n| {
            if n.scale() == 0 {
                if let Ok(i) = i64::try_from(n.value()) {
                    return ScalarValue::Int(i);
                }
            }
            ScalarValue::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
        }),
        ColumnData::Xml(v) => or_null(v, |x| ScalarValue::Text(x.into_owned().into_string())),
        other => temporal_from(&other),
    }
}

/// Date and time columns, rendered as ISO-8601 text
fn temporal_from(data: &ColumnData<'static>) -> ScalarValue {
    macro_rules! try_as {
        ($ty:ty, $render:expr) => {
            match <$ty>::from_sql(data) {
                Ok(Some(value)) => return ScalarValue::Text($render(value)),
                Ok(None) => return ScalarValue::Null,
                Err(_) => {}
            }
        };
    }

    try_as!(chrono::NaiveDateTime, |v: chrono::NaiveDateTime| v
        .format("%Y-%m-%dT%H:%M:%S%.f")
        .to_string());
    try_as!(
        chrono::DateTime<chrono::FixedOffset>,
        |v: chrono::DateTime<chrono::FixedOffset>| v.to_rfc3339()
    );
    try_as!(chrono::NaiveDate, |v: chrono::NaiveDate| v.to_string());
    try_as!(chrono::NaiveTime, |v: chrono::NaiveTime| v.to_string());

    ScalarValue::Text(format!("{:?}", data))
}
