//! SQL Server implementation of [`SchemaIntrospector`] and [`QueryExecutor`].
//!
//! Uses [`tiberius`] over a tokio `TcpStream`. Every call opens its own
//! connection and closes it before returning, on the error path too.
//! Named instances (`host\INSTANCE`) are resolved through the SQL Browser
//! service.
//!
//! # Authentication
//!
//! Trusted (integrated) authentication is the only credential path. It is
//! always available on Windows; Unix builds need the
//! `integrated-auth-gssapi` feature and a Kerberos ticket. Without it every
//! connection attempt fails with [`PipelineError::Connection`].

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, Row, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

use super::{QueryExecutor, SchemaIntrospector};
use crate::error::PipelineError;
use crate::result::{CellValue, ResultSet};
use crate::schema::SchemaMap;

type TdsClient = Client<Compat<TcpStream>>;

const INTROSPECTION_SQL: &str = "SELECT TABLE_NAME, COLUMN_NAME \
     FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = @P1 \
     ORDER BY TABLE_NAME, ORDINAL_POSITION";

/// Connection target for [`MssqlDatabase`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `host`, `host\INSTANCE` or `host,port`.
    pub server: String,
    pub database: String,
    /// Schema namespace to introspect, normally `dbo`.
    pub schema: String,
    /// Use the process identity to authenticate.
    pub trusted_connection: bool,
    /// Accept the server's TLS certificate without validation.
    pub trust_server_certificate: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            server: r"localhost\SQLEXPRESS".to_owned(),
            database: "SalesDB".to_owned(),
            schema: "dbo".to_owned(),
            trusted_connection: true,
            trust_server_certificate: true,
        }
    }
}

/// Parsed form of [`DbConfig::server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub instance: Option<String>,
    pub port: Option<u16>,
}

impl FromStr for ServerAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("tcp:").unwrap_or(s);

        let (rest, port) = match s.split_once(',') {
            Some((rest, port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|e| format!("invalid port in server address {s:?}: {e}"))?;
                (rest, Some(port))
            }
            None => (s, None),
        };

        let (host, instance) = match rest.split_once('\\') {
            Some((host, instance)) if !instance.trim().is_empty() => {
                (host.trim(), Some(instance.trim().to_owned()))
            }
            Some((host, _)) => (host.trim(), None),
            None => (rest.trim(), None),
        };

        let host = match host {
            "" => return Err(format!("server address {s:?} has no host")),
            "." | "(local)" => "localhost",
            h => h,
        };

        Ok(Self {
            host: host.to_owned(),
            instance,
            port,
        })
    }
}

/// SQL Server backend, connection-per-call.
#[derive(Debug, Clone)]
pub struct MssqlDatabase {
    config: DbConfig,
}

impl MssqlDatabase {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    fn tds_config(&self) -> Result<Config, String> {
        let addr: ServerAddress = self.config.server.parse()?;

        let mut config = Config::new();
        config.host(&addr.host);
        if let Some(port) = addr.port {
            config.port(port);
        }
        if let Some(instance) = &addr.instance {
            config.instance_name(instance);
        }
        config.database(&self.config.database);
        config.application_name("sqlgen");
        config.authentication(self.auth_method()?);
        if self.config.trust_server_certificate {
            config.trust_cert();
        }
        Ok(config)
    }

    fn auth_method(&self) -> Result<AuthMethod, String> {
        if !self.config.trusted_connection {
            return Err(
                "trusted connection is disabled and no other credential mechanism is supported"
                    .to_owned(),
            );
        }
        integrated_auth()
    }

    async fn connect(&self) -> Result<TdsClient, String> {
        let config = self.tds_config()?;
        let tcp = TcpStream::connect_named(&config)
            .await
            .map_err(|e| format!("cannot reach {}: {e}", self.config.server))?;
        tcp.set_nodelay(true).map_err(|e| e.to_string())?;
        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| e.to_string())?;
        debug!(server = %self.config.server, database = %self.config.database, "connected");
        Ok(client)
    }
}

#[cfg(any(windows, feature = "integrated-auth-gssapi"))]
fn integrated_auth() -> Result<AuthMethod, String> {
    Ok(AuthMethod::Integrated)
}

#[cfg(not(any(windows, feature = "integrated-auth-gssapi")))]
fn integrated_auth() -> Result<AuthMethod, String> {
    Err("integrated authentication is not available in this build \
         (enable the `integrated-auth-gssapi` feature)"
        .to_owned())
}

impl SchemaIntrospector for MssqlDatabase {
    async fn fetch_schema(&self) -> Result<SchemaMap, PipelineError> {
        let mut client = self.connect().await.map_err(PipelineError::Connection)?;
        let result = introspect(&mut client, &self.config.schema).await;
        release(client).await;

        let schema = result.map_err(|e| PipelineError::SchemaQuery(e.to_string()))?;
        debug!(tables = schema.len(), namespace = %self.config.schema, "schema fetched");
        Ok(schema)
    }
}

impl QueryExecutor for MssqlDatabase {
    async fn execute(&self, query: &str) -> Result<ResultSet, PipelineError> {
        let mut client = self.connect().await.map_err(PipelineError::Execution)?;
        let result = run(&mut client, query).await;
        release(client).await;

        let rs = result.map_err(|e| PipelineError::Execution(e.to_string()))?;
        debug!(columns = rs.columns.len(), rows = rs.rows.len(), "query executed");
        Ok(rs)
    }
}

async fn introspect(client: &mut TdsClient, namespace: &str) -> tiberius::Result<SchemaMap> {
    let rows = client
        .query(INTROSPECTION_SQL, &[&namespace])
        .await?
        .into_first_result()
        .await?;

    let mut schema = SchemaMap::new();
    for row in rows {
        let table: Option<&str> = row.try_get(0)?;
        let column: Option<&str> = row.try_get(1)?;
        if let (Some(table), Some(column)) = (table, column) {
            schema.push(table, column);
        }
    }
    Ok(schema)
}

async fn run(client: &mut TdsClient, query: &str) -> tiberius::Result<ResultSet> {
    let mut stream = client.simple_query(query).await?;
    let columns: Vec<String> = stream
        .columns()
        .await?
        .map(|cols| cols.iter().map(|c| c.name().to_owned()).collect())
        .unwrap_or_default();
    let rows = stream.into_first_result().await?;
    Ok(ResultSet::new(columns, rows.into_iter().map(row_cells).collect()))
}

async fn release(client: TdsClient) {
    if let Err(e) = client.close().await {
        warn!(error = %e, "failed to close database connection cleanly");
    }
}

fn row_cells(row: Row) -> Vec<CellValue> {
    row.into_iter().map(|data| cell_value(&data)).collect()
}

fn cell_value(data: &ColumnData<'static>) -> CellValue {
    let cell = match data {
        ColumnData::U8(v) => v.map(|x| CellValue::Int(i64::from(x))),
        ColumnData::I16(v) => v.map(|x| CellValue::Int(i64::from(x))),
        ColumnData::I32(v) => v.map(|x| CellValue::Int(i64::from(x))),
        ColumnData::I64(v) => v.map(CellValue::Int),
        ColumnData::F32(v) => v.map(|x| CellValue::Float(f64::from(x))),
        ColumnData::F64(v) => v.map(CellValue::Float),
        ColumnData::Bit(v) => v.map(CellValue::Bool),
        ColumnData::String(v) => v.as_deref().map(|s| CellValue::Text(s.to_owned())),
        ColumnData::Guid(v) => v.as_ref().map(|g| CellValue::Text(g.to_string())),
        ColumnData::Numeric(v) => v.as_ref().map(|n| CellValue::Text(n.to_string())),
        ColumnData::Binary(v) => v.as_deref().map(|b| CellValue::Text(hex(b))),
        ColumnData::Xml(v) => v
            .as_deref()
            .map(|x| CellValue::Text(x.clone().into_string())),
        temporal => temporal_value(temporal),
    };
    cell.unwrap_or(CellValue::Null)
}

fn temporal_value(data: &ColumnData<'static>) -> Option<CellValue> {
    if let Ok(Some(v)) = NaiveDateTime::from_sql(data) {
        return Some(CellValue::Text(v.to_string()));
    }
    if let Ok(Some(v)) = NaiveDate::from_sql(data) {
        return Some(CellValue::Text(v.to_string()));
    }
    if let Ok(Some(v)) = NaiveTime::from_sql(data) {
        return Some(CellValue::Text(v.to_string()));
    }
    if let Ok(Some(v)) = DateTime::<FixedOffset>::from_sql(data) {
        return Some(CellValue::Text(v.to_rfc3339()));
    }
    None
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out
}
