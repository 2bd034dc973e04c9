//! MySQL transport and schema introspection backed by sqlx.

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Decode, Row, Type, TypeInfo};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::ConnectionParameters;
use super::errors::TransportError;
use super::transport::{DbConnection, DbTransport, InterruptHandle, QueryOutput, SchemaProvider};
use crate::framework::core::schema::{SchemaDescriptor, SchemaError, TableSchema};

const COLUMNS_QUERY: &str = r#"
SELECT CAST(TABLE_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_KEY AS CHAR)
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = ?
ORDER BY TABLE_NAME, ORDINAL_POSITION
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
SELECT CAST(TABLE_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR),
       CAST(REFERENCED_TABLE_NAME AS CHAR), CAST(REFERENCED_COLUMN_NAME AS CHAR)
FROM information_schema.KEY_COLUMN_USAGE
WHERE TABLE_SCHEMA = ? AND REFERENCED_TABLE_NAME IS NOT NULL
"#;

fn connect_options(params: &ConnectionParameters) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .username(&params.user)
        .password(&params.password);
    if params.database.is_empty() {
        options
    } else {
        options.database(&params.database)
    }
}

async fn open(
    options: &MySqlConnectOptions,
    connect_timeout_seconds: u64,
) -> Result<MySqlConnection, TransportError> {
    match tokio::time::timeout(
        Duration::from_secs(connect_timeout_seconds),
        MySqlConnection::connect_with(options),
    )
    .await
    {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(TransportError::Connect(e.to_string())),
        Err(_) => Err(TransportError::Connect(format!(
            "connection attempt timed out after {connect_timeout_seconds} seconds"
        ))),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlTransport;

#[async_trait]
impl DbTransport for MySqlTransport {
    async fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> Result<Box<dyn DbConnection>, TransportError> {
        let options = connect_options(params);
        let mut conn = open(&options, params.connect_timeout_seconds).await?;

        // a server that accepts the handshake and then stalls must not hang us here
        let connection_id = match tokio::time::timeout(
            Duration::from_secs(params.connect_timeout_seconds),
            sqlx::query_scalar::<_, u64>("SELECT CONNECTION_ID()").fetch_one(&mut conn),
        )
        .await
        {
            Ok(Ok(id)) => Some(id),
            Ok(Err(e)) => {
                warn!("Could not read connection id, queries cannot be interrupted: {}", e);
                None
            }
            Err(_) => {
                return Err(TransportError::Connect(format!(
                    "server did not answer within {} seconds",
                    params.connect_timeout_seconds
                )))
            }
        };
        debug!(
            "Connected to {} (connection id {:?})",
            params.display_connection(),
            connection_id
        );

        Ok(Box::new(MySqlSession {
            conn: Some(conn),
            options,
            connect_timeout_seconds: params.connect_timeout_seconds,
            connection_id,
        }))
    }
}

pub struct MySqlSession {
    conn: Option<MySqlConnection>,
    options: MySqlConnectOptions,
    connect_timeout_seconds: u64,
    connection_id: Option<u64>,
}

#[async_trait]
impl DbConnection for MySqlSession {
    async fn fetch_all(&mut self, sql: &str) -> Result<QueryOutput, TransportError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| TransportError::Query("connection already closed".to_string()))?;

        let mut output = QueryOutput::default();
        let mut stream = sqlx::query(sql).fetch(&mut *conn);
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| TransportError::Query(e.to_string()))?
        {
            if output.columns.is_empty() {
                output.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }
            let values = (0..row.columns().len())
                .map(|idx| cell_to_json(&row, idx))
                .collect();
            output.rows.push(values);
        }
        Ok(output)
    }

    fn interrupt_handle(&self) -> Option<Box<dyn InterruptHandle>> {
        self.connection_id.map(|connection_id| {
            Box::new(KillQuery {
                options: self.options.clone(),
                connect_timeout_seconds: self.connect_timeout_seconds,
                connection_id,
            }) as Box<dyn InterruptHandle>
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.conn.take() {
            Some(conn) => conn
                .close()
                .await
                .map_err(|e| TransportError::Connect(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Kills the running statement of another session over a fresh connection.
struct KillQuery {
    options: MySqlConnectOptions,
    connect_timeout_seconds: u64,
    connection_id: u64,
}

#[async_trait]
impl InterruptHandle for KillQuery {
    async fn interrupt(&self) -> Result<(), TransportError> {
        let mut conn = open(&self.options, self.connect_timeout_seconds).await?;
        let killed = sqlx::query(&format!("KILL QUERY {}", self.connection_id))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Query(e.to_string()));
        if let Err(e) = conn.close().await {
            debug!("Failed to close interrupt connection: {}", e);
        }
        debug!("Sent KILL QUERY for connection {}", self.connection_id);
        killed
    }
}

// ==========================================================================
// Value decoding
// ==========================================================================

/// `None` when the value could not be decoded as `T`, `Some(None)` for NULL.
fn decode<'r, T>(row: &'r MySqlRow, idx: usize) -> Option<Option<T>>
where
    T: Decode<'r, MySql> + Type<MySql>,
{
    row.try_get::<Option<T>, _>(idx).ok()
}

fn cell_to_json(row: &MySqlRow, idx: usize) -> Value {
    let type_name = row
        .columns()
        .get(idx)
        .map(|c| c.type_info().name().to_string())
        .unwrap_or_default();

    let typed = match type_name.as_str() {
        "BOOLEAN" => decode::<bool>(row, idx).map(|v| v.map(Value::from)),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            decode::<i64>(row, idx).map(|v| v.map(Value::from))
        }
        name if name.ends_with("UNSIGNED") => decode::<u64>(row, idx).map(|v| v.map(Value::from)),
        "FLOAT" => decode::<f32>(row, idx).map(|v| v.map(|f| Value::from(f64::from(f)))),
        "DOUBLE" => decode::<f64>(row, idx).map(|v| v.map(Value::from)),
        "DECIMAL" => decode::<rust_decimal::Decimal>(row, idx).map(|v| v.map(decimal_to_json)),
        "DATE" => decode::<chrono::NaiveDate>(row, idx)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))),
        "DATETIME" => decode::<chrono::NaiveDateTime>(row, idx)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string()))),
        "TIMESTAMP" => decode::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|v| v.map(|d| Value::String(d.to_rfc3339()))),
        "TIME" => decode::<chrono::NaiveTime>(row, idx).map(|v| v.map(|t| Value::String(t.to_string()))),
        "JSON" => decode::<String>(row, idx)
            .map(|v| v.map(|s| serde_json::from_str(&s).unwrap_or(Value::String(s)))),
        _ => None,
    };

    match typed.or_else(|| fallback(row, idx)) {
        Some(Some(value)) => value,
        _ => Value::Null,
    }
}

fn fallback(row: &MySqlRow, idx: usize) -> Option<Option<Value>> {
    decode::<String>(row, idx)
        .map(|v| v.map(Value::String))
        .or_else(|| decode::<i64>(row, idx).map(|v| v.map(Value::from)))
        .or_else(|| decode::<u64>(row, idx).map(|v| v.map(Value::from)))
        .or_else(|| decode::<f64>(row, idx).map(|v| v.map(Value::from)))
        .or_else(|| {
            decode::<Vec<u8>>(row, idx)
                .map(|v| v.map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
        })
}

fn decimal_to_json(d: rust_decimal::Decimal) -> Value {
    let text = d.to_string();
    match text.parse::<serde_json::Number>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(text),
    }
}

// ==========================================================================
// Schema introspection
// ==========================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlSchemaProvider;

fn text(row: &MySqlRow, idx: usize) -> Option<String> {
    match decode::<String>(row, idx) {
        Some(value) => value,
        None => decode::<Vec<u8>>(row, idx)
            .flatten()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    }
}

#[async_trait]
impl SchemaProvider for MySqlSchemaProvider {
    async fn fetch_schema(
        &self,
        params: &ConnectionParameters,
    ) -> Result<SchemaDescriptor, SchemaError> {
        let introspection = |e: sqlx::Error| SchemaError::Introspection(e.to_string());
        let options = connect_options(params);
        let mut conn = open(&options, params.connect_timeout_seconds)
            .await
            .map_err(|e| SchemaError::Introspection(e.to_string()))?;

        let column_rows = sqlx::query(COLUMNS_QUERY)
            .bind(&params.database)
            .fetch_all(&mut conn)
            .await
            .map_err(introspection)?;
        let key_rows = sqlx::query(FOREIGN_KEYS_QUERY)
            .bind(&params.database)
            .fetch_all(&mut conn)
            .await
            .map_err(introspection)?;

        if let Err(e) = conn.close().await {
            debug!("Failed to close introspection connection: {}", e);
        }

        let mut tables: BTreeMap<String, TableSchema> = BTreeMap::new();
        for row in &column_rows {
            let (Some(table), Some(column)) = (text(row, 0), text(row, 1)) else {
                continue;
            };
            let entry = tables.entry(table).or_default();
            if text(row, 2).as_deref() == Some("PRI") && entry.primary_key.is_none() {
                entry.primary_key = Some(column.clone());
            }
            entry.columns.push(column);
        }

        for row in &key_rows {
            let (Some(table), Some(column), Some(ref_table), Some(ref_column)) =
                (text(row, 0), text(row, 1), text(row, 2), text(row, 3))
            else {
                continue;
            };
            if let Some(entry) = tables.get_mut(&table) {
                entry
                    .foreign_keys
                    .insert(column, format!("{ref_table}.{ref_column}"));
            }
        }

        debug!("Introspected {} tables from {}", tables.len(), params.database);
        Ok(tables.into_iter().collect())
    }
}
