//! # Execution Guard
//!
//! Runs an already validated SELECT against one dedicated connection:
//!
//! 1. The statement is rewritten so it returns at most `row_cap` rows.
//! 2. The query runs on a worker task that owns the connection. A supervisor
//!    races that task against the deadline.
//! 3. On timeout the supervisor interrupts the statement server-side, cancels
//!    the worker and waits a short grace period for it to close the
//!    connection. A worker that does not finish in time is aborted, which
//!    drops the connection.
//!
//! Every outcome is folded into an [`ExecutionResult`]; nothing is retried.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::ConnectionParameters;
use super::errors::{ExecutionError, FailureKind};
use super::limit::enforce_row_cap;
use super::transport::{DbTransport, InterruptHandle, QueryOutput};
use crate::utilities::constants::RELEASE_GRACE_MILLIS;

/// Uniform envelope for every execution outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// The statement actually sent to the database.
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ExecutionResult {
    fn succeeded(sql: String, output: QueryOutput, row_cap: u64, started: Instant) -> Self {
        let columns = unique_column_names(output.columns);
        let rows: Vec<Map<String, Value>> = output
            .rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect())
            .collect();
        let row_count = rows.len();

        ExecutionResult {
            success: true,
            sql,
            columns,
            rows,
            row_count,
            truncated: row_count as u64 >= row_cap,
            execution_time_ms: elapsed_ms(started),
            error: None,
            failure: None,
        }
    }

    fn failed(sql: String, e: ExecutionError, started: Instant) -> Self {
        ExecutionResult {
            success: false,
            sql,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
            execution_time_ms: elapsed_ms(started),
            failure: Some(e.kind()),
            error: Some(e.to_string()),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Row maps are keyed by column name, so repeated names (`SELECT a.id, b.id`)
/// get a numeric suffix instead of overwriting each other.
fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let mut n = 2;
            loop {
                let candidate = format!("{name}_{n}");
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

pub struct ExecutionGuard {
    transport: Arc<dyn DbTransport>,
    release_grace: Duration,
}

impl ExecutionGuard {
    pub fn new(transport: Arc<dyn DbTransport>) -> Self {
        ExecutionGuard {
            transport,
            release_grace: Duration::from_millis(RELEASE_GRACE_MILLIS),
        }
    }

    /// How long a timed-out worker gets to close its connection before it is
    /// aborted.
    pub fn with_release_grace(mut self, grace: Duration) -> Self {
        self.release_grace = grace;
        self
    }

    /// Executes `validated_sql`. The caller must have validated the statement;
    /// it is not checked again here.
    pub async fn execute(
        &self,
        params: &ConnectionParameters,
        validated_sql: &str,
        row_cap: u64,
        timeout_seconds: u64,
    ) -> ExecutionResult {
        let started = Instant::now();
        let sql = enforce_row_cap(validated_sql, row_cap);
        debug!("Executing with row cap {}: {}", row_cap, sql);

        match self.run(params, &sql, timeout_seconds).await {
            Ok(output) => {
                let result = ExecutionResult::succeeded(sql, output, row_cap, started);
                info!(
                    "Query returned {} rows in {}ms",
                    result.row_count, result.execution_time_ms
                );
                result
            }
            Err(e) => {
                match e.kind() {
                    FailureKind::Timeout => warn!("{}", e),
                    _ => error!("{}", e),
                }
                ExecutionResult::failed(sql, e, started)
            }
        }
    }

    async fn run(
        &self,
        params: &ConnectionParameters,
        sql: &str,
        timeout_seconds: u64,
    ) -> Result<QueryOutput, ExecutionError> {
        let mut conn = match tokio::time::timeout(
            Duration::from_secs(params.connect_timeout_seconds),
            self.transport.connect(params),
        )
        .await
        {
            Ok(conn) => conn?,
            Err(_) => {
                return Err(ExecutionError::Connectivity(format!(
                    "connection attempt timed out after {} seconds",
                    params.connect_timeout_seconds
                )))
            }
        };
        let interrupt = conn.interrupt_handle();

        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let statement = sql.to_string();
        let mut worker: JoinHandle<Option<Result<QueryOutput, ExecutionError>>> =
            tokio::spawn(async move {
                let outcome = tokio::select! {
                    _ = worker_cancel.cancelled() => None,
                    result = conn.fetch_all(&statement) => Some(result.map_err(ExecutionError::from)),
                };
                if let Err(e) = conn.close().await {
                    debug!("Error while closing connection: {}", e);
                }
                outcome
            });

        let finished = tokio::select! {
            joined = &mut worker => Some(joined),
            _ = tokio::time::sleep(Duration::from_secs(timeout_seconds)) => None,
        };

        match finished {
            Some(Ok(Some(result))) => result,
            Some(Ok(None)) => Err(ExecutionError::Internal("query was cancelled".to_string())),
            Some(Err(e)) => Err(ExecutionError::Internal(e.to_string())),
            None => {
                self.abandon(worker, interrupt, &cancel).await;
                Err(ExecutionError::Timeout {
                    seconds: timeout_seconds,
                })
            }
        }
    }

    /// Stops a worker that overran its deadline. Returns once the worker's
    /// connection has been dropped.
    async fn abandon(
        &self,
        mut worker: JoinHandle<Option<Result<QueryOutput, ExecutionError>>>,
        interrupt: Option<Box<dyn InterruptHandle>>,
        cancel: &CancellationToken,
    ) {
        if let Some(handle) = interrupt {
            match tokio::time::timeout(self.release_grace, handle.interrupt()).await {
                Ok(Ok(())) => debug!("Interrupted statement on the server"),
                Ok(Err(e)) => warn!("Failed to interrupt statement: {}", e),
                Err(_) => warn!("Interrupt request did not complete in time"),
            }
        }

        cancel.cancel();
        if tokio::time::timeout(self.release_grace, &mut worker)
            .await
            .is_err()
        {
            warn!(
                "Connection not released within {:?}, aborting worker",
                self.release_grace
            );
            worker.abort();
            // resolves once the aborted task, and the connection it owns, is dropped
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::errors::TransportError;
    use crate::infrastructure::db::transport::DbConnection;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Rows(usize),
        Slow,
        SlowAndStuckOnClose,
        Reject,
        Refuse,
        StallOnConnect,
    }

    struct FakeTransport {
        behavior: Behavior,
        live: Arc<AtomicUsize>,
        opened: Arc<AtomicUsize>,
        interrupted: Arc<AtomicUsize>,
        last_sql: Arc<std::sync::Mutex<Option<String>>>,
    }

    impl FakeTransport {
        fn new(behavior: Behavior) -> Self {
            FakeTransport {
                behavior,
                live: Arc::new(AtomicUsize::new(0)),
                opened: Arc::new(AtomicUsize::new(0)),
                interrupted: Arc::new(AtomicUsize::new(0)),
                last_sql: Arc::new(std::sync::Mutex::new(None)),
            }
        }
    }

    struct FakeConnection {
        behavior: Behavior,
        live: Arc<AtomicUsize>,
        interrupted: Arc<AtomicUsize>,
        last_sql: Arc<std::sync::Mutex<Option<String>>>,
    }

    impl Drop for FakeConnection {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct FakeInterrupt(Arc<AtomicUsize>);

    #[async_trait]
    impl InterruptHandle for FakeInterrupt {
        async fn interrupt(&self) -> Result<(), TransportError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl DbTransport for FakeTransport {
        async fn connect(
            &self,
            _params: &ConnectionParameters,
        ) -> Result<Box<dyn DbConnection>, TransportError> {
            match self.behavior {
                Behavior::Refuse => {
                    return Err(TransportError::Connect("Connection refused".to_string()))
                }
                Behavior::StallOnConnect => std::future::pending::<()>().await,
                _ => {}
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeConnection {
                behavior: self.behavior,
                live: self.live.clone(),
                interrupted: self.interrupted.clone(),
                last_sql: self.last_sql.clone(),
            }))
        }
    }

    #[async_trait]
    impl DbConnection for FakeConnection {
        async fn fetch_all(&mut self, sql: &str) -> Result<QueryOutput, TransportError> {
            *self.last_sql.lock().unwrap() = Some(sql.to_string());
            match self.behavior {
                Behavior::Rows(n) => Ok(QueryOutput {
                    columns: vec!["id".to_string(), "name".to_string()],
                    rows: (0..n).map(|i| vec![json!(i), json!(format!("row {i}"))]).collect(),
                }),
                Behavior::Slow | Behavior::SlowAndStuckOnClose => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(QueryOutput::default())
                }
                Behavior::Reject => Err(TransportError::Query(
                    "Table 'shop.customers' doesn't exist".to_string(),
                )),
                Behavior::Refuse | Behavior::StallOnConnect => unreachable!(),
            }
        }

        fn interrupt_handle(&self) -> Option<Box<dyn InterruptHandle>> {
            Some(Box::new(FakeInterrupt(self.interrupted.clone())))
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            if let Behavior::SlowAndStuckOnClose = self.behavior {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn guard(transport: &Arc<FakeTransport>) -> ExecutionGuard {
        ExecutionGuard::new(transport.clone()).with_release_grace(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_success_preserves_column_order() {
        let transport = Arc::new(FakeTransport::new(Behavior::Rows(3)));
        let result = guard(&transport)
            .execute(&ConnectionParameters::default(), "SELECT id, name FROM t;", 1000, 30)
            .await;

        assert!(result.success);
        assert_eq!(result.sql, "SELECT id, name FROM t LIMIT 1000");
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count, 3);
        assert!(!result.truncated);
        let keys: Vec<&String> = result.rows[0].keys().collect();
        assert_eq!(keys, vec!["id", "name"]);
        assert_eq!(result.rows[2]["name"], json!("row 2"));
        assert_eq!(transport.live.load(Ordering::SeqCst), 0);
        assert_eq!(
            transport.last_sql.lock().unwrap().as_deref(),
            Some("SELECT id, name FROM t LIMIT 1000")
        );
    }

    #[tokio::test]
    async fn test_truncated_when_cap_reached() {
        let transport = Arc::new(FakeTransport::new(Behavior::Rows(1000)));
        let result = guard(&transport)
            .execute(&ConnectionParameters::default(), "SELECT id, name FROM t", 1000, 30)
            .await;
        assert!(result.success);
        assert_eq!(result.row_count, 1000);
        assert!(result.truncated);

        let transport = Arc::new(FakeTransport::new(Behavior::Rows(500)));
        let result = guard(&transport)
            .execute(&ConnectionParameters::default(), "SELECT id, name FROM t", 1000, 30)
            .await;
        assert_eq!(result.row_count, 500);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_timeout_releases_connection() {
        let transport = Arc::new(FakeTransport::new(Behavior::Slow));
        let result = guard(&transport)
            .execute(&ConnectionParameters::default(), "SELECT SLEEP(30)", 1000, 1)
            .await;

        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("exceeded timeout of 1 seconds"));
        assert_eq!(result.failure, Some(FailureKind::Timeout));
        assert!(result.rows.is_empty());
        assert!(result.execution_time_ms >= 1000);
        assert_eq!(transport.opened.load(Ordering::SeqCst), 1);
        assert_eq!(transport.live.load(Ordering::SeqCst), 0);
        assert_eq!(transport.interrupted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_aborts_worker_stuck_on_close() {
        let transport = Arc::new(FakeTransport::new(Behavior::SlowAndStuckOnClose));
        let result = guard(&transport)
            .execute(&ConnectionParameters::default(), "SELECT SLEEP(30)", 1000, 1)
            .await;

        assert_eq!(
            result.error.as_deref(),
            Some("Query exceeded timeout of 1 seconds")
        );
        assert_eq!(transport.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_database_rejection() {
        let transport = Arc::new(FakeTransport::new(Behavior::Reject));
        let result = guard(&transport)
            .execute(&ConnectionParameters::default(), "SELECT * FROM customers", 10, 30)
            .await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::DatabaseRejection));
        assert_eq!(
            result.error.as_deref(),
            Some("Database error: Table 'shop.customers' doesn't exist")
        );
        assert_eq!(result.row_count, 0);
        assert_eq!(transport.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connectivity_failure() {
        let transport = Arc::new(FakeTransport::new(Behavior::Refuse));
        let result = guard(&transport)
            .execute(&ConnectionParameters::default(), "SELECT 1", 10, 30)
            .await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Connectivity));
        assert_eq!(
            result.error.as_deref(),
            Some("Database connection failed: Connection refused")
        );
        assert_eq!(result.sql, "SELECT 1 LIMIT 10");
    }

    #[tokio::test]
    async fn test_stalled_connect_is_bounded() {
        let transport = Arc::new(FakeTransport::new(Behavior::StallOnConnect));
        let params = ConnectionParameters {
            connect_timeout_seconds: 1,
            ..ConnectionParameters::default()
        };
        let started = Instant::now();
        let result = guard(&transport)
            .execute(&params, "SELECT 1", 10, 30)
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::Connectivity));
        assert_eq!(
            result.error.as_deref(),
            Some("Database connection failed: connection attempt timed out after 1 seconds")
        );
        assert_eq!(transport.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_column_names_are_suffixed() {
        let names = unique_column_names(vec![
            "id".to_string(),
            "id".to_string(),
            "id_2".to_string(),
            "name".to_string(),
        ]);
        assert_eq!(names, vec!["id", "id_2", "id_2_2", "name"]);
    }
}
