//! Seams between the execution guard and a concrete database driver.
//!
//! A transport opens connections; a connection runs exactly one statement at a
//! time and can hand out an [`InterruptHandle`] that cancels its in-flight
//! statement from a different task.

use async_trait::async_trait;
use serde_json::Value;

use super::config::ConnectionParameters;
use super::errors::TransportError;
use crate::framework::core::schema::{SchemaDescriptor, SchemaError};

/// Column names and row values in the order reported by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[async_trait]
pub trait DbTransport: Send + Sync {
    /// Opens a connection dedicated to the caller.
    async fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> Result<Box<dyn DbConnection>, TransportError>;

    /// Opens a connection, runs a trivial statement and closes it again.
    async fn ping(&self, params: &ConnectionParameters) -> Result<(), TransportError> {
        let mut conn = self.connect(params).await?;
        let outcome = conn.fetch_all("SELECT 1").await.map(|_| ());
        let closed = conn.close().await;
        outcome.and(closed)
    }
}

#[async_trait]
pub trait DbConnection: Send {
    /// Runs `sql` and materializes every returned row.
    async fn fetch_all(&mut self, sql: &str) -> Result<QueryOutput, TransportError>;

    /// A handle able to cancel the statement this connection is running.
    fn interrupt_handle(&self) -> Option<Box<dyn InterruptHandle>>;

    /// Gracefully ends the session. Dropping a connection must also release it.
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait InterruptHandle: Send + Sync {
    async fn interrupt(&self) -> Result<(), TransportError>;
}

/// Produces a [`SchemaDescriptor`] from a live database.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn fetch_schema(&self, params: &ConnectionParameters)
        -> Result<SchemaDescriptor, SchemaError>;
}
