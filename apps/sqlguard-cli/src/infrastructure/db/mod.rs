//! # Database
//!
//! Connection parameters, the transport seam, the MySQL implementation and
//! the [`guard::ExecutionGuard`] that runs validated statements under a row
//! cap and a deadline.

pub mod config;
pub mod errors;
pub mod guard;
pub mod limit;
pub mod mysql;
pub mod transport;

pub use config::ConnectionParameters;
pub use errors::{ExecutionError, FailureKind, TransportError};
pub use guard::{ExecutionGuard, ExecutionResult};
pub use limit::enforce_row_cap;
pub use mysql::{MySqlSchemaProvider, MySqlTransport};
pub use transport::{DbConnection, DbTransport, InterruptHandle, QueryOutput, SchemaProvider};
