//! # Database Connection Config
//!
//! Parameters are forwarded to the transport untouched. The password never
//! appears in `Debug` output or display strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utilities::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_DB_HOST, DEFAULT_DB_PORT,
};

fn default_host() -> String {
    DEFAULT_DB_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_DB_PORT
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECONDS
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Bound on establishing the connection, separate from the query deadline.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl ConnectionParameters {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        ConnectionParameters {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }

    /// `user@host:port/database`, without the password.
    pub fn display_connection(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        ConnectionParameters {
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("database", &self.database)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let params = ConnectionParameters::new("db", 3306, "app", "hunter2", "classicmodels");
        let debug = format!("{params:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("classicmodels"));
    }

    #[test]
    fn test_display_connection_omits_password() {
        let params = ConnectionParameters::new("db", 3307, "app", "hunter2", "shop");
        assert_eq!(params.display_connection(), "app@db:3307/shop");
    }

    #[test]
    fn test_serde_defaults() {
        let params: ConnectionParameters =
            serde_json::from_str(r#"{"user": "u", "database": "d"}"#).unwrap();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, 3306);
        assert_eq!(params.connect_timeout_seconds, 5);
    }
}
