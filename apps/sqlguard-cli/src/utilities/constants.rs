pub const APP_DIR_NAME: &str = ".sqlguard";
pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "SQLGUARD";

pub const DEFAULT_MAX_QUERY_ROWS: u64 = 1000;
pub const DEFAULT_QUERY_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_JOINS: usize = 3;
pub const DEFAULT_MAX_SUBQUERY_DEPTH: usize = 3;
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;

/// How long a timed-out execution waits for its connection to be released
/// before the worker task is aborted.
pub const RELEASE_GRACE_MILLIS: u64 = 2000;
