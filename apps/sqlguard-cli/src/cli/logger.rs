//! # Logger Module
//!
//! Logging for the CLI, built on `tracing-subscriber` layers:
//! - **EnvFilter Layer**: `RUST_LOG` support for module-level filtering
//! - **Format Layer**: either the legacy line format or tracing's native format
//!
//! ## Formats
//!
//! - **Legacy Format** (default)
//!   - Text: `[timestamp LEVEL - target] message`
//!   - JSON: `{"timestamp": "...", "severity": "INFO", "target": "...", "message": "..."}`
//! - **Tracing Format** (opt-in via `SQLGUARD_LOGGER__USE_TRACING_FORMAT=true`)
//!
//! Logs go to stderr unless `logger.stdout` is set, so command output on stdout
//! can be piped (for example `sqlguard execute --format csv > out.csv`).
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: e.g. `RUST_LOG=sqlguard_cli::infrastructure=debug`
//! - `SQLGUARD_LOGGER__LEVEL`: DEBUG, INFO, WARN or ERROR
//! - `SQLGUARD_LOGGER__FORMAT`: Text or JSON
//! - `SQLGUARD_LOGGER__STDOUT`: write logs to stdout instead of stderr

use serde::Deserialize;
use std::env;
use std::fmt;
use std::io::Write;
use std::time::SystemTime;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum LoggerLevel {
    #[serde(alias = "DEBUG", alias = "debug")]
    Debug,
    #[serde(alias = "INFO", alias = "info")]
    Info,
    #[serde(alias = "WARN", alias = "warn")]
    Warn,
    #[serde(alias = "ERROR", alias = "error")]
    Error,
}

impl LoggerLevel {
    pub fn to_tracing_level(&self) -> LevelFilter {
        match self {
            LoggerLevel::Debug => LevelFilter::DEBUG,
            LoggerLevel::Info => LevelFilter::INFO,
            LoggerLevel::Warn => LevelFilter::WARN,
            LoggerLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum LogFormat {
    #[serde(alias = "JSON", alias = "json")]
    Json,
    #[serde(alias = "TEXT", alias = "text")]
    Text,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoggerSettings {
    #[serde(default = "default_log_level")]
    pub level: LoggerLevel,

    #[serde(default = "default_log_stdout")]
    pub stdout: bool,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    #[serde(default = "default_use_tracing_format")]
    pub use_tracing_format: bool,
}

fn default_log_level() -> LoggerLevel {
    LoggerLevel::Warn
}

fn default_log_stdout() -> bool {
    false
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_use_tracing_format() -> bool {
    env::var("SQLGUARD_LOGGER__USE_TRACING_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}

impl Default for LoggerSettings {
    fn default() -> Self {
        LoggerSettings {
            level: default_log_level(),
            stdout: default_log_stdout(),
            format: default_log_format(),
            use_tracing_format: default_use_tracing_format(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("Failed to install the global subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Layer that writes one line per event in the legacy text or JSON shape.
struct LegacyFormatLayer<W> {
    writer: W,
    format: LogFormat,
}

impl<W> LegacyFormatLayer<W> {
    fn new(writer: W, format: LogFormat) -> Self {
        Self { writer, format }
    }

    fn format_line(&self, level: &Level, target: &str, message: &str) -> String {
        match self.format {
            LogFormat::Text => format_text(level, target, message),
            LogFormat::Json => format_json(level, target, message),
        }
    }
}

fn format_text(level: &Level, target: &str, message: &str) -> String {
    format!(
        "[{} {} - {}] {}",
        humantime::format_rfc3339_seconds(SystemTime::now()),
        level,
        target,
        message
    )
}

fn format_json(level: &Level, target: &str, message: &str) -> String {
    let log_json = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "severity": level.to_string(),
        "target": target,
        "message": message,
    });
    log_json.to_string()
}

impl<S, W> Layer<S> for LegacyFormatLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let output = self.format_line(metadata.level(), metadata.target(), &visitor.message);

        let mut writer = self.writer.make_writer();
        let _ = writer.write_all(output.as_bytes());
        let _ = writer.write_all(b"\n");
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
            // Remove surrounding quotes from debug format
            if self.message.len() >= 2 && self.message.starts_with('"') && self.message.ends_with('"')
            {
                self.message = self.message[1..self.message.len() - 1].to_string();
            }
        }
    }
}

pub fn setup_logging(settings: &LoggerSettings) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_tracing_level().to_string()));

    if settings.use_tracing_format {
        setup_tracing_format(settings, env_filter)
    } else {
        setup_legacy_format(settings, env_filter)
    }
}

fn setup_tracing_format(settings: &LoggerSettings, env_filter: EnvFilter) -> Result<(), LoggerError> {
    let registry = tracing_subscriber::registry().with(env_filter);

    match (settings.stdout, &settings.format) {
        (true, LogFormat::Json) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout).json())
            .try_init()?,
        (true, LogFormat::Text) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout).compact())
            .try_init()?,
        (false, LogFormat::Json) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).json())
            .try_init()?,
        (false, LogFormat::Text) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).compact())
            .try_init()?,
    }

    Ok(())
}

fn setup_legacy_format(settings: &LoggerSettings, env_filter: EnvFilter) -> Result<(), LoggerError> {
    let registry = tracing_subscriber::registry().with(env_filter);

    if settings.stdout {
        registry
            .with(LegacyFormatLayer::new(std::io::stdout, settings.format.clone()))
            .try_init()?;
    } else {
        registry
            .with(LegacyFormatLayer::new(std::io::stderr, settings.format.clone()))
            .try_init()?;
    }

    Ok(())
}
