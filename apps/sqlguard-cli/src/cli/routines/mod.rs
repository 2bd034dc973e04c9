//! # Routines
//!
//! Each CLI command is a function returning `Result<RoutineSuccess, RoutineFailure>`.
//! The caller displays the message of either outcome; a failure also sets a
//! non-zero exit code.

use std::io::Read;
use std::path::{Path, PathBuf};

use super::display::{self, Message, MessageType};
use crate::framework::core::schema::SchemaDescriptor;
use crate::infrastructure::db::{ConnectionParameters, MySqlSchemaProvider, SchemaProvider};

pub mod estimate;
pub mod execute;
pub mod schema;
pub mod validate;

#[derive(Debug, Clone)]
#[must_use = "The message should be displayed."]
pub struct RoutineSuccess {
    pub message: Message,
    pub message_type: MessageType,
}

impl From<RoutineFailure> for anyhow::Error {
    fn from(failure: RoutineFailure) -> Self {
        if let Some(err) = failure.error {
            err
        } else {
            anyhow::anyhow!("{}: {}", failure.message.action, failure.message.details)
        }
    }
}

impl RoutineSuccess {
    pub fn success(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Success,
        }
    }

    /// A verdict the user should not miss.
    pub fn highlight(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Highlight,
        }
    }

    pub fn info(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Info,
        }
    }

    /// A success whose output was already written to stdout.
    pub fn silent() -> Self {
        Self::info(Message::new(String::new(), String::new()))
    }

    pub fn show(&self) {
        if !self.message.is_empty() {
            display::show_message_wrapper(self.message_type, self.message.clone());
        }
    }
}

#[derive(Debug)]
pub struct RoutineFailure {
    pub message: Message,
    pub message_type: MessageType,
    pub error: Option<anyhow::Error>,
}

impl RoutineFailure {
    pub fn new<F: Into<anyhow::Error>>(message: Message, error: F) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: Some(error.into()),
        }
    }

    /// create a RoutineFailure error without an error
    pub fn error(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: None,
        }
    }

    /// Shows the message, then the underlying error chain if there is one.
    pub fn show(&self) {
        display::show_message_wrapper(self.message_type, self.message.clone());
        if let Some(err) = &self.error {
            eprintln!("{err:?}");
        }
    }
}

/// Reads SQL from the argument, a file, or stdin, in that order.
pub fn get_sql_input(
    action: &str,
    sql: Option<String>,
    file: Option<PathBuf>,
) -> Result<String, RoutineFailure> {
    if let Some(query_str) = sql {
        Ok(query_str)
    } else if let Some(file_path) = file {
        std::fs::read_to_string(&file_path).map_err(|e| {
            RoutineFailure::new(
                Message::new(
                    action.to_string(),
                    format!("Failed to read file: {}", file_path.display()),
                ),
                e,
            )
        })
    } else {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer).map_err(|e| {
            RoutineFailure::new(
                Message::new(action.to_string(), "Failed to read from stdin".to_string()),
                e,
            )
        })?;

        if buffer.trim().is_empty() {
            return Err(RoutineFailure::error(Message::new(
                action.to_string(),
                "No SQL query provided (use argument, --file, or stdin)".to_string(),
            )));
        }

        Ok(buffer)
    }
}

/// Loads the schema descriptor from `path`, or introspects the database when
/// no file is given.
pub async fn load_schema(
    action: &str,
    path: Option<&Path>,
    params: &ConnectionParameters,
) -> Result<SchemaDescriptor, RoutineFailure> {
    match path {
        Some(path) => SchemaDescriptor::from_path(path).map_err(|e| {
            RoutineFailure::new(
                Message::new(
                    action.to_string(),
                    format!("Failed to load schema from {}", path.display()),
                ),
                e,
            )
        }),
        None => MySqlSchemaProvider
            .fetch_schema(params)
            .await
            .map_err(|e| {
                RoutineFailure::new(
                    Message::new(
                        action.to_string(),
                        format!("Failed to read schema from {}", params.display_connection()),
                    ),
                    e,
                )
            }),
    }
}
