use std::path::PathBuf;

use crate::cli::display::Message;
use crate::cli::routines::{load_schema, RoutineFailure, RoutineSuccess};
use crate::infrastructure::db::ConnectionParameters;

/// Introspects the database and prints or saves its schema descriptor.
pub async fn schema(
    output: Option<PathBuf>,
    prompt: bool,
    params: &ConnectionParameters,
) -> Result<RoutineSuccess, RoutineFailure> {
    let descriptor = load_schema("Schema", None, params).await?;

    let text = if prompt {
        descriptor.render_for_prompt()
    } else {
        descriptor.to_json().map_err(|e| {
            RoutineFailure::new(
                Message::new("Schema".to_string(), "Failed to serialize schema".to_string()),
                e,
            )
        })?
    };

    match output {
        Some(path) => {
            std::fs::write(&path, text).map_err(|e| {
                RoutineFailure::new(
                    Message::new(
                        "Schema".to_string(),
                        format!("Failed to write {}", path.display()),
                    ),
                    e,
                )
            })?;
            Ok(RoutineSuccess::success(Message::new(
                "Schema".to_string(),
                format!("{} tables written to {}", descriptor.len(), path.display()),
            )))
        }
        None => {
            println!("{text}");
            Ok(RoutineSuccess::silent())
        }
    }
}
