//! # Result Shaper
//!
//! Pure transforms over the rows of an execution result: terminal tables,
//! CSV, JSON and chart-ready series. Rows are never modified.

pub mod chart;
pub mod export;

pub use chart::{shape_chart, ChartData, ChartType};
pub use export::{to_csv, to_json, to_table};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShapeError {
    #[error("Failed to write CSV")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize JSON")]
    Json(#[from] serde_json::Error),

    #[error("Unknown chart type '{0}' (expected bar, line, area or pie)")]
    UnknownChartType(String),

    #[error("Pie charts need at least two columns, got {0}")]
    PieRequiresTwoColumns(usize),

    #[error("Value {value} in column '{column}' of row {row} is not numeric")]
    NonNumericValue {
        row: usize,
        column: String,
        value: String,
    },
}

/// Plain text form of a cell: strings unquoted, NULL empty, everything else
/// as JSON text.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Finite floating-point view of a cell, if it has one.
pub(crate) fn cell_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
