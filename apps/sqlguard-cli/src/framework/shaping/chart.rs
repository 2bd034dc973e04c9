//! Chart-ready series built from result rows.
//!
//! The first column of the first row is the category axis. Pie charts read
//! their value from the second column; the other chart types plot every
//! remaining column.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::{cell_number, cell_text, ShapeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Area,
    Pie,
}

impl FromStr for ChartType {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "area" => Ok(ChartType::Area),
            "pie" => Ok(ChartType::Pie),
            _ => Err(ShapeError::UnknownChartType(s.to_string())),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Area => "area",
            ChartType::Pie => "pie",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub data: Vec<Map<String, Value>>,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_keys: Option<Vec<String>>,
}

impl ChartData {
    fn empty(chart_type: ChartType) -> Self {
        ChartData {
            data: Vec::new(),
            chart_type,
            x_key: None,
            y_keys: None,
        }
    }
}

pub fn shape_chart(
    rows: &[Map<String, Value>],
    chart_type: ChartType,
) -> Result<ChartData, ShapeError> {
    let Some(first) = rows.first() else {
        return Ok(ChartData::empty(chart_type));
    };
    let columns: Vec<&String> = first.keys().collect();

    match chart_type {
        ChartType::Pie => pie(rows, &columns),
        _ => series(rows, &columns, chart_type),
    }
}

fn pie(rows: &[Map<String, Value>], columns: &[&String]) -> Result<ChartData, ShapeError> {
    let [label, value_column, ..] = columns else {
        return Err(ShapeError::PieRequiresTwoColumns(columns.len()));
    };

    let mut data = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.iter().enumerate() {
        let raw = row.get(value_column.as_str()).unwrap_or(&Value::Null);
        let value = cell_number(raw).ok_or_else(|| ShapeError::NonNumericValue {
            row: row_index,
            column: value_column.to_string(),
            value: raw.to_string(),
        })?;

        let mut point = Map::new();
        point.insert(
            "name".to_string(),
            Value::String(row.get(label.as_str()).map(cell_text).unwrap_or_default()),
        );
        point.insert("value".to_string(), Value::from(value));
        data.push(point);
    }

    Ok(ChartData {
        data,
        chart_type: ChartType::Pie,
        x_key: None,
        y_keys: None,
    })
}

fn series(
    rows: &[Map<String, Value>],
    columns: &[&String],
    chart_type: ChartType,
) -> Result<ChartData, ShapeError> {
    let Some((x_key, y_keys)) = columns.split_first() else {
        return Ok(ChartData::empty(chart_type));
    };

    let data = rows
        .iter()
        .map(|row| {
            let mut point = Map::new();
            point.insert(
                x_key.to_string(),
                Value::String(row.get(x_key.as_str()).map(cell_text).unwrap_or_default()),
            );
            for key in y_keys {
                let raw = row.get(key.as_str()).unwrap_or(&Value::Null);
                let value = match cell_number(raw) {
                    Some(n) => Value::from(n),
                    None => Value::String(cell_text(raw)),
                };
                point.insert(key.to_string(), value);
            }
            point
        })
        .collect();

    Ok(ChartData {
        data,
        chart_type,
        x_key: Some(x_key.to_string()),
        y_keys: Some(y_keys.iter().map(|k| k.to_string()).collect()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Map<String, Value>> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_parse_chart_type() {
        assert_eq!("bar".parse::<ChartType>().unwrap(), ChartType::Bar);
        assert_eq!("PIE".parse::<ChartType>().unwrap(), ChartType::Pie);
        assert!(matches!(
            "radar".parse::<ChartType>(),
            Err(ShapeError::UnknownChartType(t)) if t == "radar"
        ));
    }

    #[test]
    fn test_empty_rows_are_tagged_with_type() {
        let chart = shape_chart(&[], ChartType::Line).unwrap();
        assert!(chart.data.is_empty());
        assert_eq!(
            serde_json::to_value(&chart).unwrap(),
            json!({"data": [], "type": "line"})
        );
    }

    #[test]
    fn test_pie_uses_first_two_columns() {
        let data = rows(json!([
            {"country": "USA", "total": "12.5", "extra": 1},
            {"country": 7, "total": 3},
        ]));
        let chart = shape_chart(&data, ChartType::Pie).unwrap();
        assert_eq!(
            serde_json::to_value(&chart).unwrap(),
            json!({
                "data": [
                    {"name": "USA", "value": 12.5},
                    {"name": "7", "value": 3.0},
                ],
                "type": "pie",
            })
        );
    }

    #[test]
    fn test_pie_rejects_single_column() {
        let data = rows(json!([{"country": "USA"}]));
        assert!(matches!(
            shape_chart(&data, ChartType::Pie),
            Err(ShapeError::PieRequiresTwoColumns(1))
        ));
    }

    #[test]
    fn test_pie_rejects_non_numeric_value() {
        let data = rows(json!([
            {"country": "USA", "total": 3},
            {"country": "France", "total": "many"},
        ]));
        match shape_chart(&data, ChartType::Pie) {
            Err(ShapeError::NonNumericValue { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "total");
                assert_eq!(value, "\"many\"");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bar_coerces_numbers_and_keeps_strings() {
        let data = rows(json!([
            {"month": 1, "revenue": "100.5", "note": "ok"},
            {"month": 2, "revenue": 80, "note": null},
        ]));
        let chart = shape_chart(&data, ChartType::Bar).unwrap();
        assert_eq!(chart.x_key.as_deref(), Some("month"));
        assert_eq!(
            chart.y_keys,
            Some(vec!["revenue".to_string(), "note".to_string()])
        );
        assert_eq!(
            serde_json::to_value(&chart.data).unwrap(),
            json!([
                {"month": "1", "revenue": 100.5, "note": "ok"},
                {"month": "2", "revenue": 80.0, "note": ""},
            ])
        );
    }

    #[test]
    fn test_shaping_does_not_touch_rows() {
        let data = rows(json!([{"a": "x", "b": "2"}]));
        let before = data.clone();
        shape_chart(&data, ChartType::Area).unwrap();
        assert_eq!(data, before);
    }
}
