//! Tabular exports of result rows.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde_json::{Map, Value};

use super::{cell_text, ShapeError};

/// Renders rows as a terminal table with `columns` as the header.
pub fn to_table(columns: &[String], rows: &[Map<String, Value>]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(columns);

    for row in rows {
        table.add_row(columns.iter().map(|column| {
            row.get(column).map(cell_text).unwrap_or_default()
        }));
    }

    table.to_string()
}

/// CSV with a header line; cells use their plain text form.
pub fn to_csv(columns: &[String], rows: &[Map<String, Value>]) -> Result<String, ShapeError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|column| row.get(column).map(cell_text).unwrap_or_default()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ShapeError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pretty-printed JSON array of row objects.
pub fn to_json(rows: &[Map<String, Value>]) -> Result<String, ShapeError> {
    Ok(serde_json::to_string_pretty(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (Vec<String>, Vec<Map<String, Value>>) {
        let columns = vec!["country".to_string(), "customers".to_string()];
        let rows = vec![
            json!({"country": "USA", "customers": 36}),
            json!({"country": "Spain, Madrid", "customers": null}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
        (columns, rows)
    }

    #[test]
    fn test_csv_quotes_and_nulls() {
        let (columns, rows) = sample();
        let csv = to_csv(&columns, &rows).unwrap();
        assert_eq!(csv, "country,customers\nUSA,36\n\"Spain, Madrid\",\n");
    }

    #[test]
    fn test_json_keeps_column_order() {
        let (_, rows) = sample();
        let json = to_json(&rows).unwrap();
        let country = json.find("\"country\"").unwrap();
        let customers = json.find("\"customers\"").unwrap();
        assert!(country < customers);
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["customers"], json!(36));
    }

    #[test]
    fn test_table_contains_header_and_cells() {
        let (columns, rows) = sample();
        let table = to_table(&columns, &rows);
        assert!(table.contains("country"));
        assert!(table.contains("Spain, Madrid"));
        assert!(table.contains("36"));
    }

    #[test]
    fn test_empty_rows_export_header_only() {
        let columns = vec!["a".to_string()];
        assert_eq!(to_csv(&columns, &[]).unwrap(), "a\n");
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }
}
