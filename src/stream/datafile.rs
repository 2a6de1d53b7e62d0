//! Data file loading (spec.md §6): CSV with a header row, or a JSON array
//! of flat objects. Values are always strings.

use std::path::Path;

use crate::ast::table::Record;
use crate::error::{GwenError, Result};

/// Loads `path` as either CSV or JSON, dispatching on its extension.
pub fn load(path: &Path) -> Result<Vec<Record>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => load_csv(path),
        Some("json") => load_json(path),
        other => Err(GwenError::DataTable {
            reason: format!("unsupported data file extension: {other:?}"),
        }),
    }
}

fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)?;
    parse_csv(&content)
}

/// A minimal comma-splitting CSV reader: no quoting, no embedded commas.
/// The §6 data file format is a plain header row plus flat string cells, so
/// a hand-rolled split is sufficient (see DESIGN.md for why no CSV crate is
/// pulled in).
fn parse_csv(content: &str) -> Result<Vec<Record>> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(h) => split_row(h),
        None => return Ok(Vec::new()),
    };
    lines
        .map(|line| {
            let cells = split_row(line);
            if cells.len() != header.len() {
                return Err(GwenError::DataTable {
                    reason: format!(
                        "row has {} cells but header names {} columns",
                        cells.len(),
                        header.len()
                    ),
                });
            }
            let mut record = Record::new();
            for (name, value) in header.iter().zip(cells.into_iter()) {
                record.insert(name.clone(), value);
            }
            Ok(record)
        })
        .collect()
}

fn split_row(line: &str) -> Vec<String> {
    line.split(',').map(|c| c.trim().to_string()).collect()
}

fn load_json(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| GwenError::DataTable {
        reason: format!("invalid JSON data file: {e}"),
    })?;
    let array = value.as_array().ok_or_else(|| GwenError::DataTable {
        reason: "JSON data file must be an array of flat objects".into(),
    })?;
    array
        .iter()
        .map(|entry| {
            let obj = entry.as_object().ok_or_else(|| GwenError::DataTable {
                reason: "JSON data file entries must be flat objects".into(),
            })?;
            let mut record = Record::new();
            for (k, v) in obj {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                record.insert(k.clone(), value);
            }
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_with_header() {
        let records = parse_csv("name,age\nAlice,30\nBob,40\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "Alice");
        assert_eq!(records[1]["age"], "40");
    }

    #[test]
    fn csv_mismatched_column_count_errors() {
        let err = parse_csv("a,b\n1\n").unwrap_err();
        assert!(matches!(err, GwenError::DataTable { .. }));
    }

    #[test]
    fn empty_csv_yields_no_records() {
        assert_eq!(parse_csv("").unwrap().len(), 0);
    }

    #[test]
    fn loads_json_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"[{"name":"Alice","age":"30"},{"name":"Bob","age":"40"}]"#).unwrap();
        let records = load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "Alice");
    }

    #[test]
    fn unsupported_extension_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(load(&path).is_err());
    }
}
