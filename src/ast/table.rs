//! [`DataTable`]: the three interpreted shapes (horizontal, vertical,
//! matrix) over a raw Gherkin table (spec.md §3).

use std::collections::HashMap;

use crate::ast::tag::{DataTableAnnotation, TableHeader};
use crate::error::GwenError;

/// A raw table as parsed from a step: rows of cells, each row carrying its
/// source line for reporting.
#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct RawTable {
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TableRow {
    pub line: u32,
    pub cells: Vec<String>,
}

impl RawTable {
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| TableRow { line: i as u32, cells })
                .collect(),
        }
    }
}

/// One interpreted record: a map from column/row name to cell value,
/// preserving declaration order.
pub type Record = linked_hash_map::LinkedHashMap<String, String>;

/// An interpreted [`RawTable`] under one of the three shapes described in
/// spec.md §3.
#[derive(Clone, Debug, PartialEq)]
pub enum DataTable {
    /// Header on top: first row is column names, each following row is a
    /// record.
    Horizontal { names: Vec<String>, records: Vec<Record> },
    /// Header on left: the transpose of a horizontal table.
    Vertical { names: Vec<String>, records: Vec<Record> },
    /// First row and first column both act as headers; the corner cell is
    /// the "vertex" name.
    Matrix {
        vertex: String,
        tops: Vec<String>,
        lefts: Vec<String>,
        cells: HashMap<(String, String), String>,
    },
}

impl DataTable {
    /// Interprets a raw table per an (optional) `@DataTable` annotation.
    /// With no annotation, a table needs >= 2 rows and is read horizontally
    /// with the first row as the header.
    pub fn interpret(
        raw: &RawTable,
        annotation: Option<&DataTableAnnotation>,
    ) -> Result<Self, GwenError> {
        let rows: Vec<&[String]> =
            raw.rows.iter().map(|r| r.cells.as_slice()).collect();

        if let Some(ann) = annotation {
            if ann.matrix {
                return Self::interpret_matrix(&rows);
            }
            let vertical = ann.vertical_names.is_some()
                || ann.header == Some(TableHeader::Left);
            let names = ann.names();
            return if vertical {
                Self::interpret_vertical(&rows, names)
            } else {
                Self::interpret_horizontal(&rows, names)
            };
        }

        if rows.len() < 2 {
            return Err(GwenError::DataTable {
                reason: "a table without external names must have at least 2 rows".into(),
            });
        }
        Self::interpret_horizontal(&rows, None)
    }

    fn interpret_horizontal(
        rows: &[&[String]],
        names: Option<&[String]>,
    ) -> Result<Self, GwenError> {
        let (names, body): (Vec<String>, &[&[String]]) = match names {
            Some(n) => (n.to_vec(), rows),
            None => {
                let header = rows.first().ok_or_else(|| GwenError::DataTable {
                    reason: "table has no header row".into(),
                })?;
                (header.to_vec(), &rows[1..])
            }
        };
        let records = Self::rows_to_records(&names, body)?;
        Ok(Self::Horizontal { names, records })
    }

    fn interpret_vertical(
        rows: &[&[String]],
        names: Option<&[String]>,
    ) -> Result<Self, GwenError> {
        let transposed = transpose(rows);
        let row_refs: Vec<&[String]> = transposed.iter().map(Vec::as_slice).collect();
        let (names, body): (Vec<String>, &[&[String]]) = match names {
            Some(n) => (n.to_vec(), &row_refs),
            None => {
                let header = row_refs.first().ok_or_else(|| GwenError::DataTable {
                    reason: "table has no header column".into(),
                })?;
                (header.to_vec(), &row_refs[1..])
            }
        };
        let records = Self::rows_to_records(&names, body)?;
        Ok(Self::Vertical { names, records })
    }

    fn interpret_matrix(rows: &[&[String]]) -> Result<Self, GwenError> {
        if rows.len() < 2 || rows[0].len() < 2 {
            return Err(GwenError::DataTable {
                reason: "matrix table needs at least 2 rows and 2 columns".into(),
            });
        }
        let vertex = rows[0][0].clone();
        let tops: Vec<String> = rows[0][1..].to_vec();
        let mut lefts = Vec::new();
        let mut cells = HashMap::new();
        for row in &rows[1..] {
            let left = row[0].clone();
            for (top, cell) in tops.iter().zip(row[1..].iter()) {
                cells.insert((top.clone(), left.clone()), cell.clone());
            }
            lefts.push(left);
        }
        Ok(Self::Matrix { vertex, tops, lefts, cells })
    }

    fn rows_to_records(
        names: &[String],
        body: &[&[String]],
    ) -> Result<Vec<Record>, GwenError> {
        if let Some(first) = body.first() {
            if first.len() != names.len() {
                return Err(GwenError::DataTable {
                    reason: format!(
                        "row has {} cells but header names {} columns",
                        first.len(),
                        names.len()
                    ),
                });
            }
        }
        Ok(body
            .iter()
            .map(|row| {
                let mut record = Record::new();
                for (name, value) in names.iter().zip(row.iter()) {
                    record.insert(name.clone(), value.clone());
                }
                record
            })
            .collect())
    }

    /// Matrix lookup by `(top, left)`.
    #[must_use]
    pub fn matrix_cell(&self, top: &str, left: &str) -> Option<&str> {
        match self {
            Self::Matrix { cells, .. } => {
                cells.get(&(top.to_string(), left.to_string())).map(String::as_str)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        match self {
            Self::Horizontal { records, .. } | Self::Vertical { records, .. } => {
                records.clone()
            }
            Self::Matrix { tops, lefts, cells, vertex } => lefts
                .iter()
                .map(|left| {
                    let mut record = Record::new();
                    record.insert(vertex.clone(), left.clone());
                    for top in tops {
                        if let Some(v) = cells.get(&(top.clone(), left.clone())) {
                            record.insert(top.clone(), v.clone());
                        }
                    }
                    record
                })
                .collect(),
        }
    }
}

fn transpose(rows: &[&[String]]) -> Vec<Vec<String>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let ncols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    (0..ncols)
        .map(|col| rows.iter().map(|row| row.get(col).cloned().unwrap_or_default()).collect())
        .collect()
}
