//! The comparison table: a 2-D grid of multi-valued cells.
//!
//! Rows are properties, columns are the contributions being compared.
//! A table is immutable once fetched and is owned by the single reasoning
//! session that consumes it.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::error::AgentError;

/// A single scalar value inside a cell.
///
/// Dates stay as their original text so the reasoning backend can parse
/// year/month components itself; they are tagged separately only so the
/// grid renderer and document flattener can keep them as strings.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Numeric value.
    Number(f64),
    /// Date-shaped text (`YYYY-MM-DD` or `YYYY-MM`).
    Date(String),
    /// Any other text.
    Text(String),
}

impl CellValue {
    /// Classifies a raw label from the dataset source.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            return Self::Number(n);
        }
        if is_date_shaped(trimmed) {
            return Self::Date(trimmed.to_string());
        }
        Self::Text(trimmed.to_string())
    }

    /// Renders the value as a JSON value for the document view.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => json!(n),
            Self::Date(s) | Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(s) | Self::Text(s) => f.write_str(s),
        }
    }
}

/// Returns `true` for `YYYY-MM-DD` and `YYYY-MM` shaped strings.
fn is_date_shaped(s: &str) -> bool {
    let bytes = s.as_bytes();
    let digits_at = |range: std::ops::Range<usize>| {
        bytes[range].iter().all(u8::is_ascii_digit)
    };
    match bytes.len() {
        10 => digits_at(0..4) && bytes[4] == b'-' && digits_at(5..7) && bytes[7] == b'-' && digits_at(8..10),
        7 => digits_at(0..4) && bytes[4] == b'-' && digits_at(5..7),
        _ => false,
    }
}

/// Row/column dimensions of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableShape {
    /// Number of properties (rows).
    pub rows: usize,
    /// Number of contributions (columns).
    pub cols: usize,
}

/// A comparison: rows = properties, columns = contributions, each cell
/// holding zero or more values.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    properties: Vec<String>,
    contributions: Vec<String>,
    /// `cells[row][col]`, dimensions `properties.len() × contributions.len()`.
    cells: Vec<Vec<Vec<CellValue>>>,
}

impl ComparisonTable {
    /// Builds a table, validating that the cell grid matches the labels.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DatasetUnavailable`] when the grid dimensions
    /// do not match the row/column labels.
    pub fn new(
        properties: Vec<String>,
        contributions: Vec<String>,
        cells: Vec<Vec<Vec<CellValue>>>,
    ) -> Result<Self, AgentError> {
        if cells.len() != properties.len() {
            return Err(AgentError::DatasetUnavailable {
                reason: format!(
                    "malformed comparison: {} rows of cells for {} properties",
                    cells.len(),
                    properties.len()
                ),
            });
        }
        if let Some(row) = cells.iter().find(|r| r.len() != contributions.len()) {
            return Err(AgentError::DatasetUnavailable {
                reason: format!(
                    "malformed comparison: row with {} cells for {} contributions",
                    row.len(),
                    contributions.len()
                ),
            });
        }
        Ok(Self {
            properties,
            contributions,
            cells,
        })
    }

    /// Property (row) labels.
    #[must_use]
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Contribution (column) labels.
    #[must_use]
    pub fn contributions(&self) -> &[String] {
        &self.contributions
    }

    /// Table dimensions.
    #[must_use]
    pub fn shape(&self) -> TableShape {
        TableShape {
            rows: self.properties.len(),
            cols: self.contributions.len(),
        }
    }

    /// `true` when the table has no rows or no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() || self.contributions.is_empty()
    }

    /// Values at `(row, col)`, or `None` out of bounds.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&[CellValue]> {
        self.cells.get(row)?.get(col).map(Vec::as_slice)
    }

    /// Index of a property by its label (case-insensitive).
    #[must_use]
    pub fn property_index(&self, label: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| p.eq_ignore_ascii_case(label))
    }

    /// Index of a contribution by its label (case-insensitive).
    #[must_use]
    pub fn contribution_index(&self, label: &str) -> Option<usize> {
        self.contributions
            .iter()
            .position(|c| c.eq_ignore_ascii_case(label))
    }

    /// Returns the transposed table (contributions become rows).
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut cells = vec![Vec::with_capacity(self.properties.len()); self.contributions.len()];
        for row in &self.cells {
            for (col_idx, cell) in row.iter().enumerate() {
                cells[col_idx].push(cell.clone());
            }
        }
        Self {
            properties: self.contributions.clone(),
            contributions: self.properties.clone(),
            cells,
        }
    }

    /// Flattens the table into a nested document keyed by contribution.
    ///
    /// Each contribution maps to an object of property → value, where an
    /// empty cell becomes `null`, a single value stays scalar, and a
    /// multi-valued cell becomes an array. This is the view the structured
    /// variant navigates with its document tools.
    #[must_use]
    pub fn to_document(&self) -> Value {
        let mut root = Map::new();
        for (col_idx, contribution) in self.contributions.iter().enumerate() {
            let mut entry = Map::new();
            for (row_idx, property) in self.properties.iter().enumerate() {
                let cell = &self.cells[row_idx][col_idx];
                let value = match cell.as_slice() {
                    [] => Value::Null,
                    [single] => single.to_json(),
                    many => Value::Array(many.iter().map(CellValue::to_json).collect()),
                };
                entry.insert(property.clone(), value);
            }
            root.insert(contribution.clone(), Value::Object(entry));
        }
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ComparisonTable {
        ComparisonTable::new(
            vec!["method".to_string(), "year".to_string()],
            vec![
                "Paper A".to_string(),
                "Paper B".to_string(),
                "Paper C".to_string(),
            ],
            vec![
                vec![
                    vec![CellValue::Text("LSTM".to_string())],
                    vec![
                        CellValue::Text("CNN".to_string()),
                        CellValue::Text("GRU".to_string()),
                    ],
                    vec![],
                ],
                vec![
                    vec![CellValue::Date("2019-04-01".to_string())],
                    vec![CellValue::Number(2020.0)],
                    vec![CellValue::Date("2021-06".to_string())],
                ],
            ],
        )
        .unwrap_or_else(|e| unreachable!("sample table is well-formed: {e}"))
    }

    #[test]
    fn test_cell_value_parse() {
        assert_eq!(CellValue::parse("42.5"), CellValue::Number(42.5));
        assert_eq!(
            CellValue::parse("2019-04-01"),
            CellValue::Date("2019-04-01".to_string())
        );
        assert_eq!(
            CellValue::parse("2021-06"),
            CellValue::Date("2021-06".to_string())
        );
        assert_eq!(
            CellValue::parse(" BERT "),
            CellValue::Text("BERT".to_string())
        );
        // Bare years parse as numbers, not dates.
        assert_eq!(CellValue::parse("2020"), CellValue::Number(2020.0));
        // Dashes in the wrong place stay text.
        assert_eq!(
            CellValue::parse("20-19-0401"),
            CellValue::Text("20-19-0401".to_string())
        );
    }

    #[test]
    fn test_shape_and_lookup() {
        let table = sample_table();
        assert_eq!(table.shape(), TableShape { rows: 2, cols: 3 });
        assert!(!table.is_empty());
        assert_eq!(table.property_index("YEAR"), Some(1));
        assert_eq!(table.contribution_index("paper b"), Some(1));
        assert_eq!(table.property_index("missing"), None);
        assert_eq!(
            table.cell(0, 2).map(<[CellValue]>::len),
            Some(0),
            "empty cell is present but holds no values"
        );
        assert!(table.cell(5, 0).is_none());
    }

    #[test]
    fn test_new_rejects_ragged_grid() {
        let result = ComparisonTable::new(
            vec!["p1".to_string()],
            vec!["c1".to_string(), "c2".to_string()],
            vec![vec![vec![]]],
        );
        assert!(matches!(
            result,
            Err(AgentError::DatasetUnavailable { .. })
        ));
    }

    #[test]
    fn test_transpose_round_trip() {
        let table = sample_table();
        let transposed = table.transpose();
        assert_eq!(transposed.shape(), TableShape { rows: 3, cols: 2 });
        assert_eq!(transposed.properties()[0], "Paper A");
        assert_eq!(transposed.cell(1, 0), table.cell(0, 1));
        assert_eq!(transposed.transpose(), table);
    }

    #[test]
    fn test_to_document_value_shapes() {
        let doc = sample_table().to_document();
        // Single value stays scalar.
        assert_eq!(doc["Paper A"]["method"], json!("LSTM"));
        // Multi-valued cell becomes an array.
        assert_eq!(doc["Paper B"]["method"], json!(["CNN", "GRU"]));
        // Empty cell becomes null.
        assert_eq!(doc["Paper C"]["method"], Value::Null);
        // Numbers stay numeric.
        assert_eq!(doc["Paper B"]["year"], json!(2020.0));
    }

    #[test]
    fn test_empty_table() {
        let table = ComparisonTable::new(vec![], vec![], vec![])
            .unwrap_or_else(|e| unreachable!("empty table is well-formed: {e}"));
        assert!(table.is_empty());
        assert_eq!(table.to_document(), json!({}));
    }
}
