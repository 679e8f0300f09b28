//! In-memory query result table.
//!
//! This module contains the tabular structure every report works on:
//! an ordered list of rows produced by a single SQL query, plus the
//! re-projections (descending sort, grouped sums) the renderers need.

use std::fmt;
use thiserror::Error;

/// A single cell value decoded from the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Any numeric column (integers are widened to f64).
    Number(f64),
    /// Text column.
    Text(String),
}

impl Value {
    /// Numeric view of the cell. NULL and text yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view of the cell. NULL yields `None`, numbers are formatted.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Error raised when a report accesses a column the query did not produce.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column '{0}' not present in query result")]
    MissingColumn(String),
}

/// Ordered result of a single SQL query.
///
/// Column names are exactly the aliases the query declared; they are the
/// contract every downstream stage depends on. The table is a read-only
/// snapshot; derived orderings and groupings are new tables.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Create a table from column names and row data.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// The empty-result sentinel: no columns, no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Column names in query order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in result order.
    #[allow(dead_code)] // Utility accessor (reports go through projections)
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Cell accessor by row index and column name. Out-of-range rows read
    /// as NULL.
    #[allow(dead_code)] // Utility accessor (reports go through projections)
    pub fn value(&self, row: usize, column: &str) -> Result<&Value, TableError> {
        static NULL: Value = Value::Null;
        let idx = self.column_index(column)?;
        Ok(self.rows.get(row).and_then(|r| r.get(idx)).unwrap_or(&NULL))
    }

    /// Numeric projection of a column. NULL and text cells become 0.0,
    /// matching how the queries already coalesce missing quantities.
    pub fn numeric(&self, column: &str) -> Result<Vec<f64>, TableError> {
        let idx = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r[idx].as_number().unwrap_or(0.0))
            .collect())
    }

    /// Text projection of a column. NULL cells become empty strings.
    pub fn text(&self, column: &str) -> Result<Vec<String>, TableError> {
        let idx = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r[idx].as_text().unwrap_or_default())
            .collect())
    }

    /// Sum of a numeric column.
    pub fn sum(&self, column: &str) -> Result<f64, TableError> {
        Ok(self.numeric(column)?.iter().sum())
    }

    /// New table with rows sorted descending by a numeric column.
    ///
    /// The sort is stable, so rows with equal values keep their query order
    /// and the output value sequence is non-increasing.
    pub fn sorted_desc_by(&self, column: &str) -> Result<ResultTable, TableError> {
        let idx = self.column_index(column)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let av = a[idx].as_number().unwrap_or(0.0);
            let bv = b[idx].as_number().unwrap_or(0.0);
            bv.partial_cmp(&av).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(ResultTable {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Sum a numeric column per distinct value of a key column.
    ///
    /// Groups come back sorted by key so the assignment of palette colors
    /// and the plotting order are identical across runs.
    pub fn group_sum(&self, key: &str, value: &str) -> Result<Vec<(String, f64)>, TableError> {
        let key_idx = self.column_index(key)?;
        let value_idx = self.column_index(value)?;

        let mut sums: std::collections::BTreeMap<String, f64> = std::collections::BTreeMap::new();
        for row in &self.rows {
            let group = row[key_idx].as_text().unwrap_or_default();
            let amount = row[value_idx].as_number().unwrap_or(0.0);
            *sums.entry(group).or_insert(0.0) += amount;
        }

        Ok(sums.into_iter().collect())
    }

    /// Distinct values of a text column, sorted.
    #[allow(dead_code)] // Utility for ad-hoc category inspection
    pub fn distinct(&self, column: &str) -> Result<Vec<String>, TableError> {
        let idx = self.column_index(column)?;
        let mut seen: Vec<String> = self
            .rows
            .iter()
            .map(|r| r[idx].as_text().unwrap_or_default())
            .collect();
        seen.sort();
        seen.dedup();
        Ok(seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultTable {
        ResultTable::new(
            vec!["Name".to_string(), "Total".to_string(), "Status".to_string()],
            vec![
                vec![
                    Value::Text("Alice".to_string()),
                    Value::Number(10.0),
                    Value::Text("Approved".to_string()),
                ],
                vec![
                    Value::Text("Bruno".to_string()),
                    Value::Number(30.0),
                    Value::Text("Reproved".to_string()),
                ],
                vec![
                    Value::Text("Carla".to_string()),
                    Value::Number(20.0),
                    Value::Text("Approved".to_string()),
                ],
            ],
        )
    }

    #[test]
    fn test_empty_sentinel() {
        let table = ResultTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_missing_column_is_error_not_panic() {
        let table = sample();
        let err = table.numeric("Nope").unwrap_err();
        assert_eq!(err, TableError::MissingColumn("Nope".to_string()));
    }

    #[test]
    fn test_sorted_desc_is_non_increasing() {
        let sorted = sample().sorted_desc_by("Total").unwrap();
        let values = sorted.numeric("Total").unwrap();
        assert_eq!(values, vec![30.0, 20.0, 10.0]);
        for pair in values.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_sorted_desc_is_stable_for_ties() {
        let table = ResultTable::new(
            vec!["Name".to_string(), "Total".to_string()],
            vec![
                vec![Value::Text("first".to_string()), Value::Number(5.0)],
                vec![Value::Text("second".to_string()), Value::Number(5.0)],
                vec![Value::Text("third".to_string()), Value::Number(9.0)],
            ],
        );
        let sorted = table.sorted_desc_by("Total").unwrap();
        let names = sorted.text("Name").unwrap();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_group_sum_matches_column_total() {
        let table = sample();
        let groups = table.group_sum("Status", "Total").unwrap();
        let grouped_total: f64 = groups.iter().map(|(_, v)| v).sum();
        assert_eq!(grouped_total, table.sum("Total").unwrap());
        assert_eq!(
            groups,
            vec![
                ("Approved".to_string(), 30.0),
                ("Reproved".to_string(), 30.0)
            ]
        );
    }

    #[test]
    fn test_distinct_is_sorted_and_deduped() {
        let distinct = sample().distinct("Status").unwrap();
        assert_eq!(distinct, vec!["Approved", "Reproved"]);
    }

    #[test]
    fn test_null_numeric_coalesces_to_zero() {
        let table = ResultTable::new(
            vec!["Total".to_string()],
            vec![vec![Value::Null], vec![Value::Number(4.0)]],
        );
        assert_eq!(table.numeric("Total").unwrap(), vec![0.0, 4.0]);
    }

    #[test]
    fn test_value_accessor() {
        let table = sample();
        assert_eq!(
            table.value(1, "Name").unwrap(),
            &Value::Text("Bruno".to_string())
        );
        assert_eq!(table.value(99, "Name").unwrap(), &Value::Null);
    }
}
