//! Descriptive statistics over a loaded result table.
//!
//! Everything here is a pure function of the table: the runners decide
//! what to print and what to feed into a chart.

use crate::table::{ResultTable, TableError};
use std::fmt;

/// Fallback key for region strings without a state suffix.
pub const STATE_FALLBACK: &str = "NA";

/// Class-level grade statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStats {
    /// Mean of the numeric column.
    pub mean: f64,
    /// Share of rows whose status equals the target category.
    pub approved_share: f64,
    /// Share of rows whose status equals the opposing category.
    pub reproved_share: f64,
    /// Label of the maximum-value row.
    pub top_label: String,
    /// Value of the maximum-value row.
    pub top_value: f64,
}

impl ClassStats {
    /// Compute statistics for a grade table.
    ///
    /// Returns `Ok(None)` for an empty table. `approved` is the status value
    /// counted as a pass; `reproved` as a fail. Rows with any other status
    /// fall into neither share, so the three proportions sum to 1.0.
    pub fn compute(
        table: &ResultTable,
        label_col: &str,
        value_col: &str,
        status_col: &str,
        approved: &str,
        reproved: &str,
    ) -> Result<Option<ClassStats>, TableError> {
        if table.is_empty() {
            return Ok(None);
        }

        let values = table.numeric(value_col)?;
        let labels = table.text(label_col)?;
        let statuses = table.text(status_col)?;

        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;

        let approved_share =
            statuses.iter().filter(|s| s.as_str() == approved).count() as f64 / count;
        let reproved_share =
            statuses.iter().filter(|s| s.as_str() == reproved).count() as f64 / count;

        let (top_idx, top_value) = max_position(&values);

        Ok(Some(ClassStats {
            mean,
            approved_share,
            reproved_share,
            top_label: labels[top_idx].clone(),
            top_value,
        }))
    }
}

impl fmt::Display for ClassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Class mean: {:.2}", self.mean)?;
        writeln!(f, "Approval rate: {:.1}%", self.approved_share * 100.0)?;
        write!(
            f,
            "Top performer: {} (average: {:.2})",
            self.top_label, self.top_value
        )
    }
}

/// Key performance indicators for the sales dashboard header.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesKpis {
    /// Sum of the value column.
    pub total: f64,
    /// Mean of the value column.
    pub mean: f64,
    /// Label of the maximum-value row.
    pub top_label: String,
    /// Value of the maximum-value row.
    pub top_value: f64,
}

impl SalesKpis {
    /// Compute the dashboard KPIs. Returns `Ok(None)` for an empty table.
    pub fn compute(
        table: &ResultTable,
        label_col: &str,
        value_col: &str,
    ) -> Result<Option<SalesKpis>, TableError> {
        if table.is_empty() {
            return Ok(None);
        }

        let values = table.numeric(value_col)?;
        let labels = table.text(label_col)?;

        let total: f64 = values.iter().sum();
        let mean = total / values.len() as f64;
        let (top_idx, top_value) = max_position(&values);

        Ok(Some(SalesKpis {
            total,
            mean,
            top_label: labels[top_idx].clone(),
            top_value,
        }))
    }
}

/// Derive the state key from a region string.
///
/// `"São Paulo - SP"` yields `"SP"`; a string without a `-` separator yields
/// the `"NA"` fallback.
pub fn region_to_state(region: &str) -> String {
    if !region.contains('-') {
        return STATE_FALLBACK.to_string();
    }

    let chars: Vec<char> = region.chars().collect();
    let start = chars.len().saturating_sub(2);
    chars[start..].iter().collect()
}

/// Sum a value column per derived state, sorted by state key.
pub fn state_totals(
    table: &ResultTable,
    region_col: &str,
    value_col: &str,
) -> Result<Vec<(String, f64)>, TableError> {
    let regions = table.text(region_col)?;
    let values = table.numeric(value_col)?;

    let mut sums: std::collections::BTreeMap<String, f64> = std::collections::BTreeMap::new();
    for (region, value) in regions.iter().zip(values.iter()) {
        *sums.entry(region_to_state(region)).or_insert(0.0) += value;
    }

    Ok(sums.into_iter().collect())
}

/// Index and value of the first maximum in a non-empty slice.
fn max_position(values: &[f64]) -> (usize, f64) {
    let mut top_idx = 0;
    let mut top_value = values[0];
    for (idx, &value) in values.iter().enumerate().skip(1) {
        if value > top_value {
            top_idx = idx;
            top_value = value;
        }
    }
    (top_idx, top_value)
}
