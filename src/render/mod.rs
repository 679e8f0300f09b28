//! Chart rendering.
//!
//! Every renderer follows the same contract: it takes the loaded
//! [`ResultTable`](crate::table::ResultTable) plus options, short-circuits
//! on an empty table with a printed message and `Ok(None)`, and otherwise
//! writes one chart file and returns its path.

pub mod bar;
pub mod choropleth;
pub mod dashboard;
pub mod pie;

use crate::cli::ChartFormat;
use crate::config::ChartsConfig;
use crate::table::TableError;
use plotters::style::RGBColor;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Message printed by every renderer when the input table is empty.
pub const EMPTY_TABLE_MESSAGE: &str = "⚠️  No rows to chart; skipping render.";

/// Structured rendering failure.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("chart drawing failed: {0}")]
    Draw(String),

    #[error("could not prepare chart output: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Shared output settings resolved once per run.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Directory chart files land in.
    pub out_dir: PathBuf,
    /// Output image format.
    pub format: ChartFormat,
    /// Chart width in pixels.
    pub width: u32,
    /// Chart height in pixels.
    pub height: u32,
    /// Prefix for currency-formatted values.
    pub currency_prefix: String,
}

impl RenderContext {
    /// Build the context from the chart configuration.
    pub fn from_config(charts: &ChartsConfig) -> Self {
        let format = match charts.format.to_lowercase().as_str() {
            "svg" => ChartFormat::Svg,
            _ => ChartFormat::Png,
        };

        Self {
            out_dir: PathBuf::from(&charts.output_dir),
            format,
            width: charts.width,
            height: charts.height,
            currency_prefix: charts.currency_prefix.clone(),
        }
    }

    /// Output path for a chart file, creating the directory if needed.
    pub fn chart_path(&self, stem: &str) -> Result<PathBuf, RenderError> {
        std::fs::create_dir_all(&self.out_dir)?;
        Ok(self
            .out_dir
            .join(format!("{}.{}", stem, self.format.extension())))
    }
}

/// Pass color on the grades chart.
pub const APPROVED_COLOR: RGBColor = RGBColor(0x2e, 0xcc, 0x71);
/// Fail color on the grades chart.
pub const REPROVED_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
/// Color for status values outside the pass/fail pair.
pub const NEUTRAL_COLOR: RGBColor = RGBColor(0x95, 0xa5, 0xa6);

/// Single-color bar fill for the inventory report.
pub const INVENTORY_BAR_COLOR: RGBColor = RGBColor(0x34, 0x98, 0xdb);
/// Bar fill for the dashboard report.
pub const DASHBOARD_BAR_COLOR: RGBColor = RGBColor(0xe6, 0x84, 0x1e);
/// Cutoff line color.
pub const CUTOFF_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);

/// KPI header colors: total, top performer, mean.
pub const KPI_TOTAL_COLOR: RGBColor = RGBColor(0x2e, 0x8b, 0x57);
pub const KPI_TOP_COLOR: RGBColor = RGBColor(0xe6, 0x84, 0x1e);
pub const KPI_MEAN_COLOR: RGBColor = RGBColor(0x46, 0x82, 0xb4);

/// Fixed qualitative palette for category coloring (regions etc.).
pub const QUALITATIVE_PALETTE: [RGBColor; 10] = [
    RGBColor(0x33, 0x66, 0xcc),
    RGBColor(0xdc, 0x39, 0x12),
    RGBColor(0xff, 0x99, 0x00),
    RGBColor(0x10, 0x96, 0x18),
    RGBColor(0x99, 0x00, 0x99),
    RGBColor(0x00, 0x99, 0xc6),
    RGBColor(0xdd, 0x44, 0x77),
    RGBColor(0x66, 0xaa, 0x00),
    RGBColor(0xb8, 0x2e, 0x2e),
    RGBColor(0x31, 0x63, 0x95),
];

/// Fixed color for a pass/fail status value.
pub fn status_color(status: &str) -> RGBColor {
    match status {
        crate::queries::STATUS_APPROVED => APPROVED_COLOR,
        crate::queries::STATUS_REPROVED => REPROVED_COLOR,
        _ => NEUTRAL_COLOR,
    }
}

/// Assign palette colors to a category set.
///
/// Categories are sorted before assignment, so the same set of values gets
/// the same colors on every run regardless of row order.
pub fn category_colors(categories: &[String]) -> BTreeMap<String, RGBColor> {
    let mut sorted: Vec<&String> = categories.iter().collect();
    sorted.sort();
    sorted.dedup();

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), QUALITATIVE_PALETTE[i % QUALITATIVE_PALETTE.len()]))
        .collect()
}

/// Sequential red scale for the choropleth, `t` in `[0, 1]`.
pub fn red_scale(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    // #fee5d9 (light) to #a50f15 (dark)
    RGBColor(lerp(0xfe, 0xa5), lerp(0xe5, 0x0f), lerp(0xd9, 0x15))
}

/// Format a value to two decimal places.
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

/// Currency formatting: `R$ 1,234,567.89`.
pub fn format_currency(prefix: &str, value: f64) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{} {}{}.{}", prefix, sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors_are_fixed() {
        assert_eq!(status_color("Approved"), APPROVED_COLOR);
        assert_eq!(status_color("Reproved"), REPROVED_COLOR);
        assert_eq!(status_color("Pending"), NEUTRAL_COLOR);
    }

    #[test]
    fn test_category_colors_are_order_independent() {
        let forward = category_colors(&[
            "North".to_string(),
            "South".to_string(),
            "East".to_string(),
        ]);
        let backward = category_colors(&[
            "South".to_string(),
            "East".to_string(),
            "North".to_string(),
            "East".to_string(),
        ]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);
    }

    #[test]
    fn test_currency_formatting() {
        assert_eq!(format_currency("R$", 1234567.891), "R$ 1,234,567.89");
        assert_eq!(format_currency("R$", 0.5), "R$ 0.50");
        assert_eq!(format_currency("R$", 999.0), "R$ 999.00");
        assert_eq!(format_currency("R$", -1234.5), "R$ -1,234.50");
    }

    #[test]
    fn test_value_formatting_two_decimals() {
        assert_eq!(format_value(7.125), "7.13");
        assert_eq!(format_value(10.0), "10.00");
    }

    #[test]
    fn test_red_scale_endpoints() {
        assert_eq!(red_scale(0.0), RGBColor(0xfe, 0xe5, 0xd9));
        assert_eq!(red_scale(1.0), RGBColor(0xa5, 0x0f, 0x15));
        // Out-of-range input clamps instead of wrapping
        assert_eq!(red_scale(2.0), red_scale(1.0));
    }

    #[test]
    fn test_context_format_fallback() {
        let mut charts = crate::config::ChartsConfig::default();
        charts.format = "svg".to_string();
        assert_eq!(
            RenderContext::from_config(&charts).format,
            crate::cli::ChartFormat::Svg
        );

        charts.format = "bmp".to_string();
        assert_eq!(
            RenderContext::from_config(&charts).format,
            crate::cli::ChartFormat::Png
        );
    }
}
