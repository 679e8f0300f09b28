//! Pie chart rendering.
//!
//! One slice per category, sized by the per-category sum of the value
//! column; percentage and label are drawn inside each slice.

use super::bar::draw_err;
use super::{category_colors, RenderContext, RenderError, EMPTY_TABLE_MESSAGE};
use crate::table::ResultTable;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

/// Pie chart options.
#[derive(Debug, Clone)]
pub struct PieOptions {
    /// File stem of the chart.
    pub stem: String,
    /// Chart title.
    pub title: String,
    /// Category column, one slice per distinct value.
    pub category_col: String,
    /// Numeric column summed per category.
    pub value_col: String,
}

/// Render a pie chart. Returns `Ok(None)` for an empty table.
pub fn render(
    table: &ResultTable,
    opts: &PieOptions,
    ctx: &RenderContext,
) -> Result<Option<PathBuf>, RenderError> {
    if table.is_empty() {
        warn!("Pie chart '{}' skipped: empty table", opts.stem);
        println!("{}", EMPTY_TABLE_MESSAGE);
        return Ok(None);
    }

    let slices = build_slices(table, opts)?;
    if slices.is_empty() {
        warn!("Pie chart '{}' skipped: no positive slice values", opts.stem);
        println!("{}", EMPTY_TABLE_MESSAGE);
        return Ok(None);
    }

    let path = ctx.chart_path(&opts.stem)?;

    match ctx.format {
        crate::cli::ChartFormat::Png => {
            let root = BitMapBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, &opts.title, &slices)?;
            root.present().map_err(draw_err)?;
        }
        crate::cli::ChartFormat::Svg => {
            let root = SVGBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, &opts.title, &slices)?;
            root.present().map_err(draw_err)?;
        }
    }

    info!("Pie chart written to {}", path.display());
    Ok(Some(path))
}

/// Per-category sums with non-positive slices dropped.
pub(crate) fn build_slices(
    table: &ResultTable,
    opts: &PieOptions,
) -> Result<Vec<(String, f64)>, RenderError> {
    let groups = table.group_sum(&opts.category_col, &opts.value_col)?;

    let slices: Vec<(String, f64)> = groups
        .into_iter()
        .filter(|(name, value)| {
            if *value <= 0.0 {
                warn!("Dropping non-positive pie slice '{}' ({})", name, value);
                false
            } else {
                true
            }
        })
        .collect();

    Ok(slices)
}

fn draw<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    slices: &[(String, f64)],
) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&WHITE).map_err(draw_err)?;
    let area = area
        .titled(title, ("sans-serif", 28).into_font())
        .map_err(draw_err)?;

    let labels: Vec<String> = slices.iter().map(|(name, _)| name.clone()).collect();
    let sizes: Vec<f64> = slices.iter().map(|(_, value)| *value).collect();

    let palette = category_colors(&labels);
    let colors: Vec<RGBColor> = labels.iter().map(|l| palette[l]).collect();

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = (w.min(h) as f64) * 0.35;

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style(
        ("sans-serif", 18)
            .into_font()
            .color(&RGBColor(0x33, 0x33, 0x33)),
    );
    pie.percentages(("sans-serif", 14).into_font().color(&WHITE));

    area.draw(&pie).map_err(draw_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChartsConfig;
    use crate::table::Value;

    fn options() -> PieOptions {
        PieOptions {
            stem: "pie".to_string(),
            title: "Distribution".to_string(),
            category_col: "Region".to_string(),
            value_col: "Total Sales".to_string(),
        }
    }

    fn sample() -> ResultTable {
        ResultTable::new(
            vec!["Region".to_string(), "Total Sales".to_string()],
            vec![
                vec![Value::Text("South".to_string()), Value::Number(60.0)],
                vec![Value::Text("North".to_string()), Value::Number(40.0)],
                vec![Value::Text("South".to_string()), Value::Number(20.0)],
                vec![Value::Text("Online".to_string()), Value::Number(0.0)],
            ],
        )
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        let ctx = RenderContext::from_config(&ChartsConfig::default());
        let result = render(&ResultTable::empty(), &options(), &ctx).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_slices_sum_categories_and_drop_zeroes() {
        let slices = build_slices(&sample(), &options()).unwrap();
        assert_eq!(
            slices,
            vec![("North".to_string(), 40.0), ("South".to_string(), 80.0)]
        );
    }
}
