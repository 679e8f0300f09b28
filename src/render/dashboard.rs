//! Dashboard rendering.
//!
//! A KPI header row (total revenue, top product, mean per product) drawn
//! above the sales bar chart, separated by a divider rule. Header text is
//! positioned relative to the plot area, like axes-relative annotations.

use super::bar::{draw_err, BarEntry, BarSpec};
use super::{
    format_currency, RenderContext, RenderError, DASHBOARD_BAR_COLOR, EMPTY_TABLE_MESSAGE,
    KPI_MEAN_COLOR, KPI_TOP_COLOR, KPI_TOTAL_COLOR,
};
use crate::analysis::SalesKpis;
use crate::table::ResultTable;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::path::PathBuf;
use tracing::{info, warn};

/// Dashboard options.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// File stem of the chart.
    pub stem: String,
    /// Main title above the KPI header.
    pub title: String,
    /// Label column for bars and the top-performer KPI.
    pub label_col: String,
    /// Numeric column for bar heights and every KPI.
    pub value_col: String,
    /// X axis description.
    pub x_desc: String,
    /// Y axis description.
    pub y_desc: String,
}

/// Render the dashboard. Returns `Ok(None)` for an empty table.
pub fn render(
    table: &ResultTable,
    opts: &DashboardOptions,
    ctx: &RenderContext,
) -> Result<Option<PathBuf>, RenderError> {
    if table.is_empty() {
        warn!("Dashboard '{}' skipped: empty table", opts.stem);
        println!("{}", EMPTY_TABLE_MESSAGE);
        return Ok(None);
    }

    let Some(kpis) = SalesKpis::compute(table, &opts.label_col, &opts.value_col)? else {
        println!("{}", EMPTY_TABLE_MESSAGE);
        return Ok(None);
    };

    let spec = build_bar_spec(table, opts, ctx)?;
    let path = ctx.chart_path(&opts.stem)?;

    match ctx.format {
        crate::cli::ChartFormat::Png => {
            let root = BitMapBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, &kpis, &spec, opts, ctx)?;
            root.present().map_err(draw_err)?;
        }
        crate::cli::ChartFormat::Svg => {
            let root = SVGBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, &kpis, &spec, opts, ctx)?;
            root.present().map_err(draw_err)?;
        }
    }

    info!("Dashboard written to {}", path.display());
    Ok(Some(path))
}

/// Descending single-color bar spec with bold currency annotations.
fn build_bar_spec(
    table: &ResultTable,
    opts: &DashboardOptions,
    ctx: &RenderContext,
) -> Result<BarSpec, RenderError> {
    let sorted = table.sorted_desc_by(&opts.value_col)?;
    let labels = sorted.text(&opts.label_col)?;
    let values = sorted.numeric(&opts.value_col)?;

    let bars = labels
        .into_iter()
        .zip(values)
        .map(|(label, value)| BarEntry {
            label,
            value,
            color: DASHBOARD_BAR_COLOR,
            group: None,
        })
        .collect();

    Ok(BarSpec {
        title: String::new(),
        x_desc: opts.x_desc.clone(),
        y_desc: opts.y_desc.clone(),
        bars,
        threshold: None,
        currency_prefix: Some(ctx.currency_prefix.clone()),
        y_max: None,
        bold_annotations: true,
    })
}

/// Relative-to-plot x positions of the three KPI blocks, in pixels.
///
/// The plot's y-label band is skipped so the header columns line up with
/// the axes area, matching fractions 0.0, 0.35, and 0.75 of its width.
pub(crate) fn kpi_x_positions(width: u32) -> [i32; 3] {
    let left = 90i32;
    let usable = width as i32 - left - 10;
    [
        left,
        left + (usable as f64 * 0.35) as i32,
        left + (usable as f64 * 0.75) as i32,
    ]
}

fn draw<DB>(
    area: &DrawingArea<DB, Shift>,
    kpis: &SalesKpis,
    spec: &BarSpec,
    opts: &DashboardOptions,
    ctx: &RenderContext,
) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&WHITE).map_err(draw_err)?;

    let header_height = (ctx.height as f64 * 0.24) as u32;
    let (header, plot) = area.split_vertically(header_height);

    draw_header(&header, kpis, opts, ctx)?;
    super::bar::draw(&plot, spec)?;

    Ok(())
}

fn draw_header<DB>(
    header: &DrawingArea<DB, Shift>,
    kpis: &SalesKpis,
    opts: &DashboardOptions,
    ctx: &RenderContext,
) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let title_style = FontDesc::new(FontFamily::SansSerif, 30.0, FontStyle::Bold)
        .color(&RGBColor(0x33, 0x33, 0x33));
    header
        .draw(&Text::new(opts.title.clone(), (90, 10), title_style))
        .map_err(draw_err)?;

    let caption_style = ("sans-serif", 13)
        .into_font()
        .color(&RGBColor(0x80, 0x80, 0x80));
    let value_font = FontDesc::new(FontFamily::SansSerif, 20.0, FontStyle::Bold);

    let prefix = &ctx.currency_prefix;
    let [x0, x1, x2] = kpi_x_positions(ctx.width);
    let caption_y = 52;
    let value_y = 72;

    // KPI 1: total revenue
    header
        .draw(&Text::new("Total Revenue", (x0, caption_y), caption_style.clone()))
        .map_err(draw_err)?;
    header
        .draw(&Text::new(
            format_currency(prefix, kpis.total),
            (x0, value_y),
            value_font.clone().color(&KPI_TOTAL_COLOR),
        ))
        .map_err(draw_err)?;

    // KPI 2: top performer, with its value on a sub-line
    header
        .draw(&Text::new("Top Product (Max)", (x1, caption_y), caption_style.clone()))
        .map_err(draw_err)?;
    header
        .draw(&Text::new(
            kpis.top_label.clone(),
            (x1, value_y),
            value_font.clone().color(&KPI_TOP_COLOR),
        ))
        .map_err(draw_err)?;
    header
        .draw(&Text::new(
            format!("({})", format_currency(prefix, kpis.top_value)),
            (x1, value_y + 24),
            ("sans-serif", 13).into_font().color(&KPI_TOP_COLOR),
        ))
        .map_err(draw_err)?;

    // KPI 3: mean per product
    header
        .draw(&Text::new("Mean per Product", (x2, caption_y), caption_style))
        .map_err(draw_err)?;
    header
        .draw(&Text::new(
            format_currency(prefix, kpis.mean),
            (x2, value_y),
            value_font.color(&KPI_MEAN_COLOR),
        ))
        .map_err(draw_err)?;

    // Divider between the header and the plot
    let (w, h) = header.dim_in_pixel();
    header
        .draw(&PathElement::new(
            vec![(10, h as i32 - 2), (w as i32 - 10, h as i32 - 2)],
            RGBColor(0xb0, 0xb0, 0xb0),
        ))
        .map_err(draw_err)?;

    Ok(())
}
