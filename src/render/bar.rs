//! Bar chart rendering.
//!
//! Rows are sorted descending by the value column before plotting. Each bar
//! carries its own value annotation (two decimal places, optionally
//! currency-prefixed); an optional dashed cutoff line is drawn across the
//! plot with a legend entry.

use super::{
    category_colors, format_currency, format_value, status_color, RenderContext, RenderError,
    EMPTY_TABLE_MESSAGE,
};
use crate::table::ResultTable;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::path::PathBuf;
use tracing::{info, warn};

/// How bars are colored.
#[derive(Debug, Clone)]
pub enum BarColoring {
    /// Every bar gets the same fill.
    Fixed(RGBColor),
    /// Bars colored by the pass/fail palette of a status column.
    Status(String),
    /// Bars colored by the qualitative palette of a category column.
    Category(String),
}

/// Bar chart options.
#[derive(Debug, Clone)]
pub struct BarOptions {
    /// File stem of the chart (extension comes from the context).
    pub stem: String,
    /// Chart title.
    pub title: String,
    /// X axis description.
    pub x_desc: String,
    /// Y axis description.
    pub y_desc: String,
    /// Column providing bar labels.
    pub label_col: String,
    /// Numeric column providing bar heights and the sort order.
    pub value_col: String,
    /// Bar fill strategy.
    pub coloring: BarColoring,
    /// Optional horizontal cutoff line: (value, legend label).
    pub threshold: Option<(f64, String)>,
    /// Currency-format annotations and axis ticks.
    pub currency: bool,
    /// Fixed axis top; defaults to 15% above the tallest bar.
    pub y_max: Option<f64>,
}

/// One bar, fully resolved.
#[derive(Debug, Clone)]
pub(crate) struct BarEntry {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
    /// Legend group the bar belongs to, when coloring is categorical.
    pub group: Option<String>,
}

/// Resolved drawing input shared with the dashboard renderer.
#[derive(Debug, Clone)]
pub(crate) struct BarSpec {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub bars: Vec<BarEntry>,
    pub threshold: Option<(f64, String)>,
    pub currency_prefix: Option<String>,
    pub y_max: Option<f64>,
    pub bold_annotations: bool,
}

/// Render a bar chart. Returns `Ok(None)` without touching a backend when
/// the table is empty.
pub fn render(
    table: &ResultTable,
    opts: &BarOptions,
    ctx: &RenderContext,
) -> Result<Option<PathBuf>, RenderError> {
    if table.is_empty() {
        warn!("Bar chart '{}' skipped: empty table", opts.stem);
        println!("{}", EMPTY_TABLE_MESSAGE);
        return Ok(None);
    }

    let spec = build_spec(table, opts, ctx)?;
    let path = ctx.chart_path(&opts.stem)?;

    match ctx.format {
        crate::cli::ChartFormat::Png => {
            let root = BitMapBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, &spec)?;
            root.present().map_err(draw_err)?;
        }
        crate::cli::ChartFormat::Svg => {
            let root = SVGBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, &spec)?;
            root.present().map_err(draw_err)?;
        }
    }

    info!("Bar chart written to {}", path.display());
    Ok(Some(path))
}

/// Sort, color, and annotate the table into a [`BarSpec`].
pub(crate) fn build_spec(
    table: &ResultTable,
    opts: &BarOptions,
    ctx: &RenderContext,
) -> Result<BarSpec, RenderError> {
    let sorted = table.sorted_desc_by(&opts.value_col)?;
    let labels = sorted.text(&opts.label_col)?;
    let values = sorted.numeric(&opts.value_col)?;

    let bars = match &opts.coloring {
        BarColoring::Fixed(color) => labels
            .into_iter()
            .zip(values)
            .map(|(label, value)| BarEntry {
                label,
                value,
                color: *color,
                group: None,
            })
            .collect(),
        BarColoring::Status(column) => {
            let statuses = sorted.text(column)?;
            labels
                .into_iter()
                .zip(values)
                .zip(statuses)
                .map(|((label, value), status)| BarEntry {
                    label,
                    value,
                    color: status_color(&status),
                    group: Some(status),
                })
                .collect()
        }
        BarColoring::Category(column) => {
            let categories = sorted.text(column)?;
            let palette = category_colors(&categories);
            labels
                .into_iter()
                .zip(values)
                .zip(categories)
                .map(|((label, value), category)| BarEntry {
                    label,
                    value,
                    color: palette[&category],
                    group: Some(category),
                })
                .collect()
        }
    };

    Ok(BarSpec {
        title: opts.title.clone(),
        x_desc: opts.x_desc.clone(),
        y_desc: opts.y_desc.clone(),
        bars,
        threshold: opts.threshold.clone(),
        currency_prefix: opts.currency.then(|| ctx.currency_prefix.clone()),
        y_max: opts.y_max,
        bold_annotations: false,
    })
}

/// Draw a resolved spec onto a drawing area. Shared with the dashboard,
/// which draws into the lower band of a split root.
pub(crate) fn draw<DB>(area: &DrawingArea<DB, Shift>, spec: &BarSpec) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&WHITE).map_err(draw_err)?;

    let n = spec.bars.len();
    let tallest = spec
        .bars
        .iter()
        .map(|b| b.value)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(0.0);
    let y_max = spec.y_max.unwrap_or(if tallest > 0.0 { tallest * 1.15 } else { 1.0 });

    let mut chart = ChartBuilder::on(area)
        .caption(&spec.title, ("sans-serif", 28).into_font())
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..y_max)
        .map_err(draw_err)?;

    let labels: Vec<String> = spec.bars.iter().map(|b| b.label.clone()).collect();
    let x_formatter = |seg: &SegmentValue<usize>| -> String {
        let idx = match seg {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => *i,
            SegmentValue::Last => return String::new(),
        };
        labels.get(idx).cloned().unwrap_or_default()
    };

    let currency = spec.currency_prefix.clone();
    let y_formatter = move |v: &f64| -> String {
        match &currency {
            Some(prefix) => format_currency(prefix, *v),
            None => format!("{:.1}", v),
        }
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(RGBColor(0xdd, 0xdd, 0xdd))
        .x_desc(&spec.x_desc)
        .y_desc(&spec.y_desc)
        .x_labels(n)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .axis_desc_style(("sans-serif", 16).into_font())
        .draw()
        .map_err(draw_err)?;

    // Bars, one legend entry per distinct group in bar order
    let mut seen_groups: Vec<String> = Vec::new();
    for (i, entry) in spec.bars.iter().enumerate() {
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), entry.value),
            ],
            entry.color.filled(),
        );
        rect.set_margin(0, 0, 6, 6);

        let series = chart
            .draw_series(std::iter::once(rect))
            .map_err(draw_err)?;

        if let Some(group) = &entry.group {
            if !seen_groups.contains(group) {
                seen_groups.push(group.clone());
                let color = entry.color;
                series.label(group).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled())
                });
            }
        }
    }

    // Value annotations above each bar
    let annotation_font = if spec.bold_annotations {
        FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Bold)
    } else {
        FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal)
    };
    let annotation_style = annotation_font
        .color(&RGBColor(0x33, 0x33, 0x33))
        .pos(Pos::new(HPos::Center, VPos::Bottom));

    for (i, entry) in spec.bars.iter().enumerate() {
        if entry.value <= 0.0 {
            continue;
        }
        let text = match &spec.currency_prefix {
            Some(prefix) => format_currency(prefix, entry.value),
            None => format_value(entry.value),
        };
        chart
            .draw_series(std::iter::once(Text::new(
                text,
                (SegmentValue::CenterOf(i), entry.value + y_max * 0.01),
                annotation_style.clone(),
            )))
            .map_err(draw_err)?;
    }

    // Cutoff line
    if let Some((threshold, label)) = &spec.threshold {
        let color = super::CUTOFF_COLOR;
        chart
            .draw_series(DashedLineSeries::new(
                vec![
                    (SegmentValue::Exact(0), *threshold),
                    (SegmentValue::Exact(n), *threshold),
                ],
                8,
                4,
                color.stroke_width(2),
            ))
            .map_err(draw_err)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
    }

    if !seen_groups.is_empty() || spec.threshold.is_some() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(RGBColor(0xcc, 0xcc, 0xcc))
            .draw()
            .map_err(draw_err)?;
    }

    Ok(())
}

pub(crate) fn draw_err<E>(e: plotters::drawing::DrawingAreaErrorKind<E>) -> RenderError
where
    E: std::error::Error + Send + Sync,
{
    RenderError::Draw(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChartsConfig;
    use crate::table::Value;

    fn context() -> RenderContext {
        RenderContext::from_config(&ChartsConfig::default())
    }

    fn options() -> BarOptions {
        BarOptions {
            stem: "test".to_string(),
            title: "Test".to_string(),
            x_desc: "X".to_string(),
            y_desc: "Y".to_string(),
            label_col: "Name".to_string(),
            value_col: "Total".to_string(),
            coloring: BarColoring::Fixed(super::super::INVENTORY_BAR_COLOR),
            threshold: None,
            currency: false,
            y_max: None,
        }
    }

    fn sample() -> ResultTable {
        ResultTable::new(
            vec!["Name".to_string(), "Total".to_string(), "Status".to_string()],
            vec![
                vec![
                    Value::Text("low".to_string()),
                    Value::Number(1.0),
                    Value::Text("Reproved".to_string()),
                ],
                vec![
                    Value::Text("high".to_string()),
                    Value::Number(9.0),
                    Value::Text("Approved".to_string()),
                ],
            ],
        )
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        let result = render(&ResultTable::empty(), &options(), &context()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_spec_sorts_descending() {
        let spec = build_spec(&sample(), &options(), &context()).unwrap();
        assert_eq!(spec.bars[0].label, "high");
        assert_eq!(spec.bars[0].value, 9.0);
        assert_eq!(spec.bars[1].label, "low");
    }

    #[test]
    fn test_spec_status_coloring_and_groups() {
        let mut opts = options();
        opts.coloring = BarColoring::Status("Status".to_string());
        let spec = build_spec(&sample(), &opts, &context()).unwrap();
        assert_eq!(spec.bars[0].color, super::super::APPROVED_COLOR);
        assert_eq!(spec.bars[1].color, super::super::REPROVED_COLOR);
        assert_eq!(spec.bars[0].group.as_deref(), Some("Approved"));
    }

    #[test]
    fn test_spec_currency_prefix_follows_option() {
        let mut opts = options();
        opts.currency = true;
        let spec = build_spec(&sample(), &opts, &context()).unwrap();
        assert_eq!(spec.currency_prefix.as_deref(), Some("R$"));
    }

    #[test]
    fn test_missing_value_column_is_structured_error() {
        let mut opts = options();
        opts.value_col = "Absent".to_string();
        let err = build_spec(&sample(), &opts, &context()).unwrap_err();
        assert!(matches!(err, RenderError::Table(_)));
    }
}
