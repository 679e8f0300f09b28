//! Choropleth map rendering.
//!
//! Sums the value column per derived state, joins the sums against the
//! boundary set, and fills each matched region on a sequential red scale.
//! Regions absent from the data are not drawn; the viewport fits the
//! bounding box of the matched regions only.

use super::bar::draw_err;
use super::{red_scale, RenderContext, RenderError, EMPTY_TABLE_MESSAGE};
use crate::analysis::state_totals;
use crate::geo::BoundarySet;
use crate::table::ResultTable;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::PathBuf;
use tracing::{info, warn};

/// Message printed when no region in the data matches a boundary.
pub const NO_MAPPABLE_DATA_MESSAGE: &str = "⚠️  No mappable state data; skipping map.";

/// Choropleth options.
#[derive(Debug, Clone)]
pub struct ChoroplethOptions {
    /// File stem of the chart.
    pub stem: String,
    /// Chart title.
    pub title: String,
    /// Region column; the state key is its last two characters.
    pub region_col: String,
    /// Numeric column summed per state.
    pub value_col: String,
}

/// A state ready to be filled: key, summed value, normalized shade.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShadedRegion {
    pub key: String,
    pub value: f64,
    pub shade: f64,
}

/// Render the map. Returns `Ok(None)` for an empty table or when nothing
/// in the data matches a boundary feature.
pub fn render(
    table: &ResultTable,
    boundaries: &BoundarySet,
    opts: &ChoroplethOptions,
    ctx: &RenderContext,
) -> Result<Option<PathBuf>, RenderError> {
    if table.is_empty() {
        warn!("Choropleth '{}' skipped: empty table", opts.stem);
        println!("{}", EMPTY_TABLE_MESSAGE);
        return Ok(None);
    }

    let regions = build_regions(table, boundaries, opts)?;
    if regions.is_empty() {
        warn!("Choropleth '{}' skipped: no matching boundaries", opts.stem);
        println!("{}", NO_MAPPABLE_DATA_MESSAGE);
        return Ok(None);
    }

    let path = ctx.chart_path(&opts.stem)?;

    match ctx.format {
        crate::cli::ChartFormat::Png => {
            let root = BitMapBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, boundaries, &regions, opts)?;
            root.present().map_err(draw_err)?;
        }
        crate::cli::ChartFormat::Svg => {
            let root = SVGBackend::new(&path, (ctx.width, ctx.height)).into_drawing_area();
            draw(&root, boundaries, &regions, opts)?;
            root.present().map_err(draw_err)?;
        }
    }

    info!("Choropleth written to {}", path.display());
    Ok(Some(path))
}

/// Join per-state sums against the boundary set and normalize the shades.
///
/// States without a boundary (including the "NA" fallback) are dropped with
/// a warning, mirroring how unmatched locations stay off the map.
pub(crate) fn build_regions(
    table: &ResultTable,
    boundaries: &BoundarySet,
    opts: &ChoroplethOptions,
) -> Result<Vec<ShadedRegion>, RenderError> {
    let totals = state_totals(table, &opts.region_col, &opts.value_col)?;

    let matched: Vec<(String, f64)> = totals
        .into_iter()
        .filter(|(key, _)| {
            let known = boundaries.get(key).is_some();
            if !known {
                warn!("State '{}' has no boundary feature; not drawn", key);
            }
            known
        })
        .collect();

    let max = matched
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);

    Ok(matched
        .into_iter()
        .map(|(key, value)| ShadedRegion {
            shade: if max > 0.0 { value / max } else { 0.0 },
            key,
            value,
        })
        .collect())
}

fn draw<DB>(
    area: &DrawingArea<DB, Shift>,
    boundaries: &BoundarySet,
    regions: &[ShadedRegion],
    opts: &ChoroplethOptions,
) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&WHITE).map_err(draw_err)?;

    let ((min_lon, min_lat), (max_lon, max_lat)) = boundaries
        .bounding_box(regions.iter().map(|r| r.key.as_str()))
        .ok_or_else(|| RenderError::Draw("no boundary matched the data".to_string()))?;

    // Small margin so border strokes are not clipped at the viewport edge
    let pad_lon = (max_lon - min_lon) * 0.02;
    let pad_lat = (max_lat - min_lat) * 0.02;

    let mut chart = ChartBuilder::on(area)
        .caption(&opts.title, ("sans-serif", 28).into_font())
        .margin(10)
        .build_cartesian_2d(
            (min_lon - pad_lon)..(max_lon + pad_lon),
            (min_lat - pad_lat)..(max_lat + pad_lat),
        )
        .map_err(draw_err)?;

    let label_style = ("sans-serif", 13)
        .into_font()
        .color(&RGBColor(0x22, 0x22, 0x22))
        .pos(Pos::new(HPos::Center, VPos::Center));

    for region in regions {
        let Some(boundary) = boundaries.get(&region.key) else {
            continue;
        };
        let fill = red_scale(region.shade);

        for ring in &boundary.rings {
            chart
                .draw_series(std::iter::once(Polygon::new(ring.clone(), fill.filled())))
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(PathElement::new(
                    ring.clone(),
                    WHITE.stroke_width(1),
                )))
                .map_err(draw_err)?;
        }

        let (cx, cy) = centroid(&boundary.rings);
        chart
            .draw_series(std::iter::once(Text::new(
                region.key.clone(),
                (cx, cy),
                label_style.clone(),
            )))
            .map_err(draw_err)?;
    }

    Ok(())
}

/// Mean of all ring points; good enough to anchor a short label.
fn centroid(rings: &[Vec<(f64, f64)>]) -> (f64, f64) {
    let mut sum = (0.0, 0.0);
    let mut count = 0usize;
    for ring in rings {
        for &(lon, lat) in ring {
            sum.0 += lon;
            sum.1 += lat;
            count += 1;
        }
    }
    if count == 0 {
        (0.0, 0.0)
    } else {
        (sum.0 / count as f64, sum.1 / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"sigla": "SP"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[ -46.0, -23.0 ], [ -45.0, -23.0 ], [ -45.0, -22.0 ], [ -46.0, -23.0 ]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"sigla": "PR"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[ -51.0, -25.0 ], [ -50.0, -25.0 ], [ -50.0, -24.0 ], [ -51.0, -25.0 ]]]
                }
            }
        ]
    }"#;

    fn options() -> ChoroplethOptions {
        ChoroplethOptions {
            stem: "map".to_string(),
            title: "Sales by State".to_string(),
            region_col: "Region".to_string(),
            value_col: "Total Sales".to_string(),
        }
    }

    fn sample() -> ResultTable {
        ResultTable::new(
            vec!["Region".to_string(), "Total Sales".to_string()],
            vec![
                vec![
                    Value::Text("São Paulo - SP".to_string()),
                    Value::Number(100.0),
                ],
                vec![
                    Value::Text("Curitiba - PR".to_string()),
                    Value::Number(50.0),
                ],
                vec![Value::Text("Online".to_string()), Value::Number(30.0)],
            ],
        )
    }

    fn boundaries() -> BoundarySet {
        BoundarySet::parse(BOUNDARIES, "sigla").unwrap()
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        let ctx = RenderContext::from_config(&crate::config::ChartsConfig::default());
        let result = render(&ResultTable::empty(), &boundaries(), &options(), &ctx).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_unmatched_states_are_hidden() {
        let regions = build_regions(&sample(), &boundaries(), &options()).unwrap();
        let keys: Vec<&str> = regions.iter().map(|r| r.key.as_str()).collect();
        // "Online" derives to "NA", which has no boundary and stays off the map
        assert_eq!(keys, vec!["PR", "SP"]);
    }

    #[test]
    fn test_shades_normalize_to_max() {
        let regions = build_regions(&sample(), &boundaries(), &options()).unwrap();
        let sp = regions.iter().find(|r| r.key == "SP").unwrap();
        let pr = regions.iter().find(|r| r.key == "PR").unwrap();
        assert_eq!(sp.shade, 1.0);
        assert_eq!(pr.shade, 0.5);
    }

    #[test]
    fn test_no_matchable_data_renders_nothing() {
        let table = ResultTable::new(
            vec!["Region".to_string(), "Total Sales".to_string()],
            vec![vec![Value::Text("Online".to_string()), Value::Number(30.0)]],
        );
        let ctx = RenderContext::from_config(&crate::config::ChartsConfig::default());
        let result = render(&table, &boundaries(), &options(), &ctx).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_centroid_of_unit_square() {
        let rings = vec![vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]];
        assert_eq!(centroid(&rings), (1.0, 1.0));
    }
}
