//! Boundary geometry for the choropleth map.
//!
//! Downloads a public GeoJSON file over HTTPS (certificates are validated;
//! the config escape hatch exists for re-signing proxies only) and parses
//! the features into keyed polygon rings. A failure here aborts only the
//! choropleth chart, never the whole report.

use crate::config::GeoConfig;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value as Json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Structured boundary-fetch failure.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("boundary download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("boundary server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("boundary file is not valid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("boundary file contains no usable features")]
    NoFeatures,
}

/// One named region: a join key plus the exterior rings of its polygons.
#[derive(Debug, Clone)]
pub struct Boundary {
    /// Value of the configured feature property, e.g. a state abbreviation.
    pub key: String,
    /// Exterior rings as (longitude, latitude) sequences.
    pub rings: Vec<Vec<(f64, f64)>>,
}

/// All boundaries parsed from one GeoJSON file.
#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    boundaries: Vec<Boundary>,
}

impl BoundarySet {
    /// Parse a GeoJSON document, joining on the given feature property.
    ///
    /// Features without the property or without Polygon/MultiPolygon
    /// geometry are skipped with a warning.
    pub fn parse(raw: &str, feature_key: &str) -> Result<Self, GeoError> {
        let doc: Json = serde_json::from_str(raw)?;

        let features = doc["features"].as_array().ok_or(GeoError::NoFeatures)?;

        let mut boundaries = Vec::new();
        for feature in features {
            let key = match feature["properties"][feature_key].as_str() {
                Some(k) => k.to_string(),
                None => {
                    warn!("Skipping feature without '{}' property", feature_key);
                    continue;
                }
            };

            let geometry = &feature["geometry"];
            let rings = match geometry["type"].as_str() {
                Some("Polygon") => polygon_rings(&geometry["coordinates"]),
                Some("MultiPolygon") => geometry["coordinates"]
                    .as_array()
                    .map(|polygons| polygons.iter().flat_map(polygon_rings).collect())
                    .unwrap_or_default(),
                other => {
                    warn!("Skipping feature '{}' with geometry {:?}", key, other);
                    continue;
                }
            };

            if rings.is_empty() {
                warn!("Skipping feature '{}' without coordinates", key);
                continue;
            }

            boundaries.push(Boundary { key, rings });
        }

        if boundaries.is_empty() {
            return Err(GeoError::NoFeatures);
        }

        debug!("Parsed {} boundary features", boundaries.len());
        Ok(Self { boundaries })
    }

    /// Boundary for a join key, if the file contains it.
    pub fn get(&self, key: &str) -> Option<&Boundary> {
        self.boundaries.iter().find(|b| b.key == key)
    }

    /// Number of boundaries.
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// True when no boundary was parsed.
    #[allow(dead_code)] // Companion to len()
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Bounding box `((min_lon, min_lat), (max_lon, max_lat))` over the
    /// boundaries whose key is in `keys`. `None` when nothing matches.
    ///
    /// This is what keeps regions outside the data hidden: the viewport is
    /// fitted to the matched subset only.
    pub fn bounding_box<'a, I>(&self, keys: I) -> Option<((f64, f64), (f64, f64))>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bbox: Option<((f64, f64), (f64, f64))> = None;

        for key in keys {
            let Some(boundary) = self.get(key) else {
                continue;
            };
            for ring in &boundary.rings {
                for &(lon, lat) in ring {
                    bbox = Some(match bbox {
                        None => ((lon, lat), (lon, lat)),
                        Some(((min_lon, min_lat), (max_lon, max_lat))) => (
                            (min_lon.min(lon), min_lat.min(lat)),
                            (max_lon.max(lon), max_lat.max(lat)),
                        ),
                    });
                }
            }
        }

        bbox
    }
}

/// Exterior ring of a Polygon coordinate list.
///
/// Only ring 0 is kept; holes cannot be represented by the fill style.
fn polygon_rings(coordinates: &Json) -> Vec<Vec<(f64, f64)>> {
    let Some(ring) = coordinates.as_array().and_then(|rings| rings.first()) else {
        return Vec::new();
    };

    let points: Vec<(f64, f64)> = ring
        .as_array()
        .map(|points| {
            points
                .iter()
                .filter_map(|p| {
                    let lon = p[0].as_f64()?;
                    let lat = p[1].as_f64()?;
                    Some((lon, lat))
                })
                .collect()
        })
        .unwrap_or_default();

    if points.is_empty() {
        Vec::new()
    } else {
        vec![points]
    }
}

/// Download and parse the boundary file.
pub async fn fetch_boundaries(config: &GeoConfig) -> Result<BoundarySet, GeoError> {
    info!("Fetching boundaries from {}", config.boundaries_url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .danger_accept_invalid_certs(config.allow_invalid_certs)
        .build()?;

    if config.allow_invalid_certs {
        warn!("TLS certificate validation is DISABLED for the boundary download");
    }

    let mut response = client.get(&config.boundaries_url).send().await?;

    if !response.status().is_success() {
        return Err(GeoError::Status(response.status()));
    }

    let progress = match response.content_length() {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_message("Downloading boundaries...");
            pb
        }
    };

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        progress.set_position(body.len() as u64);
    }
    progress.finish_and_clear();

    let raw = String::from_utf8_lossy(&body);
    let set = BoundarySet::parse(&raw, &config.feature_key)?;
    info!("Loaded {} boundary features", set.len());

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "State A", "sigla": "SP"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[ -46.0, -23.0 ], [ -45.0, -23.0 ], [ -45.0, -22.0 ], [ -46.0, -23.0 ]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"name": "State B", "sigla": "PR"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[ -51.0, -25.0 ], [ -50.0, -25.0 ], [ -50.0, -24.0 ], [ -51.0, -25.0 ]]],
                        [[[ -52.0, -26.0 ], [ -51.5, -26.0 ], [ -51.5, -25.5 ], [ -52.0, -26.0 ]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {"name": "No key"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[ 0.0, 0.0 ], [ 1.0, 0.0 ], [ 1.0, 1.0 ], [ 0.0, 0.0 ]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_polygon_and_multipolygon() {
        let set = BoundarySet::parse(SAMPLE, "sigla").unwrap();
        assert_eq!(set.len(), 2);

        let sp = set.get("SP").unwrap();
        assert_eq!(sp.rings.len(), 1);
        assert_eq!(sp.rings[0].len(), 4);

        let pr = set.get("PR").unwrap();
        assert_eq!(pr.rings.len(), 2);
    }

    #[test]
    fn test_features_without_key_are_skipped() {
        let set = BoundarySet::parse(SAMPLE, "sigla").unwrap();
        assert!(set.get("No key").is_none());
    }

    #[test]
    fn test_bounding_box_fits_matched_subset_only() {
        let set = BoundarySet::parse(SAMPLE, "sigla").unwrap();

        let ((min_lon, min_lat), (max_lon, max_lat)) =
            set.bounding_box(["SP"].into_iter()).unwrap();
        assert_eq!((min_lon, min_lat), (-46.0, -23.0));
        assert_eq!((max_lon, max_lat), (-45.0, -22.0));

        // Unmatched keys contribute nothing
        assert!(set.bounding_box(["XX"].into_iter()).is_none());

        // The full set widens the box to include PR
        let ((min_lon, _), _) = set.bounding_box(["SP", "PR"].into_iter()).unwrap();
        assert_eq!(min_lon, -52.0);
    }

    #[test]
    fn test_invalid_document_is_an_error() {
        assert!(matches!(
            BoundarySet::parse("{\"features\": []}", "sigla"),
            Err(GeoError::NoFeatures)
        ));
        assert!(matches!(
            BoundarySet::parse("not json", "sigla"),
            Err(GeoError::Parse(_))
        ));
    }
}
