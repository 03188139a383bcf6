//! Coastline geometry for the rendered overlay.
//!
//! Coastlines are read from a GeoJSON file, typically one of the Natural Earth coastline
//! downloads. Only the line work is kept: LineString and MultiLineString geometries directly,
//! and the rings of Polygon and MultiPolygon geometries.

use crate::error::{StormSatError, StormSatResult};
use serde_json::Value;
use std::path::Path;

/// Coastline polylines as (longitude, latitude) vertex runs in degrees.
#[derive(Debug, Clone, Default)]
pub struct Coastline {
    segments: Vec<Vec<(f64, f64)>>,
}

impl Coastline {
    /// Load coastline geometry from a GeoJSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> StormSatResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let json: Value = serde_json::from_str(&text)
            .map_err(|err| StormSatError::Configuration(format!("coastline file: {}", err)))?;

        let mut segments = Vec::new();

        match json.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {
                for feature in json
                    .get("features")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    if let Some(geometry) = feature.get("geometry") {
                        collect_geometry(geometry, &mut segments);
                    }
                }
            }
            Some("Feature") => {
                if let Some(geometry) = json.get("geometry") {
                    collect_geometry(geometry, &mut segments);
                }
            }
            _ => collect_geometry(&json, &mut segments),
        }

        Ok(Coastline { segments })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate over the polylines.
    pub fn segments(&self) -> impl Iterator<Item = &[(f64, f64)]> {
        self.segments.iter().map(Vec::as_slice)
    }
}

fn collect_geometry(geometry: &Value, segments: &mut Vec<Vec<(f64, f64)>>) {
    let coords = geometry.get("coordinates");

    match geometry.get("type").and_then(Value::as_str) {
        Some("LineString") => {
            if let Some(line) = coords.and_then(parse_line) {
                push_line(line, segments);
            }
        }
        Some("MultiLineString") | Some("Polygon") => {
            for line in coords.and_then(Value::as_array).into_iter().flatten() {
                if let Some(line) = parse_line(line) {
                    push_line(line, segments);
                }
            }
        }
        Some("MultiPolygon") => {
            for polygon in coords.and_then(Value::as_array).into_iter().flatten() {
                for ring in polygon.as_array().into_iter().flatten() {
                    if let Some(line) = parse_line(ring) {
                        push_line(line, segments);
                    }
                }
            }
        }
        _ => {}
    }
}

fn push_line(line: Vec<(f64, f64)>, segments: &mut Vec<Vec<(f64, f64)>>) {
    if line.len() >= 2 {
        segments.push(line);
    }
}

/// Parse an array of GeoJSON positions into (lon, lat) pairs.
fn parse_line(value: &Value) -> Option<Vec<(f64, f64)>> {
    let positions = value.as_array()?;

    let mut line = Vec::with_capacity(positions.len());
    for position in positions {
        let coords = position.as_array()?;
        let lon = coords.first()?.as_f64()?;
        let lat = coords.get(1)?.as_f64()?;
        line.push((lon, lat));
    }

    Some(line)
}
