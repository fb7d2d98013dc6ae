//! GeoJSON position helpers shared by the alert adapters.
//!
//! Alert geometry arrives as anything from a bare point to a multipolygon;
//! the dashboard wants one representative `(lon, lat)` per event. Polygons
//! reduce to the arithmetic mean of the outer ring's vertices -- an
//! approximation that holds up at alert-area sizes, not a true area
//! centroid.

use serde_json::Value;

/// Extract a representative `(lon, lat)` from a GeoJSON geometry object.
///
/// Points pass through; Polygon and MultiPolygon reduce to the centroid of
/// the first ring of the first polygon. Unknown types, missing coordinates,
/// and degenerate rings all yield `None` -- never a made-up position.
pub fn point_from_geojson(geometry: Option<&Value>) -> Option<(f64, f64)> {
    let geometry = geometry?;
    let coords = geometry.get("coordinates")?;
    match geometry.get("type").and_then(Value::as_str)? {
        "Point" => {
            let lon = coords.get(0).and_then(Value::as_f64)?;
            let lat = coords.get(1).and_then(Value::as_f64)?;
            Some((lon, lat))
        }
        "Polygon" => ring_centroid(coords.get(0)?.as_array()?),
        "MultiPolygon" => ring_centroid(coords.get(0)?.get(0)?.as_array()?),
        _ => None,
    }
}

/// Arithmetic centroid of a ring of `[lon, lat]` pairs.
///
/// Vertices that are not two-element numeric pairs are skipped; an empty or
/// all-bad ring is `None`.
fn ring_centroid(ring: &[Value]) -> Option<(f64, f64)> {
    let mut lon_sum = 0.0;
    let mut lat_sum = 0.0;
    let mut count = 0usize;

    for vertex in ring {
        let (Some(lon), Some(lat)) = (
            vertex.get(0).and_then(Value::as_f64),
            vertex.get(1).and_then(Value::as_f64),
        ) else {
            continue;
        };
        lon_sum += lon;
        lat_sum += lat;
        count += 1;
    }

    if count == 0 {
        return None;
    }
    Some((lon_sum / count as f64, lat_sum / count as f64))
}
