use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon, Validation};
use tracing::{debug, warn};

use super::{Coordinate, Field};
use crate::error::GeometryError;

/// Turn a raw coordinate ring into a valid field.
///
/// Consecutive duplicates are dropped and the ring is closed. A ring that
/// self-intersects is cleaned with a zero-width union, which resolves the
/// crossing into valid parts. Anything still invalid after that is
/// rejected.
pub fn repair(ring: &[Coordinate]) -> Result<Field, GeometryError> {
    let mut coords: Vec<Coord<f64>> = ring.iter().map(|c| Coord::from(*c)).collect();
    coords.dedup();

    let closed = coords.len() > 1 && coords.first() == coords.last();
    let unique = if closed { coords.len() - 1 } else { coords.len() };
    if unique < 3 {
        return Err(GeometryError::InsufficientPoints { found: unique });
    }

    if !closed {
        coords.push(coords[0]);
    }

    let polygon = Polygon::new(LineString::new(coords), vec![]);
    if polygon.is_valid() {
        return Ok(MultiPolygon::new(vec![polygon]));
    }

    warn!(
        "Invalid polygon with {} vertices, attempting zero-width repair",
        polygon.exterior().0.len()
    );
    let cleaned = polygon.union(&polygon);
    if cleaned.is_valid() {
        debug!("Polygon repaired into {} part(s)", cleaned.0.len());
        Ok(cleaned)
    } else {
        Err(GeometryError::UnrepairablePolygon)
    }
}
