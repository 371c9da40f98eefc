pub mod decompose;
pub mod repair;
pub mod scan;

use geo::{Coord, MultiPolygon, Point};
use serde::{Deserialize, Serialize};

pub use decompose::{decompose, Chunk};
pub use repair::repair;
pub use scan::plan;

/// Mean Earth radius used for ground distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A repaired survey area. Cleaning a self-intersecting ring can split it
/// into several valid parts, so the field is always a multipolygon.
pub type Field = MultiPolygon<f64>;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A scan target. Order within a mission plan is significant.
pub type Waypoint = Coordinate;

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(self, other)
    }

    pub fn as_pair(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

// geo works in (x, y) = (longitude, latitude)
impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord {
            x: c.longitude,
            y: c.latitude,
        }
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(c: Coordinate) -> Self {
        Point::new(c.longitude, c.latitude)
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(c: Coord<f64>) -> Self {
        Coordinate::new(c.y, c.x)
    }
}

/// Great-circle distance in meters between two positions.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

const RANGE_EPSILON: f64 = 1e-9;

/// Half-open range `[start, stop)` stepped by `step`.
///
/// Produces `ceil((stop - start) / step)` values of the form
/// `start + i * step`, so a final value may sit close to `stop` when the
/// extent is not a whole multiple of the step.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || !(stop > start) {
        return Vec::new();
    }
    // absorb float noise so an exact multiple does not grow a sliver step
    let count = ((stop - start) / step - RANGE_EPSILON).ceil() as usize;
    (0..count).map(|i| start + i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = Coordinate::new(12.524, 76.895);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_one_millidegree_latitude() {
        let a = Coordinate::new(12.000, 76.000);
        let b = Coordinate::new(12.001, 76.000);
        let d = haversine_distance(&a, &b);
        assert!((d - 111.2).abs() < 111.2 * 0.01, "distance was {}", d);
    }

    #[test]
    fn test_arange_half_open() {
        let values = arange(0.0, 1.0, 0.25);
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75]);

        // partial final step is still produced
        let values = arange(0.0, 1.1, 0.5);
        assert_eq!(values.len(), 3);
        assert!((values[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_arange_degenerate() {
        assert!(arange(1.0, 1.0, 0.1).is_empty());
        assert!(arange(2.0, 1.0, 0.1).is_empty());
        assert!(arange(0.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn test_coordinate_geo_axes() {
        let c = Coordinate::new(12.5, 76.9);
        let coord: Coord<f64> = c.into();
        assert_eq!(coord.x, 76.9);
        assert_eq!(coord.y, 12.5);
        assert_eq!(Coordinate::from(coord), c);
    }
}
