use std::sync::Arc;

use geo::{coord, Area, BooleanOps, BoundingRect, CoordsIter, Intersects, MultiPolygon, Rect};
use tracing::debug;

use super::{arange, Field};

/// Boolean ops round coordinates by a few ulps; bounds within this distance
/// of an exact cell edge or field vertex are moved back onto it.
const SNAP_TOLERANCE: f64 = 1e-9;

/// One grid-aligned cell of the survey field.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Sequential id, starting at 1, in traversal order.
    pub id: u32,
    /// The grid cell this chunk was cut from.
    pub cell: Rect<f64>,
    /// Field ∩ cell. Empty when the cell only touches the field.
    pub geometry: MultiPolygon<f64>,
    /// The whole field, for exact containment tests.
    pub field: Arc<Field>,
    bounds: Option<Rect<f64>>,
}

impl Chunk {
    pub fn new(id: u32, cell: Rect<f64>, field: Arc<Field>) -> Self {
        let geometry = field.intersection(&MultiPolygon::new(vec![cell.to_polygon()]));
        let bounds = exact_bounds(&geometry, &cell, &field);
        Self {
            id,
            cell,
            geometry,
            field,
            bounds,
        }
    }

    /// Bounding box of the clipped geometry, which is what the scan grid is
    /// laid over. `None` for a chunk with no area.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }
}

fn snap(value: f64, exact: &[f64]) -> f64 {
    exact
        .iter()
        .copied()
        .find(|e| (value - e).abs() < SNAP_TOLERANCE)
        .unwrap_or(value)
}

fn exact_bounds(
    geometry: &MultiPolygon<f64>,
    cell: &Rect<f64>,
    field: &Field,
) -> Option<Rect<f64>> {
    if geometry.unsigned_area() == 0.0 {
        return None;
    }
    let noisy = geometry.bounding_rect()?;

    // cell edges first so grid rows land exactly on them
    let mut xs = vec![cell.min().x, cell.max().x];
    let mut ys = vec![cell.min().y, cell.max().y];
    for c in field.coords_iter() {
        xs.push(c.x);
        ys.push(c.y);
    }

    Some(Rect::new(
        coord! { x: snap(noisy.min().x, &xs), y: snap(noisy.min().y, &ys) },
        coord! { x: snap(noisy.max().x, &xs), y: snap(noisy.max().y, &ys) },
    ))
}

/// Tile the field's bounding box with `chunk_size` square cells and clip
/// each cell against the field.
///
/// Cells are visited longitude-major (outer loop west to east), latitude
/// minor (inner loop south to north). Every cell that intersects the field
/// receives an id, including cells that only touch it along an edge or at
/// a corner; those chunks have empty geometry and no scan points. A field
/// with no area yields no chunks.
pub fn decompose(field: &Field, chunk_size: f64) -> Vec<Chunk> {
    let Some(bounds) = field.bounding_rect() else {
        return Vec::new();
    };
    if field.unsigned_area() == 0.0 {
        debug!("Field has no area, nothing to decompose");
        return Vec::new();
    }

    let field = Arc::new(field.clone());
    let mut chunks = Vec::new();
    let mut next_id = 1;

    for lon in arange(bounds.min().x, bounds.max().x, chunk_size) {
        for lat in arange(bounds.min().y, bounds.max().y, chunk_size) {
            let cell = Rect::new(
                coord! { x: lon, y: lat },
                coord! { x: lon + chunk_size, y: lat + chunk_size },
            );
            if !field.intersects(&cell.to_polygon()) {
                continue;
            }
            chunks.push(Chunk::new(next_id, cell, field.clone()));
            next_id += 1;
        }
    }

    debug!("Decomposed field into {} chunks", chunks.len());
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{repair, Coordinate};

    fn square_field() -> Field {
        repair(&[
            Coordinate::new(12.523, 76.894),
            Coordinate::new(12.523, 76.896),
            Coordinate::new(12.525, 76.896),
            Coordinate::new(12.525, 76.894),
            Coordinate::new(12.523, 76.894),
        ])
        .unwrap()
    }

    #[test]
    fn test_square_splits_into_four_chunks() {
        let chunks = decompose(&square_field(), 0.001);
        assert_eq!(chunks.len(), 4);
        let ids: Vec<u32> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_longitude_major_order() {
        let chunks = decompose(&square_field(), 0.001);
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0].cell, &pair[1].cell);
            let lon_a = a.min().x;
            let lon_b = b.min().x;
            assert!(
                lon_a < lon_b || ((lon_a - lon_b).abs() < 1e-12 && a.min().y < b.min().y),
                "chunk {} should come before chunk {}",
                pair[0].id,
                pair[1].id
            );
        }
    }

    #[test]
    fn test_chunk_areas_cover_field() {
        let field = square_field();
        let chunks = decompose(&field, 0.0007);
        let total: f64 = chunks.iter().map(|c| c.geometry.unsigned_area()).sum();
        let area = field.unsigned_area();
        assert!((total - area).abs() < area * 1e-6);
    }

    #[test]
    fn test_touching_cell_gets_an_id() {
        // right triangle over a 2x2 grid: the north-east cell only touches the hypotenuse
        let field = repair(&[
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 2.0),
            Coordinate::new(2.0, 0.0),
        ])
        .unwrap();
        let chunks = decompose(&field, 1.0);
        let cells: Vec<(u32, f64, f64)> = chunks
            .iter()
            .map(|c| (c.id, c.cell.min().x, c.cell.min().y))
            .collect();
        assert_eq!(
            cells,
            vec![(1, 0.0, 0.0), (2, 0.0, 1.0), (3, 1.0, 0.0), (4, 1.0, 1.0)]
        );
        assert_eq!(chunks[3].geometry.unsigned_area(), 0.0);
        assert!(chunks[3].bounds().is_none());
    }

    #[test]
    fn test_bounds_sit_on_cell_edges() {
        let chunks = decompose(&square_field(), 0.001);
        for chunk in &chunks {
            let bounds = chunk.bounds().unwrap();
            assert_eq!(bounds.min(), chunk.cell.min());
            assert_eq!(bounds.max().x, chunk.cell.max().x);
            assert_eq!(bounds.max().y, chunk.cell.max().y);
        }
    }

    #[test]
    fn test_empty_field_has_no_chunks() {
        let chunks = decompose(&MultiPolygon::new(vec![]), 0.001);
        assert!(chunks.is_empty());
    }
}
