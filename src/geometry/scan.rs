use geo::{Contains, Point};

use super::{arange, Chunk, Waypoint};

/// Serpentine scan points for one chunk.
///
/// A grid of `grid_size` steps is laid over the chunk's bounds. Rows are
/// emitted south to north; row `i` runs west to east when `i` is even and
/// east to west when `i` is odd. Row parity counts every grid row,
/// including rows with no point inside the chunk. Points on the chunk
/// boundary are not inside, so no point is shared by two chunks.
pub fn plan(chunk: &Chunk, grid_size: f64) -> Vec<Waypoint> {
    scan_rows(chunk, grid_size).into_iter().flatten().collect()
}

/// The serpentine rows of [`plan`], one entry per grid latitude.
pub fn scan_rows(chunk: &Chunk, grid_size: f64) -> Vec<Vec<Waypoint>> {
    let Some(bounds) = chunk.bounds() else {
        return Vec::new();
    };

    let latitudes = arange(bounds.min().y, bounds.max().y, grid_size);
    let longitudes = arange(bounds.min().x, bounds.max().x, grid_size);

    latitudes
        .iter()
        .enumerate()
        .map(|(row, &lat)| {
            let mut points: Vec<Waypoint> = longitudes
                .iter()
                .filter(|&&lon| is_interior(chunk, lat, lon))
                .map(|&lon| Waypoint::new(lat, lon))
                .collect();
            if row % 2 == 1 {
                points.reverse();
            }
            points
        })
        .collect()
}

/// Strictly inside both the cell and the field. The clipped geometry is
/// not used here since boolean ops move its edges off the cell lines.
fn is_interior(chunk: &Chunk, lat: f64, lon: f64) -> bool {
    let (min, max) = (chunk.cell.min(), chunk.cell.max());
    lon > min.x
        && lon < max.x
        && lat > min.y
        && lat < max.y
        && chunk.field.contains(&Point::new(lon, lat))
}
