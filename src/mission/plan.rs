use tracing::info;

use crate::error::{MissionError, PlanningError};
use crate::geometry::{self, Chunk, Coordinate, Waypoint};

/// Ordered waypoints for one mission: per-chunk serpentine scans
/// concatenated in chunk id order. No path optimisation across chunks.
#[derive(Debug, Clone)]
pub struct MissionPlan {
    pub chunks: Vec<Chunk>,
    pub waypoints: Vec<Waypoint>,
}

impl MissionPlan {
    pub fn build(
        ring: &[Coordinate],
        chunk_size: f64,
        grid_size: f64,
    ) -> Result<Self, MissionError> {
        let field = geometry::repair(ring)?;

        let chunks = geometry::decompose(&field, chunk_size);
        if chunks.is_empty() {
            return Err(PlanningError::NoChunksGenerated.into());
        }
        info!("Generated {} chunks", chunks.len());

        let waypoints: Vec<Waypoint> = chunks
            .iter()
            .flat_map(|chunk| geometry::plan(chunk, grid_size))
            .collect();
        if waypoints.is_empty() {
            return Err(PlanningError::NoWaypointsGenerated.into());
        }
        info!("Generated {} scan points", waypoints.len());

        Ok(Self { chunks, waypoints })
    }
}

/// Round to 5 decimals, the precision plot ids are keyed on.
///
/// Goes through decimal formatting, which rounds the exact binary value.
/// Scaling by 1e5 first would push values such as 12.500005 (stored just
/// below the tie) up to the next id.
fn round5(value: f64) -> f64 {
    format!("{:.5}", value).parse().unwrap_or(value)
}

fn format_degrees(value: f64) -> String {
    let rounded = round5(value);
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}

/// Stable plot identifier for a scan point, e.g. `PLOT_12.5232_76.8942`.
pub fn plot_id(waypoint: &Waypoint) -> String {
    format!(
        "PLOT_{}_{}",
        format_degrees(waypoint.latitude),
        format_degrees(waypoint.longitude)
    )
}
