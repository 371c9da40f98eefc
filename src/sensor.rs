use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::geometry::Coordinate;
use crate::store::Details;

/// Source of the readings attached to each scan point.
#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn read(&self, plot_id: &str, position: Coordinate) -> Result<Details>;
}

/// Reports where the reading was taken and nothing else. Real sensors plug in
/// through [`SensorSource`].
#[derive(Debug, Default, Clone)]
pub struct LocationSensor;

#[async_trait]
impl SensorSource for LocationSensor {
    async fn read(&self, _plot_id: &str, position: Coordinate) -> Result<Details> {
        let mut details = Details::new();
        details.insert("lat".to_string(), json!(position.latitude));
        details.insert("lon".to_string(), json!(position.longitude));
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_location_sensor_reports_position() -> Result<()> {
        let details = LocationSensor
            .read("PLOT_1.0_2.0", Coordinate::new(1.0, 2.0))
            .await?;
        assert_eq!(details["lat"], 1.0);
        assert_eq!(details["lon"], 2.0);
        Ok(())
    }
}
