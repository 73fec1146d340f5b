use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo_point::GeoPoint;

/// One reading from the device location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy radius in meters, when the device provides one.
    pub accuracy: Option<f64>,
    /// Server-side time of receipt. Freshness checks use this.
    pub timestamp: DateTime<Utc>,
    /// Device-reported capture time. Informational only; device clocks drift.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<DateTime<Utc>>,
}

impl PositionFix {
    pub fn new(point: GeoPoint, accuracy: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            accuracy,
            timestamp,
            reported_at: None,
        }
    }

    pub fn with_reported_at(mut self, reported_at: Option<DateTime<Utc>>) -> Self {
        self.reported_at = reported_at;
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
