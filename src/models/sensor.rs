//! Sensor types: deployed measurement nodes and their last reported status.

use serde::{Deserialize, Serialize};

/// A `[lat, lon]` pair as the locations route reports it
pub type LatLon = (f64, f64);

/// Last status report a sensor phoned home with.
/// Most fields are optional - a sensor that never reported them simply
/// doesn't have them, and the display layer substitutes a placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorStatus {
    pub status_time: i64,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub os_version: Option<String>,
    pub temperature_celsius: Option<f64>,
    #[serde(rename = "Ethernet")]
    pub ethernet: Option<String>,
    #[serde(rename = "WiFi")]
    pub wifi: Option<String>,
    #[serde(rename = "LTE")]
    pub lte: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    pub id: i64,
    pub sensor_name: String,
    #[serde(default)]
    pub jobs: Vec<String>,
    pub status: SensorStatus,
}

/// Sensor positions split by liveness, from GET /sensors/get_locations.
/// The route answers `data: [online, offline]`.
#[derive(Debug, Clone, Default)]
pub struct SensorLocations {
    pub online: Vec<LatLon>,
    pub offline: Vec<LatLon>,
}

impl SensorLocations {
    pub fn from_data(data: &serde_json::Value) -> Option<Self> {
        let pair = data.as_array()?;
        if pair.len() != 2 {
            return None;
        }
        let online: Vec<LatLon> = serde_json::from_value(pair[0].clone()).ok()?;
        let offline: Vec<LatLon> = serde_json::from_value(pair[1].clone()).ok()?;
        Some(Self { online, offline })
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty() && self.offline.is_empty()
    }
}
