use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A previously searched city, as stored in the history document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
}

impl City {
    /// Create a city record with a freshly generated identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
        }
    }

    /// Case-insensitive name comparison used for de-duplication.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Latitude/longitude in degrees, as returned by the geocoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One normalized weather observation (the current conditions or one forecast day).
///
/// Field names are serialized in camelCase for the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub city: String,
    /// Human-readable local date, e.g. `3/14/2025`.
    pub date: String,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: u8,
    /// Miles per hour.
    pub wind_speed: f64,
    /// Display-ready icon URL.
    pub weather_icon: String,
    pub description: String,
}

/// Result of a city search: current conditions plus up to five daily samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: WeatherSnapshot,
    pub forecast: Vec<WeatherSnapshot>,
}
