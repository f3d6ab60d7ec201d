//! Error taxonomy shared by the provider adapter, history store and request handler.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    /// Missing or blank required input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The geocoder returned no match for the city.
    #[error("City not found: {0}")]
    CityNotFound(String),

    /// No history entry carries the identifier.
    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(String),

    /// Upstream network failure, error status or malformed payload.
    #[error("Weather provider error: {0}")]
    Provider(String),

    /// History document could not be written.
    #[error("History storage error: {0}")]
    Storage(String),
}

impl WeatherError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CityNotFound(_) | Self::HistoryEntryNotFound(_))
    }

    /// User-facing message; upstream details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::CityNotFound(city) => format!("City not found: {city}"),
            Self::HistoryEntryNotFound(_) => "City not found in search history".to_string(),
            Self::Provider(_) => "Failed to fetch weather data".to_string(),
            Self::Storage(_) => "Failed to update search history".to_string(),
        }
    }
}
