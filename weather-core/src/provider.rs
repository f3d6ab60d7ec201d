use crate::{Config, WeatherError, WeatherReport, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of normalized weather reports for a city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Resolve `city` and return its current conditions plus a daily forecast.
    ///
    /// Fails with [`WeatherError::CityNotFound`] when the city cannot be geocoded
    /// and with [`WeatherError::Provider`] on any upstream failure.
    async fn get_weather(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.require_api_key()?;

    let provider =
        OpenWeatherProvider::with_base_url(api_key.to_owned(), config.api_base_url());

    Ok(Box::new(provider))
}
