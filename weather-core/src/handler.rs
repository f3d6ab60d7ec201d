//! Request handling shared by the HTTP server and the CLI.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    Config, WeatherError,
    history::HistoryStore,
    model::{City, WeatherReport},
    provider::{WeatherProvider, provider_from_config},
};

#[derive(Debug, Clone)]
pub struct RequestHandler {
    provider: Arc<dyn WeatherProvider>,
    history: HistoryStore,
}

impl RequestHandler {
    pub fn new(provider: Arc<dyn WeatherProvider>, history: HistoryStore) -> Self {
        Self { provider, history }
    }

    /// Wire the configured provider and history directory.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = provider_from_config(config)?;
        let history = HistoryStore::new(config.history_dir());
        Ok(Self::new(Arc::from(provider), history))
    }

    /// Look up weather for `city` and record the resolved name in the history.
    ///
    /// Recording is best-effort: a storage failure is logged and the report is
    /// still returned.
    pub async fn search(&self, city: Option<&str>) -> Result<WeatherReport, WeatherError> {
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| WeatherError::BadRequest("City name is required".into()))?;

        let report = self
            .provider
            .get_weather(city)
            .await
            .inspect_err(|err| error!(city, error = %err, "Weather lookup failed"))?;

        info!(city = %report.current.city, days = report.forecast.len(), "Weather lookup succeeded");

        if let Err(err) = self.history.add(&report.current.city).await {
            warn!(city = %report.current.city, error = %err, "Could not record city in search history");
        }

        Ok(report)
    }

    pub async fn list_history(&self) -> Vec<City> {
        self.history.list().await
    }

    pub async fn delete_history(&self, id: &str) -> Result<(), WeatherError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(WeatherError::BadRequest("History entry id is required".into()));
        }

        self.history
            .remove(id)
            .await
            .inspect_err(|err| error!(id, error = %err, "Failed to delete history entry"))
    }
}
