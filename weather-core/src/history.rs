//! Durable, de-duplicated list of searched cities.
//!
//! The whole collection lives in a single JSON document that is re-read on
//! every call and fully rewritten on every mutation. There is no locking:
//! concurrent mutations race and the last writer wins.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{WeatherError, model::City};

pub const HISTORY_FILE_NAME: &str = "searchHistory.json";

#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
    file: PathBuf,
}

impl HistoryStore {
    /// Store backed by `<dir>/searchHistory.json`. Nothing is touched on disk
    /// until the first mutation.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let file = dir.join(HISTORY_FILE_NAME);
        Self { dir, file }
    }

    pub fn file_path(&self) -> &Path {
        &self.file
    }

    /// All stored cities, oldest first.
    ///
    /// A missing, unreadable or malformed document reads as an empty history.
    pub async fn list(&self) -> Vec<City> {
        let contents = match tokio::fs::read_to_string(&self.file).await {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %self.file.display(), error = %err, "No search history found");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(cities) => cities,
            Err(err) => {
                warn!(
                    path = %self.file.display(),
                    error = %err,
                    "Search history is not valid JSON, treating it as empty"
                );
                Vec::new()
            }
        }
    }

    /// Append `name` unless a city with the same name (ignoring case) exists.
    ///
    /// Returns the new record, or `None` when the name was already present.
    pub async fn add(&self, name: &str) -> Result<Option<City>, WeatherError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WeatherError::BadRequest("City name is required".into()));
        }

        let mut cities = self.list().await;

        if cities.iter().any(|c| c.matches_name(name)) {
            debug!(city = name, "City already exists in history");
            return Ok(None);
        }

        let city = City::new(name);
        cities.push(city.clone());
        self.write(&cities).await?;

        info!(city = %city.name, id = %city.id, "Saved city to history");
        Ok(Some(city))
    }

    /// Delete the city with identifier `id`.
    pub async fn remove(&self, id: &str) -> Result<(), WeatherError> {
        let mut cities = self.list().await;
        let before = cities.len();

        cities.retain(|c| c.id != id);

        if cities.len() == before {
            return Err(WeatherError::HistoryEntryNotFound(id.to_string()));
        }

        self.write(&cities).await?;

        info!(id, "Removed city from history");
        Ok(())
    }

    async fn write(&self, cities: &[City]) -> Result<(), WeatherError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            WeatherError::Storage(format!(
                "Failed to create history directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let json = serde_json::to_string_pretty(cities)
            .map_err(|e| WeatherError::Storage(format!("Failed to serialize history: {e}")))?;

        tokio::fs::write(&self.file, json).await.map_err(|e| {
            WeatherError::Storage(format!(
                "Failed to write history file {}: {e}",
                self.file.display()
            ))
        })
    }
}
