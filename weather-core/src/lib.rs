//! Core library for the `weather` dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather adapter that normalizes the forecast feed
//! - The on-disk search history
//! - Request handling shared by the HTTP server and the CLI
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod handler;
pub mod history;
pub mod model;
pub mod provider;

pub use config::Config;
pub use error::WeatherError;
pub use handler::RequestHandler;
pub use history::HistoryStore;
pub use model::{City, Coordinates, WeatherReport, WeatherSnapshot};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
