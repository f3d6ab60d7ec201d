use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    WeatherError,
    config::DEFAULT_API_BASE_URL,
    model::{Coordinates, WeatherReport, WeatherSnapshot},
};

use super::WeatherProvider;

/// The feed has 3-hour resolution, so every 8th entry is one day later.
const ENTRIES_PER_DAY: usize = 8;
const FORECAST_DAYS: usize = 5;

/// A geocoder match: the confirmed city name and where it is.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCity {
    pub name: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            api_key,
            base_url,
            http: Client::new(),
        }
    }

    /// Look up the first geocoder match for `city`.
    #[instrument(skip(self), level = "debug")]
    pub async fn geocode(&self, city: &str) -> Result<ResolvedCity, WeatherError> {
        let url = format!("{}/geo/1.0/direct", self.base_url);

        let matches: Vec<OwGeoMatch> = self
            .get_json(
                &url,
                &[("q", city), ("limit", "1"), ("appid", self.api_key.as_str())],
                "geocoding",
            )
            .await?;

        let first = matches
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::CityNotFound(city.to_string()))?;

        let name = first
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| city.trim().to_string());

        Ok(ResolvedCity {
            name,
            coordinates: Coordinates { lat: first.lat, lon: first.lon },
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_forecast(&self, coords: Coordinates) -> Result<OwForecastResponse, WeatherError> {
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();

        self.get_json(
            &url,
            &[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "imperial"),
            ],
            "forecast",
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, WeatherError> {
        let res = self.http.get(url).query(query).send().await.map_err(|e| {
            WeatherError::Provider(format!("Failed to send {what} request to OpenWeather: {e}"))
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            WeatherError::Provider(format!("Failed to read OpenWeather {what} response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(WeatherError::Provider(format!(
                "OpenWeather {what} request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::Provider(format!("Failed to parse OpenWeather {what} JSON: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoMatch {
    name: Option<String>,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    /// Shift from UTC in seconds.
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: Option<i64>,
    main: Option<OwMain>,
    weather: Option<Vec<OwWeather>>,
    wind: Option<OwWind>,
}

/// Entries stay raw so that a malformed entry only affects itself.
#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: Option<OwCity>,
    list: Vec<Value>,
}

impl OwForecastEntry {
    /// `None` when the entry is malformed or incomplete.
    fn snapshot_from(raw: &Value, city: &str, utc_offset_secs: i32) -> Option<WeatherSnapshot> {
        let entry = OwForecastEntry::deserialize(raw).ok()?;
        entry.to_snapshot(city, utc_offset_secs)
    }

    /// `None` when any field a snapshot needs is absent.
    fn to_snapshot(&self, city: &str, utc_offset_secs: i32) -> Option<WeatherSnapshot> {
        let main = self.main.as_ref()?;
        let weather = self.weather.as_ref()?.first()?;

        Some(WeatherSnapshot {
            city: city.to_string(),
            date: format_date(self.dt?, utc_offset_secs)?,
            temperature: main.temp?,
            humidity: main.humidity?,
            wind_speed: self.wind.as_ref()?.speed?,
            weather_icon: icon_url(weather.icon.as_deref()?),
            description: weather.description.clone()?,
        })
    }
}

/// Reduce the raw feed to the first entry plus one entry per day.
fn build_report(
    feed: &OwForecastResponse,
    city: &str,
) -> Result<WeatherReport, WeatherError> {
    let offset = feed.city.as_ref().and_then(|c| c.timezone).unwrap_or(0);

    let first = feed
        .list
        .first()
        .ok_or_else(|| WeatherError::Provider("OpenWeather forecast contained no data".into()))?;

    let current = OwForecastEntry::snapshot_from(first, city, offset).ok_or_else(|| {
        WeatherError::Provider("OpenWeather forecast entry is missing required fields".into())
    })?;

    Ok(WeatherReport {
        current,
        forecast: build_forecast(&feed.list, city, offset),
    })
}

/// Pick entries 0, 8, 16, 24 and 32, skipping incomplete ones.
fn build_forecast(entries: &[Value], city: &str, utc_offset_secs: i32) -> Vec<WeatherSnapshot> {
    entries
        .iter()
        .enumerate()
        .step_by(ENTRIES_PER_DAY)
        .take(FORECAST_DAYS)
        .filter_map(|(index, entry)| {
            let snapshot = OwForecastEntry::snapshot_from(entry, city, utc_offset_secs);
            if snapshot.is_none() {
                warn!(index, "Skipping incomplete forecast entry");
            }
            snapshot
        })
        .collect()
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get_weather(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        info!(city, "Fetching weather");

        let resolved = self.geocode(city).await?;
        debug!(
            name = %resolved.name,
            lat = resolved.coordinates.lat,
            lon = resolved.coordinates.lon,
            "Resolved city"
        );

        let feed = self.fetch_forecast(resolved.coordinates).await?;
        debug!(entries = feed.list.len(), "Received forecast feed");

        build_report(&feed, &resolved.name)
    }
}

fn icon_url(code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{code}@2x.png")
}

fn format_date(ts: i64, utc_offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(utc_offset_secs).or_else(|| FixedOffset::east_opt(0))?;
    let utc = DateTime::from_timestamp(ts, 0)?;

    Some(utc.with_timezone(&offset).format("%-m/%-d/%Y").to_string())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 2025-03-14T12:00:00Z
    const START: i64 = 1_741_953_600;

    fn raw_entry(index: usize) -> Value {
        json!({
            "dt": START + (index as i64) * 3 * 3600,
            "main": { "temp": 40.0 + index as f64, "humidity": 50 },
            "weather": [{ "icon": "01d", "description": format!("entry {index}") }],
            "wind": { "speed": 5.5 },
        })
    }

    fn raw_feed(count: usize) -> Value {
        json!({
            "city": { "name": "Boston", "timezone": 0 },
            "list": (0..count).map(raw_entry).collect::<Vec<_>>(),
        })
    }

    fn parse_feed(value: Value) -> OwForecastResponse {
        serde_json::from_value(value).expect("feed should parse")
    }

    #[test]
    fn forecast_picks_one_entry_per_day() {
        let feed = parse_feed(raw_feed(40));

        let forecast = build_forecast(&feed.list, "Boston", 0);

        let picked: Vec<_> = forecast.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(picked, ["entry 0", "entry 8", "entry 16", "entry 24", "entry 32"]);
    }

    #[test]
    fn forecast_never_exceeds_five_days() {
        let feed = parse_feed(raw_feed(56));
        assert_eq!(build_forecast(&feed.list, "Boston", 0).len(), 5);
    }

    #[test]
    fn forecast_from_short_feed_is_shorter() {
        let feed = parse_feed(raw_feed(10));
        let forecast = build_forecast(&feed.list, "Boston", 0);

        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast[1].description, "entry 8");
    }

    #[test]
    fn forecast_skips_entry_without_description() {
        let mut value = raw_feed(40);
        value["list"][16]["weather"][0]
            .as_object_mut()
            .expect("weather object")
            .remove("description");
        let feed = parse_feed(value);

        let forecast = build_forecast(&feed.list, "Boston", 0);

        let picked: Vec<_> = forecast.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(picked, ["entry 0", "entry 8", "entry 24", "entry 32"]);
    }

    #[test]
    fn forecast_skips_entry_with_empty_weather_array() {
        let mut value = raw_feed(40);
        value["list"][8]["weather"] = json!([]);
        let feed = parse_feed(value);

        assert_eq!(build_forecast(&feed.list, "Boston", 0).len(), 4);
    }

    #[test]
    fn snapshot_renders_icon_url_and_date() {
        let feed = parse_feed(raw_feed(1));
        let snapshot =
            OwForecastEntry::snapshot_from(&feed.list[0], "Boston", 0).expect("complete entry");

        assert_eq!(snapshot.weather_icon, "https://openweathermap.org/img/wn/01d@2x.png");
        assert_eq!(snapshot.date, "3/14/2025");
        assert_eq!(snapshot.temperature, 40.0);
        assert_eq!(snapshot.humidity, 50);
        assert_eq!(snapshot.wind_speed, 5.5);
    }

    #[test]
    fn date_uses_city_utc_offset() {
        // 2025-03-14T23:00:00Z is already March 15 at UTC+3.
        let ts = START + 11 * 3600;
        assert_eq!(format_date(ts, 0).as_deref(), Some("3/14/2025"));
        assert_eq!(format_date(ts, 3 * 3600).as_deref(), Some("3/15/2025"));
    }

    #[test]
    fn report_fails_when_first_entry_is_incomplete() {
        let mut value = raw_feed(3);
        value["list"][0]
            .as_object_mut()
            .expect("entry object")
            .remove("main");
        let feed = parse_feed(value);

        let err = build_report(&feed, "Boston").unwrap_err();
        assert!(matches!(err, WeatherError::Provider(_)));
    }

    #[test]
    fn malformed_unselected_entry_does_not_fail_report() {
        let mut value = raw_feed(40);
        value["list"][3]["main"]["humidity"] = json!("n/a");
        let feed = parse_feed(value);

        let report = build_report(&feed, "Boston").expect("report");
        assert_eq!(report.forecast.len(), 5);
    }

    #[test]
    fn malformed_selected_entry_is_skipped() {
        let mut value = raw_feed(40);
        value["list"][24]["main"]["humidity"] = json!("n/a");
        let feed = parse_feed(value);

        let forecast = build_forecast(&feed.list, "Boston", 0);

        let picked: Vec<_> = forecast.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(picked, ["entry 0", "entry 8", "entry 16", "entry 32"]);
    }

    #[test]
    fn malformed_first_entry_fails_report() {
        let mut value = raw_feed(9);
        value["list"][0]["dt"] = json!("yesterday");
        let feed = parse_feed(value);

        let err = build_report(&feed, "Boston").unwrap_err();
        assert!(matches!(err, WeatherError::Provider(_)));
    }

    #[test]
    fn report_fails_on_empty_feed() {
        let feed = parse_feed(raw_feed(0));
        let err = build_report(&feed, "Boston").unwrap_err();
        assert!(matches!(err, WeatherError::Provider(_)));
    }

    #[test]
    fn truncate_body_limits_long_bodies() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }

    async fn mount_geocode(server: &MockServer, body: Value) {
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("limit", "1"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn get_weather_geocodes_then_fetches_forecast() {
        let server = MockServer::start().await;
        mount_geocode(
            &server,
            json!([{ "name": "Boston", "lat": 42.36, "lon": -71.06, "country": "US" }]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("lat", "42.36"))
            .and(query_param("lon", "-71.06"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(raw_feed(40)))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let report = provider.get_weather("boston").await.expect("report");

        assert_eq!(report.current.city, "Boston");
        assert_eq!(report.current.description, "entry 0");
        assert_eq!(report.forecast.len(), 5);
        assert!(report.forecast.iter().all(|s| s.city == "Boston"));
    }

    #[tokio::test]
    async fn unknown_city_is_not_found() {
        let server = MockServer::start().await;
        mount_geocode(&server, json!([])).await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let err = provider.get_weather("Zzzzznotacity").await.unwrap_err();

        assert!(matches!(err, WeatherError::CityNotFound(ref c) if c == "Zzzzznotacity"));
    }

    #[tokio::test]
    async fn geocode_falls_back_to_input_name() {
        let server = MockServer::start().await;
        mount_geocode(&server, json!([{ "lat": 1.0, "lon": 2.0 }])).await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let resolved = provider.geocode(" Springfield ").await.expect("resolved");

        assert_eq!(resolved.name, "Springfield");
        assert_eq!(resolved.coordinates, Coordinates { lat: 1.0, lon: 2.0 });
    }

    #[tokio::test]
    async fn upstream_error_status_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let err = provider.get_weather("Boston").await.unwrap_err();

        match err {
            WeatherError::Provider(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("Invalid API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn forecast_without_list_is_provider_error() {
        let server = MockServer::start().await;
        mount_geocode(&server, json!([{ "name": "Boston", "lat": 42.36, "lon": -71.06 }])).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cod": "200" })))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), server.uri());
        let err = provider.get_weather("Boston").await.unwrap_err();

        assert!(matches!(err, WeatherError::Provider(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_provider_error() {
        // Nothing listens on port 9 locally.
        let provider = OpenWeatherProvider::with_base_url("KEY".into(), "http://127.0.0.1:9");
        let err = provider.get_weather("Boston").await.unwrap_err();

        assert!(matches!(err, WeatherError::Provider(_)));
    }
}
