use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::model::{WeatherQuery, WeatherReport};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for a whole request, connect included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client settings used unless a caller supplies its own client.
fn default_client_builder() -> ClientBuilder {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self> {
        let http = default_client_builder()
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another deployment of the API (or a local stub).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        Url::parse(base_url)
            .with_context(|| format!("Invalid OpenWeather base URL: {base_url}"))?;

        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    fn current_weather_url(&self) -> String {
        format!("{}/weather", self.base_url)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get_weather(&self, query: &WeatherQuery) -> Result<WeatherReport> {
        debug!(city = query.city(), lang = %query.language(), "requesting current weather");

        let res = self
            .http
            .get(self.current_weather_url())
            .query(&[
                ("q", query.city()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", query.language().as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_current(&body)
    }
}

fn parse_current(body: &str) -> Result<WeatherReport> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).context("Failed to parse OpenWeather current JSON")?;

    // Only the first condition is shown; an empty list yields blank fields.
    let (condition, condition_icon) = parsed
        .weather
        .into_iter()
        .next()
        .map(|w| (w.description, w.icon))
        .unwrap_or_default();

    Ok(WeatherReport {
        location_name: parsed.name,
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        wind_speed_mps: parsed.wind.speed,
        condition,
        condition_icon,
        sunrise_unix: parsed.sys.sunrise,
        sunset_unix: parsed.sys.sunset,
    })
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    sys: OwSys,
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
