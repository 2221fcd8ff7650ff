use crate::{Config, WeatherQuery, WeatherReport, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Source of current weather for a single query.
///
/// Implementations may fail for any reason (transport, status, parsing); callers
/// are not expected to tell those apart.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, query: &WeatherQuery) -> anyhow::Result<WeatherReport>;
}

/// Construct the OpenWeather client from resolved configuration.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.require_api_key()?;

    let mut provider = OpenWeatherProvider::new(api_key)?;
    if let Some(base_url) = config.base_url.as_deref() {
        provider = provider.with_base_url(base_url)?;
    }

    Ok(Arc::new(provider))
}
