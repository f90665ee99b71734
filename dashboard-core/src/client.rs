use async_trait::async_trait;
use std::fmt::Debug;

use crate::{AppError, Config, WeatherRecord, client::openweather::OpenWeatherClient};

pub mod openweather;

/// One network round trip that turns a city name into current weather.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, AppError>;
}

/// Construct the OpenWeatherMap client described by `config`.
pub fn client_from_config(config: &Config) -> anyhow::Result<OpenWeatherClient> {
    let api_key = config.require_api_key()?;
    OpenWeatherClient::builder(api_key)
        .base_url(&config.base_url)
        .units(&config.units)
        .timeout(config.request_timeout())
        .build()
}
