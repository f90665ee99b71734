use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{error::Error as StdError, time::Duration};

use crate::{
    config::DEFAULT_BASE_URL,
    error::{AppError, FailureCause},
    model::WeatherRecord,
};

use super::WeatherClient;

const INVALID_KEY_MSG: &str = "Invalid API key. Please verify your OpenWeatherMap API key is correct and activated. New keys may take up to 2 hours to activate.";
const CITY_NOT_FOUND_MSG: &str = "City not found. Please check the city name.";
const RATE_LIMITED_MSG: &str = "API rate limit exceeded. Please try again later.";
const NO_INTERNET_MSG: &str =
    "No internet connection. Please check your network settings and try again.";
const TIMEOUT_MSG: &str = "Connection timeout. Please check your internet connection and try again.";
const UNKNOWN_MSG: &str = "Unknown error occurred";

/// Client for the OpenWeatherMap current-weather endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    units: String,
    http: Client,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClientBuilder {
    api_key: String,
    base_url: String,
    units: String,
    timeout: Duration,
}

impl OpenWeatherClientBuilder {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> anyhow::Result<OpenWeatherClient> {
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(OpenWeatherClient {
            api_key: self.api_key,
            base_url: self.base_url,
            units: self.units,
            http,
        })
    }
}

impl OpenWeatherClient {
    pub fn builder(api_key: String) -> OpenWeatherClientBuilder {
        OpenWeatherClientBuilder {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: "metric".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_current(&self, city: &str) -> Result<WeatherRecord, AppError> {
        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        if !status.is_success() {
            tracing::debug!(%status, body = %truncate_body(&body), "OpenWeather request rejected");
            return Err(status_error(status));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::unknown(format!("Failed to parse weather response: {e}"))
                .with_cause(FailureCause::Decode(e.to_string()))
        })?;

        Ok(parsed.into_record())
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwCurrentResponse {
    fn into_record(self) -> WeatherRecord {
        let (condition, description) = match self.weather.into_iter().next() {
            Some(w) => (w.main, w.description),
            None => ("Unknown".to_string(), String::new()),
        };

        WeatherRecord {
            city_name: self.name,
            temperature_c: self.main.temp,
            condition,
            description,
            humidity_pct: self.main.humidity,
            wind_speed_mps: self.wind.speed,
            observed_at: self.dt,
        }
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, AppError> {
        let result = self.fetch_current(city).await;
        if let Err(err) = &result {
            tracing::warn!(city, status = err.status(), "weather fetch failed: {err}");
        }
        result
    }
}

fn status_error(status: StatusCode) -> AppError {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Unknown").to_string();

    let message = match code {
        401 => INVALID_KEY_MSG.to_string(),
        404 => CITY_NOT_FOUND_MSG.to_string(),
        429 => RATE_LIMITED_MSG.to_string(),
        _ => format!("HTTP error {code}: {reason}"),
    };

    AppError::network(message)
        .with_status(code)
        .with_cause(FailureCause::Http { status: code, reason })
}

fn transport_error(err: reqwest::Error) -> AppError {
    let detail = root_cause(&err);

    if err.is_timeout() {
        return AppError::network(TIMEOUT_MSG).with_cause(FailureCause::Timeout);
    }

    if is_host_resolution_failure(&err) {
        return AppError::network(NO_INTERNET_MSG).with_cause(FailureCause::HostResolution(detail));
    }

    if err.is_connect() || err.is_request() || err.is_body() {
        return AppError::network(format!("Network error: {detail}"))
            .with_cause(FailureCause::Io(detail));
    }

    if err.is_decode() {
        return AppError::unknown(format!("Failed to parse weather response: {detail}"))
            .with_cause(FailureCause::Decode(detail));
    }

    let message = if detail.is_empty() { UNKNOWN_MSG.to_string() } else { detail.clone() };
    AppError::unknown(message).with_cause(FailureCause::Fault(detail))
}

/// hyper reports resolver failures as "dns error" wrapping the platform message.
fn is_host_resolution_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string().to_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
            || text.contains("no such host")
        {
            return true;
        }
        current = e.source();
    }
    false
}

fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
