//! Shared fakes for store and search tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Semaphore;

use dashboard_core::{
    AppError, Clock, ConnectionClass, FailureCause, ManualProbe, NetworkStatus, StoreOptions,
    WeatherClient, WeatherRecord, WeatherStore,
};

pub const FIXED_NOW_SECS: i64 = 1_700_000_000;

#[derive(Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(FIXED_NOW_SECS, 0).expect("valid timestamp")
}

/// Weather client answering from a per-city script. Unscripted cities get a 404.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    responses: Mutex<HashMap<String, Result<WeatherRecord, AppError>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, city: &str, response: Result<WeatherRecord, AppError>) {
        self.responses.lock().insert(city.to_string(), response);
    }

    pub fn succeed(&self, city: &str) {
        self.respond(city, Ok(record(city, 18.5)));
    }

    pub fn succeed_with(&self, city: &str, temperature_c: f64) {
        self.respond(city, Ok(record(city, temperature_c)));
    }

    /// Hold fetches for `city` until [`ScriptedClient::release`] is called.
    pub fn hold(&self, city: &str) {
        self.gates.lock().insert(city.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, city: &str) {
        if let Some(gate) = self.gates.lock().remove(city) {
            gate.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl WeatherClient for ScriptedClient {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, AppError> {
        self.calls.lock().push(city.to_string());

        let gate = self.gates.lock().get(city).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }

        self.responses
            .lock()
            .get(city)
            .cloned()
            .unwrap_or_else(|| Err(not_found()))
    }
}

pub fn record(city: &str, temperature_c: f64) -> WeatherRecord {
    WeatherRecord {
        city_name: city.to_string(),
        temperature_c,
        condition: "Clouds".to_string(),
        description: "overcast clouds".to_string(),
        humidity_pct: 60,
        wind_speed_mps: 3.6,
        observed_at: 1_700_000_000_000,
    }
}

pub fn http_error(status: u16, message: &str, reason: &str) -> AppError {
    AppError::network(message)
        .with_status(status)
        .with_cause(FailureCause::Http { status, reason: reason.to_string() })
}

pub fn not_found() -> AppError {
    http_error(404, "City not found. Please check the city name.", "Not Found")
}

pub fn unauthorized() -> AppError {
    http_error(
        401,
        "Invalid API key. Please verify your OpenWeatherMap API key is correct and activated.",
        "Unauthorized",
    )
}

pub fn timeout() -> AppError {
    AppError::network("Connection timeout. Please check your internet connection and try again.")
        .with_cause(FailureCause::Timeout)
}

pub fn wifi() -> NetworkStatus {
    NetworkStatus::online(ConnectionClass::Wifi)
}

pub fn probe(status: NetworkStatus) -> Arc<ManualProbe> {
    Arc::new(ManualProbe::new(status))
}

pub fn create_store(client: &Arc<ScriptedClient>, probe: &Arc<ManualProbe>) -> WeatherStore {
    WeatherStore::create(
        client.clone(),
        probe.clone(),
        StoreOptions { clock: Arc::new(FixedClock(fixed_now())), ..StoreOptions::default() },
    )
}

/// Let spawned tasks run without letting paused time auto-advance.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
