use std::sync::Arc;

use tokio::task::JoinError;

use crate::{
    client::WeatherClient,
    connectivity::ConnectivityProbe,
    error::{AppError, FailureCause},
    model::WeatherRecord,
};

/// Queries shorter than this return no results without touching the network.
pub const MIN_QUERY_LEN: usize = 2;

/// Validates a city name by fetching its weather.
#[derive(Debug, Clone)]
pub struct SearchCoordinator {
    client: Arc<dyn WeatherClient>,
    probe: Arc<dyn ConnectivityProbe>,
}

impl SearchCoordinator {
    pub fn new(client: Arc<dyn WeatherClient>, probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self { client, probe }
    }

    /// At most one record. A city the provider rejects is "no results", not an
    /// error; only missing connectivity or a fault inside the client is.
    pub async fn search(&self, query: &str) -> Result<Vec<WeatherRecord>, AppError> {
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        if !self.probe.current_status().connected {
            return Err(AppError::network("No internet connection available"));
        }

        let client = Arc::clone(&self.client);
        let city = query.to_string();
        let outcome = tokio::spawn(async move { client.fetch(&city).await }).await;

        match outcome {
            Ok(Ok(record)) => Ok(vec![record]),
            Ok(Err(err)) => {
                tracing::debug!(query, status = err.status(), "search found nothing: {err}");
                Ok(Vec::new())
            }
            Err(fault) => {
                tracing::warn!(query, "search aborted: {fault}");
                let detail = fault.to_string();
                let message = fault_message(fault).unwrap_or_else(|| FAULT_FALLBACK.to_string());
                Err(AppError::network(message).with_cause(FailureCause::Fault(detail)))
            }
        }
    }
}

const FAULT_FALLBACK: &str = "Error searching for city";

/// The text a panicking client left behind, if it left any.
fn fault_message(fault: JoinError) -> Option<String> {
    if !fault.is_panic() {
        return None;
    }
    let payload = fault.into_panic();
    let text = match payload.downcast::<String>() {
        Ok(text) => *text,
        Err(payload) => (*payload.downcast::<&'static str>().ok()?).to_string(),
    };
    (!text.is_empty()).then_some(text)
}
