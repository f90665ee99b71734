//! The dashboard state store.
//!
//! Every intent, timer tick and connectivity event funnels through one lock
//! around [`Core`]. Each transition ends by publishing a fresh [`UiState`]
//! snapshot on a `watch` channel.

use parking_lot::Mutex;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    client::WeatherClient,
    clock::{Clock, SystemClock},
    config::{Config, DEFAULT_CITIES},
    connectivity::{ConnectivityEvents, ConnectivityProbe},
    error::AppError,
    model::{NetworkStatus, WeatherRecord},
    scheduler::{AUTO_REFRESH_INTERVAL, RefreshScheduler},
    search::SearchCoordinator,
    state::{Activity, UiState},
};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub initial_city: String,
    pub refresh_interval: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            initial_city: DEFAULT_CITIES[0].to_string(),
            refresh_interval: AUTO_REFRESH_INTERVAL,
            clock: Arc::new(SystemClock),
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_city: config.initial_city(),
            refresh_interval: config.refresh_interval(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Foreground,
    Manual,
    Background,
}

#[derive(Debug)]
struct Core {
    state: UiState,
    city: String,
    /// Bumped whenever earlier fetches stop being relevant.
    generation: u64,
    scheduler: RefreshScheduler,
    disposed: bool,
}

impl Core {
    /// Drop the effect of any fetch still in flight and stop showing progress.
    fn supersede_in_flight(&mut self) {
        self.generation += 1;
        self.state.activity = Activity::Idle;
    }

    fn apply_connectivity(&mut self, status: NetworkStatus) {
        self.state.network_available = status.connected;
        self.state.connection_class = status.class;
        if status.is_degraded() {
            self.state.show_network_dialog = true;
        }
    }

    fn apply_success(&mut self, record: WeatherRecord, clock: &dyn Clock) {
        self.state.weather = Some(record);
        self.state.activity = Activity::Idle;
        self.state.error = None;
        self.state.last_updated = Some(clock.now());
        self.state.network_available = true;
    }

    fn apply_failure(&mut self, err: AppError) {
        self.state.activity = Activity::Idle;
        if err.is_network_class() {
            self.state.show_network_dialog = true;
            self.state.network_available = false;
        }
        self.state.error = Some(err);
    }
}

#[derive(Debug)]
struct Shared {
    client: Arc<dyn WeatherClient>,
    probe: Arc<dyn ConnectivityProbe>,
    clock: Arc<dyn Clock>,
    search: SearchCoordinator,
    core: Mutex<Core>,
    state_tx: watch::Sender<UiState>,
    city_tx: watch::Sender<String>,
    connectivity: CancellationToken,
}

impl Shared {
    fn publish(&self, core: &Core) {
        self.state_tx.send_if_modified(|current| {
            if *current == core.state {
                false
            } else {
                *current = core.state.clone();
                true
            }
        });
        self.city_tx.send_if_modified(|current| {
            if *current == core.city {
                false
            } else {
                current.clone_from(&core.city);
                true
            }
        });
    }

    fn complete_fetch(
        &self,
        generation: u64,
        city: &str,
        outcome: Result<WeatherRecord, AppError>,
    ) {
        let mut core = self.core.lock();
        if core.disposed {
            return;
        }
        if core.generation != generation {
            tracing::debug!(city, generation, current = core.generation, "discarding superseded fetch");
            return;
        }

        match outcome {
            Ok(record) => {
                tracing::debug!(city, temperature_c = record.temperature_c, "weather updated");
                core.apply_success(record, self.clock.as_ref());
            }
            Err(err) => {
                tracing::warn!(
                    city,
                    status = err.status(),
                    network = err.is_network_class(),
                    "weather fetch failed: {err}"
                );
                core.apply_failure(err);
            }
        }
        self.publish(&core);
    }
}

/// Single source of truth for the weather dashboard.
///
/// Must be created inside a tokio runtime. Dropping the store disposes it.
#[derive(Debug)]
pub struct WeatherStore {
    shared: Arc<Shared>,
}

impl WeatherStore {
    /// Read the initial connectivity snapshot, subscribe to changes and, when
    /// online, kick off the first fetch and the auto refresh.
    pub fn create(
        client: Arc<dyn WeatherClient>,
        probe: Arc<dyn ConnectivityProbe>,
        options: StoreOptions,
    ) -> Self {
        let StoreOptions { initial_city, refresh_interval, clock } = options;

        let (state_tx, _) = watch::channel(UiState::default());
        let (city_tx, _) = watch::channel(initial_city.clone());

        let shared = Arc::new(Shared {
            search: SearchCoordinator::new(Arc::clone(&client), Arc::clone(&probe)),
            client,
            probe: Arc::clone(&probe),
            clock,
            core: Mutex::new(Core {
                state: UiState::default(),
                city: initial_city,
                generation: 0,
                scheduler: RefreshScheduler::new(refresh_interval),
                disposed: false,
            }),
            state_tx,
            city_tx,
            connectivity: CancellationToken::new(),
        });

        // Subscribe first so a change racing the snapshot is not lost.
        let events = probe.events();
        let initial = probe.current_status();
        {
            let mut core = shared.core.lock();
            core.apply_connectivity(initial);
            if initial.connected {
                issue_fetch(&shared, &mut core, FetchKind::Foreground);
                start_auto_refresh(&shared, &mut core);
            }
            shared.publish(&core);
            tracing::info!(
                city = %core.city,
                connected = initial.connected,
                class = %initial.class,
                "weather store created"
            );
        }

        spawn_connectivity_listener(
            Arc::downgrade(&shared),
            events,
            shared.connectivity.clone(),
        );

        Self { shared }
    }

    pub fn state(&self) -> UiState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.shared.state_tx.subscribe()
    }

    pub fn current_city(&self) -> String {
        self.shared.city_tx.borrow().clone()
    }

    pub fn watch_city(&self) -> watch::Receiver<String> {
        self.shared.city_tx.subscribe()
    }

    pub fn is_auto_refresh_active(&self) -> bool {
        self.shared.core.lock().scheduler.is_active()
    }

    /// Switch cities. Results still in flight for the previous city are
    /// discarded and the refresh countdown starts over.
    pub fn select_city(&self, city: &str) {
        let mut core = self.shared.core.lock();
        self.select_city_locked(&mut core, city);
        self.shared.publish(&core);
    }

    fn select_city_locked(&self, core: &mut Core, city: &str) {
        if core.disposed || core.city == city {
            return;
        }
        tracing::info!(from = %core.city, to = city, "city selected");

        core.city = city.to_string();
        core.generation += 1;
        issue_fetch(&self.shared, core, FetchKind::Foreground);
        core.scheduler.restart(refresh_tick(&self.shared));
    }

    /// User-initiated refresh. Prompts instead when offline or on a slow link,
    /// and does nothing while a load or refresh is already showing.
    pub fn refresh_weather(&self) {
        let mut core = self.shared.core.lock();
        if core.disposed {
            return;
        }

        if !core.state.network_available || core.state.is_slow_connection() {
            core.state.show_network_dialog = true;
        } else if !core.state.is_loading() && !core.state.is_refreshing() {
            issue_fetch(&self.shared, &mut core, FetchKind::Manual);
        }
        self.shared.publish(&core);
    }

    /// Clear the error and fetch again. Whatever is still in flight no longer
    /// counts, even when the retry itself cannot go out.
    pub fn retry(&self) {
        let mut core = self.shared.core.lock();
        if core.disposed {
            return;
        }

        if !core.state.network_available {
            core.supersede_in_flight();
            core.state.show_network_dialog = true;
        } else {
            core.state.error = None;
            issue_fetch(&self.shared, &mut core, FetchKind::Foreground);
        }
        self.shared.publish(&core);
    }

    /// Hides the dialog until the next adverse event; connectivity is untouched.
    pub fn dismiss_network_dialog(&self) {
        self.edit(|state| state.show_network_dialog = false);
    }

    pub fn check_network_and_retry(&self) {
        let mut core = self.shared.core.lock();
        if core.disposed {
            return;
        }

        let status = self.shared.probe.current_status();
        core.state.connection_class = status.class;
        if status.connected && !status.is_slow() {
            core.state.show_network_dialog = false;
            core.state.network_available = true;
            issue_fetch(&self.shared, &mut core, FetchKind::Foreground);
            if !core.scheduler.is_active() {
                start_auto_refresh(&self.shared, &mut core);
            }
        } else {
            tracing::info!(connected = status.connected, class = %status.class, "network still unusable");
            core.state.show_network_dialog = true;
        }
        self.shared.publish(&core);
    }

    pub fn show_search(&self) {
        self.edit(|state| state.show_search = true);
    }

    pub fn hide_search(&self) {
        self.edit(|state| state.show_search = false);
    }

    /// Look a city up without touching the dashboard state.
    pub async fn search(&self, query: &str) -> Result<Vec<WeatherRecord>, AppError> {
        self.shared.search.search(query).await
    }

    /// Adopt a search hit: close the search view and switch to its city.
    pub fn select_search_result(&self, record: &WeatherRecord) {
        let mut core = self.shared.core.lock();
        if core.disposed {
            return;
        }
        core.state.show_search = false;
        self.select_city_locked(&mut core, &record.city_name);
        self.shared.publish(&core);
    }

    /// App came to the foreground.
    pub fn on_foreground(&self) {
        let mut core = self.shared.core.lock();
        if !core.scheduler.is_active() {
            start_auto_refresh(&self.shared, &mut core);
        }
    }

    /// App went to the background. In-flight fetches still complete.
    pub fn on_background(&self) {
        self.shared.core.lock().scheduler.stop();
    }

    /// Stop the timer and the connectivity subscription. Nothing reaches the
    /// state after this returns.
    pub fn dispose(&self) {
        let mut core = self.shared.core.lock();
        if core.disposed {
            return;
        }
        core.disposed = true;
        core.generation += 1;
        core.scheduler.stop();
        self.shared.connectivity.cancel();
        tracing::info!(city = %core.city, "weather store disposed");
    }

    fn edit(&self, f: impl FnOnce(&mut UiState)) {
        let mut core = self.shared.core.lock();
        if core.disposed {
            return;
        }
        f(&mut core.state);
        self.shared.publish(&core);
    }
}

impl Drop for WeatherStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Re-check connectivity, mark the fetch in progress and spawn the request.
/// The caller publishes afterwards.
fn issue_fetch(shared: &Arc<Shared>, core: &mut Core, kind: FetchKind) {
    if core.disposed {
        return;
    }

    let status = shared.probe.current_status();
    if !status.connected {
        tracing::warn!(city = %core.city, ?kind, "skipping fetch, no connectivity");
        core.supersede_in_flight();
        core.state.show_network_dialog = true;
        core.state.network_available = false;
        core.state.connection_class = status.class;
        return;
    }
    if status.is_slow() {
        core.state.show_network_dialog = true;
        core.state.connection_class = status.class;
    }

    core.generation += 1;
    let generation = core.generation;
    let city = core.city.clone();

    core.state.activity = match kind {
        FetchKind::Manual => Activity::Refreshing,
        _ if core.state.weather.is_none() => Activity::Loading,
        _ => Activity::Updating,
    };
    core.state.error = None;
    tracing::debug!(city = %city, ?kind, generation, "fetch issued");

    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        let outcome = shared.client.fetch(&city).await;
        shared.complete_fetch(generation, &city, outcome);
    });
}

fn start_auto_refresh(shared: &Arc<Shared>, core: &mut Core) {
    if core.disposed {
        return;
    }

    core.scheduler.start(refresh_tick(shared));
}

fn refresh_tick(shared: &Arc<Shared>) -> impl Fn(&CancellationToken) -> bool + Send + 'static {
    let weak = Arc::downgrade(shared);
    move |token| {
        let Some(shared) = weak.upgrade() else {
            return false;
        };
        let mut core = shared.core.lock();
        if token.is_cancelled() || core.disposed {
            return false;
        }
        issue_fetch(&shared, &mut core, FetchKind::Background);
        shared.publish(&core);
        true
    }
}

fn spawn_connectivity_listener(
    shared: Weak<Shared>,
    mut events: ConnectivityEvents,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let status = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                status = events.next() => status,
            };
            // A probe that stops delivering leaves the store as it is.
            let Some(status) = status else { break };
            if !apply_connectivity_event(&shared, &token, status) {
                break;
            }
        }
        events.cancel();
        tracing::debug!("connectivity subscription ended");
    });
}

fn apply_connectivity_event(
    shared: &Weak<Shared>,
    token: &CancellationToken,
    status: NetworkStatus,
) -> bool {
    let Some(shared) = shared.upgrade() else {
        return false;
    };
    let mut core = shared.core.lock();
    if token.is_cancelled() || core.disposed {
        return false;
    }

    if status.is_degraded() {
        tracing::warn!(connected = status.connected, class = %status.class, "connectivity degraded");
    } else {
        tracing::info!(class = %status.class, "connectivity restored");
    }
    core.apply_connectivity(status);
    shared.publish(&core);
    true
}
