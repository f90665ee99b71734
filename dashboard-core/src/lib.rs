//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - The dashboard state store and its periodic refresh
//! - Contracts for the weather client and the connectivity probe, with an
//!   OpenWeatherMap client and a TCP reachability probe
//! - City search on top of the weather client
//! - Configuration handling
//!
//! It is used by `dashboard-cli`, but can be embedded by any front end that
//! renders [`UiState`] snapshots.

pub mod client;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod search;
pub mod state;
pub mod store;

pub use client::{WeatherClient, client_from_config, openweather::OpenWeatherClient};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use connectivity::{
    ConnectivityEvents, ConnectivityProbe, ManualProbe, ReachabilityMonitor, probe_reachability,
};
pub use error::{AppError, FailureCause};
pub use model::{ConnectionClass, NetworkStatus, WeatherRecord};
pub use scheduler::RefreshScheduler;
pub use search::SearchCoordinator;
pub use state::{Activity, UiState};
pub use store::{StoreOptions, WeatherStore};
