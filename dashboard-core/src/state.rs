use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    model::{ConnectionClass, WeatherRecord},
};

/// What the store is currently doing about weather data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    /// First fetch, nothing to show yet.
    Loading,
    /// User-requested refresh.
    Refreshing,
    /// Fetch over existing data that the UI does not announce.
    Updating,
}

/// Committed snapshot of the dashboard.
///
/// Values are replaced wholesale on every transition; subscribers only ever
/// see complete snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    /// Last successfully fetched weather. Failures never clear it.
    pub weather: Option<WeatherRecord>,
    pub activity: Activity,
    pub error: Option<AppError>,
    pub last_updated: Option<DateTime<Utc>>,
    pub network_available: bool,
    pub connection_class: ConnectionClass,
    pub show_network_dialog: bool,
    pub show_search: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            weather: None,
            activity: Activity::Idle,
            error: None,
            last_updated: None,
            network_available: true,
            connection_class: ConnectionClass::None,
            show_network_dialog: false,
            show_search: false,
        }
    }
}

impl UiState {
    pub fn is_loading(&self) -> bool {
        self.activity == Activity::Loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.activity == Activity::Refreshing
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_data(&self) -> bool {
        self.weather.is_some() && !self.is_loading() && !self.is_refreshing()
    }

    pub fn is_slow_connection(&self) -> bool {
        self.connection_class.is_slow()
    }
}
