use chrono::Local;
use dashboard_core::{Activity, UiState, WeatherRecord};

pub fn record_line(record: &WeatherRecord) -> String {
    let mut line = format!(
        "{}: {:.1}°C {}",
        record.city_name, record.temperature_c, record.condition
    );
    if !record.description.is_empty() {
        line.push_str(&format!(" ({})", record.description));
    }
    line.push_str(&format!(
        ", humidity {}%, wind {:.1} m/s",
        record.humidity_pct, record.wind_speed_mps
    ));
    line
}

/// One status line per snapshot.
pub fn state_line(city: &str, state: &UiState) -> String {
    let mut parts = vec![format!("[{city}]")];

    match state.activity {
        Activity::Loading => parts.push("loading...".to_string()),
        Activity::Refreshing => parts.push("refreshing...".to_string()),
        Activity::Updating | Activity::Idle => {}
    }

    match &state.weather {
        Some(record) => parts.push(record_line(record)),
        None if !state.is_loading() => parts.push("no data".to_string()),
        None => {}
    }

    if let Some(updated) = state.last_updated {
        parts.push(format!("updated {}", updated.with_timezone(&Local).format("%H:%M:%S")));
    }

    let network = if state.network_available {
        state.connection_class.to_string()
    } else {
        "offline".to_string()
    };
    parts.push(format!("net: {network}"));

    if let Some(err) = &state.error {
        parts.push(format!("error: {err}"));
    }
    if state.show_network_dialog {
        parts.push("(!) check your connection, type `check` or `dismiss`".to_string());
    }
    if state.show_search {
        parts.push("(search open)".to_string());
    }

    parts.join(" | ")
}
