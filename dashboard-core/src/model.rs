use serde::{Deserialize, Serialize};

/// Current weather for one city, normalized from a provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city_name: String,
    pub temperature_c: f64,
    /// Short label, e.g. "Clouds".
    pub condition: String,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    /// Observation timestamp as reported by the provider.
    pub observed_at: i64,
}

/// Transport class of the active network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionClass {
    #[default]
    None,
    Wifi,
    Mobile,
    Ethernet,
    Unknown,
}

impl ConnectionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionClass::None => "none",
            ConnectionClass::Wifi => "wifi",
            ConnectionClass::Mobile => "mobile",
            ConnectionClass::Ethernet => "ethernet",
            ConnectionClass::Unknown => "unknown",
        }
    }

    /// Mobile and unidentified transports are treated as unreliable.
    pub fn is_slow(&self) -> bool {
        matches!(self, ConnectionClass::Mobile | ConnectionClass::Unknown)
    }
}

impl std::fmt::Display for ConnectionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConnectionClass {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "none" => Ok(ConnectionClass::None),
            "wifi" => Ok(ConnectionClass::Wifi),
            "mobile" => Ok(ConnectionClass::Mobile),
            "ethernet" => Ok(ConnectionClass::Ethernet),
            "unknown" => Ok(ConnectionClass::Unknown),
            _ => Err(anyhow::anyhow!(
                "Unknown connection class '{value}'. Supported: none, wifi, mobile, ethernet, unknown."
            )),
        }
    }
}

/// Point-in-time connectivity as reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub connected: bool,
    pub class: ConnectionClass,
}

impl NetworkStatus {
    pub const OFFLINE: NetworkStatus = NetworkStatus { connected: false, class: ConnectionClass::None };

    pub fn online(class: ConnectionClass) -> Self {
        Self { connected: true, class }
    }

    /// Connected, but over a transport considered unreliable.
    pub fn is_slow(&self) -> bool {
        self.connected && self.class.is_slow()
    }

    /// Anything that should prompt the user about connectivity.
    pub fn is_degraded(&self) -> bool {
        self.class == ConnectionClass::None || !self.connected || self.is_slow()
    }
}
