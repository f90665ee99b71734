use thiserror::Error;

/// What actually went wrong underneath an [`AppError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    #[error("host resolution failed: {0}")]
    HostResolution(String),

    #[error("request timed out")]
    Timeout,

    #[error("i/o failure: {0}")]
    Io(String),

    #[error("HTTP {status} {reason}")]
    Http { status: u16, reason: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("fault during request: {0}")]
    Fault(String),
}

/// Error surfaced to the dashboard state.
///
/// `status` is the HTTP status when the server answered, 0 otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("{message}")]
    Network {
        message: String,
        status: u16,
        #[source]
        cause: Option<FailureCause>,
    },

    #[error("{message}")]
    Unknown {
        message: String,
        status: u16,
        #[source]
        cause: Option<FailureCause>,
    },
}

impl AppError {
    pub fn network(message: impl Into<String>) -> Self {
        AppError::Network { message: message.into(), status: 0, cause: None }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        AppError::Unknown { message: message.into(), status: 0, cause: None }
    }

    pub fn with_status(mut self, code: u16) -> Self {
        match &mut self {
            AppError::Network { status, .. } | AppError::Unknown { status, .. } => *status = code,
        }
        self
    }

    pub fn with_cause(mut self, failure: FailureCause) -> Self {
        match &mut self {
            AppError::Network { cause, .. } | AppError::Unknown { cause, .. } => {
                *cause = Some(failure)
            }
        }
        self
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Network { message, .. } | AppError::Unknown { message, .. } => message,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            AppError::Network { status, .. } | AppError::Unknown { status, .. } => *status,
        }
    }

    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            AppError::Network { cause, .. } | AppError::Unknown { cause, .. } => cause.as_ref(),
        }
    }

    /// Whether this failure points at connectivity rather than at the request.
    ///
    /// Drives the network dialog and the availability flag after a failed fetch.
    pub fn is_network_class(&self) -> bool {
        let message = self.message().to_lowercase();
        message.contains("internet")
            || message.contains("connection")
            || matches!(self.cause(), Some(FailureCause::HostResolution(_)))
            || self.status() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_api_key_is_not_network_class() {
        let err = AppError::network(
            "Invalid API key. Please verify your OpenWeatherMap API key is correct and activated.",
        )
        .with_status(401)
        .with_cause(FailureCause::Http { status: 401, reason: "Unauthorized".into() });

        assert!(!err.is_network_class());
        assert_eq!(err.status(), 401);
    }

    #[test]
    fn message_mentions_connectivity() {
        let err = AppError::unknown("Lost Connection to upstream").with_status(502);
        assert!(err.is_network_class());

        let err = AppError::unknown("no INTERNET here").with_status(500);
        assert!(err.is_network_class());
    }

    #[test]
    fn host_resolution_cause_is_network_class() {
        let err = AppError::unknown("lookup failed")
            .with_status(503)
            .with_cause(FailureCause::HostResolution("api.example".into()));
        assert!(err.is_network_class());
    }

    #[test]
    fn zero_status_is_network_class() {
        assert!(AppError::unknown("something odd").is_network_class());
        assert!(!AppError::unknown("something odd").with_status(500).is_network_class());
    }

    #[test]
    fn display_uses_message_and_exposes_source() {
        use std::error::Error as _;

        let err = AppError::network("Connection timeout.").with_cause(FailureCause::Timeout);
        assert_eq!(err.to_string(), "Connection timeout.");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("request timed out"));
    }
}
