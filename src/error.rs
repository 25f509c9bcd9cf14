//! Error taxonomy for the geodata gateway
//!
//! Every pipeline failure is one of these kinds. Callers switch on the variant,
//! never on the message text.

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for the gateway pipeline
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The client accepts neither JSON nor XML
    #[error("Not acceptable: {accept}")]
    NotAcceptable { accept: String },

    /// Timespan token is neither a preset nor a `YYYY-MM-DD` date
    #[error("Invalid timespan '{token}', expected one of {} or a YYYY-MM-DD date", .valid.join(", "))]
    InvalidTimespan {
        token: String,
        valid: Vec<&'static str>,
    },

    /// The geocoder had no candidates for the place name
    #[error("Location not found: {name}")]
    LocationNotFound { name: String },

    /// No qualifying restaurant inside the search box
    #[error("No restaurants found near ({latitude:.4}, {longitude:.4})")]
    NoResultsInArea { latitude: f64, longitude: f64 },

    /// Outbound call failed: transport, non-success status or timeout
    #[error("{provider} unavailable: {message}")]
    UpstreamUnavailable {
        provider: &'static str,
        message: String,
    },

    /// Upstream answered with something that breaks its documented contract
    #[error("{provider} returned an invalid response: {message}")]
    UpstreamContractViolation {
        provider: &'static str,
        message: String,
    },

    /// Response serialization failed
    #[error("Render error: {message}")]
    Render { message: String },
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotAcceptable,
    InvalidTimespan,
    LocationNotFound,
    NoResultsInArea,
    UpstreamUnavailable,
    UpstreamContractViolation,
    Render,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotAcceptable => "NOT_ACCEPTABLE",
            ErrorCode::InvalidTimespan => "INVALID_TIMESPAN",
            ErrorCode::LocationNotFound => "LOCATION_NOT_FOUND",
            ErrorCode::NoResultsInArea => "NO_RESULTS_IN_AREA",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::UpstreamContractViolation => "UPSTREAM_CONTRACT_VIOLATION",
            ErrorCode::Render => "RENDER_ERROR",
        }
    }
}

impl GatewayError {
    /// Create a new upstream-unavailable error
    pub fn unavailable<S: Into<String>>(provider: &'static str, message: S) -> Self {
        Self::UpstreamUnavailable {
            provider,
            message: message.into(),
        }
    }

    /// Create a new contract-violation error
    pub fn contract<S: Into<String>>(provider: &'static str, message: S) -> Self {
        Self::UpstreamContractViolation {
            provider,
            message: message.into(),
        }
    }

    /// Create a new render error
    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::NotAcceptable { .. } => ErrorCode::NotAcceptable,
            GatewayError::InvalidTimespan { .. } => ErrorCode::InvalidTimespan,
            GatewayError::LocationNotFound { .. } => ErrorCode::LocationNotFound,
            GatewayError::NoResultsInArea { .. } => ErrorCode::NoResultsInArea,
            GatewayError::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            GatewayError::UpstreamContractViolation { .. } => {
                ErrorCode::UpstreamContractViolation
            }
            GatewayError::Render { .. } => ErrorCode::Render,
        }
    }

    /// HTTP status this error maps to
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            GatewayError::InvalidTimespan { .. } => StatusCode::BAD_REQUEST,
            GatewayError::LocationNotFound { .. } | GatewayError::NoResultsInArea { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::UpstreamUnavailable { .. }
            | GatewayError::UpstreamContractViolation { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::NotAcceptable { .. } => {
                "Only application/json and application/xml responses are available.".to_string()
            }
            GatewayError::InvalidTimespan { token, .. } => {
                format!("Unknown timespan '{token}'.")
            }
            GatewayError::LocationNotFound { name } => format!("Could not locate '{name}'."),
            GatewayError::NoResultsInArea { .. } => {
                "No restaurants with a full address were found in the area.".to_string()
            }
            GatewayError::UpstreamUnavailable { .. }
            | GatewayError::UpstreamContractViolation { .. } => {
                "An external data provider is not available right now. Please retry later."
                    .to_string()
            }
            GatewayError::Render { .. } => "The response could not be generated.".to_string(),
        }
    }

    /// Valid preset names, only carried by `InvalidTimespan`
    #[must_use]
    pub fn valid_timespans(&self) -> Option<&[&'static str]> {
        match self {
            GatewayError::InvalidTimespan { valid, .. } => Some(valid.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                GatewayError::NotAcceptable {
                    accept: "text/html".into(),
                },
                406,
            ),
            (
                GatewayError::InvalidTimespan {
                    token: "x".into(),
                    valid: vec!["hoy"],
                },
                400,
            ),
            (
                GatewayError::LocationNotFound {
                    name: "Atlantis".into(),
                },
                404,
            ),
            (
                GatewayError::NoResultsInArea {
                    latitude: 1.0,
                    longitude: 2.0,
                },
                404,
            ),
            (GatewayError::unavailable("osm", "timeout"), 503),
            (GatewayError::contract("open-meteo", "length"), 503),
            (GatewayError::render("boom"), 500),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err}");
        }
    }

    #[test]
    fn test_invalid_timespan_message_lists_presets() {
        let err = GatewayError::InvalidTimespan {
            token: "invalido".into(),
            valid: vec!["hoy", "manhana", "7dias"],
        };
        let text = err.to_string();
        assert!(text.contains("invalido"));
        assert!(text.contains("hoy, manhana, 7dias"));
        assert_eq!(err.valid_timespans(), Some(&["hoy", "manhana", "7dias"][..]));
        assert_eq!(err.code().as_str(), "INVALID_TIMESPAN");
    }

    #[test]
    fn test_user_messages_hide_upstream_details() {
        let err = GatewayError::unavailable("nominatim", "connection refused 10.0.0.1");
        assert!(!err.user_message().contains("10.0.0.1"));
        assert!(err.to_string().contains("nominatim"));
    }
}
