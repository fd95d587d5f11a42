use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::model::SourceResult;

/// Both envelopes, reported when no source produced data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDetails {
    #[serde(rename = "openMeteo")]
    pub open_meteo: SourceResult,
    #[serde(rename = "weatherAPI")]
    pub weather_api: SourceResult,
}

/// Coarse response class; the HTTP layer maps it to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad request from the caller.
    Client,
    /// Every upstream provider failed.
    Unavailable,
    /// Fault on our side.
    Server,
}

/// Request-level failures of the forecast endpoint.
///
/// Per-provider failures never appear here; they are carried as failed
/// [`SourceResult`]s and only escalate once both providers are down.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Latitude and longitude are required")]
    MissingCoordinates,

    #[error("Unable to fetch weather data from any source")]
    AllSourcesFailed { details: Box<SourceDetails> },

    #[error("No forecast data could be generated")]
    EmptyForecast,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ForecastError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ForecastError::MissingCoordinates => ErrorClass::Client,
            ForecastError::AllSourcesFailed { .. } => ErrorClass::Unavailable,
            ForecastError::EmptyForecast | ForecastError::Internal(_) => ErrorClass::Server,
        }
    }

    /// JSON error payload returned to clients.
    pub fn body(&self) -> Value {
        match self {
            ForecastError::MissingCoordinates | ForecastError::EmptyForecast => {
                json!({ "error": self.to_string() })
            }
            ForecastError::AllSourcesFailed { details } => json!({
                "error": self.to_string(),
                "details": details,
            }),
            ForecastError::Internal(message) => json!({
                "error": "Internal server error",
                "message": message,
            }),
        }
    }
}
