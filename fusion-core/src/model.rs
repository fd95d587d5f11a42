use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::provider::{openmeteo::OpenMeteoHourly, weatherapi::WeatherApiDay};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Incoming forecast request.
///
/// Coordinates are optional at this level so that a missing or blank value
/// can be reported as a validation error instead of a decoding error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastRequest {
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
}

impl ForecastRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude: Some(latitude), longitude: Some(longitude) }
    }

    /// Both coordinates, if present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// Accepts a JSON number or a numeric string. Anything else (null, "",
/// booleans, garbage) is treated as absent.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;

    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(parsed.filter(|v| v.is_finite()))
}

/// Provider-specific forecast data carried by a successful [`SourceResult`].
///
/// Serialized without a tag so the envelope shows the provider's own shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourcePayload {
    Hourly(OpenMeteoHourly),
    Daily(Vec<WeatherApiDay>),
}

/// Normalized success/failure envelope returned by every forecast source.
///
/// Exactly one of `data` and `error` is set, matching `success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    success: bool,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SourcePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SourceResult {
    pub fn ok(source: impl Into<String>, data: SourcePayload) -> Self {
        Self { success: true, source: source.into(), data: Some(data), error: None }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self { success: false, source: source.into(), data: None, error: Some(error.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn data(&self) -> Option<&SourcePayload> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// One fused day of the output series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub day_name: String,
    pub temperature: f64,
    pub data_points: usize,
}

/// Successful response of the forecast endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub success: bool,
    pub location: Coordinates,
    pub forecast: Vec<ForecastDay>,
    /// Provider display name -> whether it returned data.
    pub sources: BTreeMap<String, bool>,
}
