use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    aggregate::{DaySamples, ToDaySamples},
    model::{Coordinates, SourcePayload, SourceResult},
    transport::HttpTransport,
};

use super::{ForecastSource, ProviderId};

const FORECAST_URL: &str = "https://api.weatherapi.com/v1/forecast.json";
const FORECAST_DAYS: u8 = 7;

/// One `forecast.forecastday[]` entry as returned by WeatherAPI.com.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherApiDay {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<WaDaySummary>,
    #[serde(default)]
    pub hour: Vec<WaHour>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaDaySummary {
    #[serde(default)]
    pub avgtemp_c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaHour {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub temp_c: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    #[serde(default)]
    forecastday: Vec<WeatherApiDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    #[serde(default)]
    forecast: Option<WaForecast>,
}

impl ToDaySamples for [WeatherApiDay] {
    /// Hourly readings plus the provider's own daily average as one extra
    /// sample. The extra sample weights the fused mean toward WeatherAPI's
    /// official daily figure; keep it unless product says otherwise.
    fn to_day_samples(&self) -> DaySamples {
        let mut samples = DaySamples::new();

        for record in self {
            let Ok(day) = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d") else {
                warn!(date = %record.date, "Skipping WeatherAPI day with unparsable date");
                continue;
            };

            for temp in record.hour.iter().filter_map(|h| h.temp_c) {
                samples.push(day, temp);
            }

            if let Some(avg) = record.day.as_ref().and_then(|d| d.avgtemp_c) {
                samples.push(day, avg);
            }
        }

        samples
    }
}

#[derive(Debug)]
pub struct WeatherApiSource {
    api_key: Option<SecretString>,
    http: Arc<dyn HttpTransport>,
}

impl WeatherApiSource {
    pub fn new(api_key: Option<SecretString>, http: Arc<dyn HttpTransport>) -> Self {
        Self { api_key, http }
    }

    async fn fetch_days(&self, api_key: &str, coords: Coordinates) -> Result<Vec<WeatherApiDay>> {
        let body = self
            .http
            .get_text(
                FORECAST_URL,
                &[
                    ("key", api_key.to_string()),
                    ("q", format!("{},{}", coords.latitude, coords.longitude)),
                    ("days", FORECAST_DAYS.to_string()),
                    ("aqi", "no".to_string()),
                    ("alerts", "no".to_string()),
                ],
            )
            .await
            .context("WeatherAPI.com forecast request failed")?;

        let parsed: WaForecastResponse =
            serde_json::from_str(&body).context("Failed to parse WeatherAPI forecast JSON")?;

        parsed
            .forecast
            .map(|f| f.forecastday)
            .ok_or_else(|| anyhow!("WeatherAPI response contained no forecast data"))
    }
}

#[async_trait]
impl ForecastSource for WeatherApiSource {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn fetch(&self, coords: Coordinates) -> SourceResult {
        let name = self.id().display_name();

        let Some(api_key) = &self.api_key else {
            warn!(source = name, "API key not configured");
            return SourceResult::failed(name, "API key not configured");
        };

        match self.fetch_days(api_key.expose_secret(), coords).await {
            Ok(days) => {
                info!(source = name, days = days.len(), "Forecast fetched");
                SourceResult::ok(name, SourcePayload::Daily(days))
            }
            Err(e) => {
                let msg = format!("{e:#}");
                warn!(source = name, error = %msg, "Forecast fetch failed");
                SourceResult::failed(name, msg)
            }
        }
    }
}
