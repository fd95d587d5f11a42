//! Open-Meteo hourly forecast source. No API key required.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    aggregate::{DaySamples, ToDaySamples},
    model::{Coordinates, SourcePayload, SourceResult},
    transport::HttpTransport,
};

use super::{ForecastSource, ProviderId};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const FORECAST_DAYS: u8 = 7;

/// Parallel arrays of local timestamps and temperatures (°C).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenMeteoHourly {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    #[serde(default)]
    hourly: Option<OpenMeteoHourly>,
}

impl ToDaySamples for OpenMeteoHourly {
    fn to_day_samples(&self) -> DaySamples {
        let mut samples = DaySamples::new();

        for (timestamp, temp) in self.time.iter().zip(&self.temperature_2m) {
            let (Some(day), Some(temp)) = (day_of(timestamp), temp) else {
                continue;
            };
            samples.push(day, *temp);
        }

        samples
    }
}

/// Calendar date written in the timestamp itself, e.g. `2024-03-01T23:00`.
fn day_of(timestamp: &str) -> Option<NaiveDate> {
    let date = timestamp.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    http: Arc<dyn HttpTransport>,
}

impl OpenMeteoSource {
    pub fn new(http: Arc<dyn HttpTransport>) -> Self {
        Self { http }
    }

    async fn fetch_hourly(&self, coords: Coordinates) -> Result<OpenMeteoHourly> {
        let body = self
            .http
            .get_text(
                FORECAST_URL,
                &[
                    ("latitude", coords.latitude.to_string()),
                    ("longitude", coords.longitude.to_string()),
                    ("hourly", "temperature_2m".to_string()),
                    ("timezone", "auto".to_string()),
                    ("forecast_days", FORECAST_DAYS.to_string()),
                ],
            )
            .await
            .context("Open-Meteo forecast request failed")?;

        let parsed: OmForecastResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")?;

        parsed.hourly.ok_or_else(|| anyhow!("Open-Meteo response contained no hourly data"))
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoSource {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn fetch(&self, coords: Coordinates) -> SourceResult {
        let name = self.id().display_name();

        match self.fetch_hourly(coords).await {
            Ok(hourly) => {
                info!(source = name, hours = hourly.time.len(), "Forecast fetched");
                SourceResult::ok(name, SourcePayload::Hourly(hourly))
            }
            Err(e) => {
                let msg = format!("{e:#}");
                warn!(source = name, error = %msg, "Forecast fetch failed");
                SourceResult::failed(name, msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::StubTransport;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn samples_are_keyed_by_encoded_calendar_date() {
        let hourly = OpenMeteoHourly {
            time: vec![
                "2024-03-01T22:00".into(),
                "2024-03-01T23:00".into(),
                "2024-03-02T00:00".into(),
            ],
            temperature_2m: vec![Some(4.0), Some(3.0), Some(2.5)],
        };

        let samples = hourly.to_day_samples();

        assert_eq!(samples.get(date("2024-03-01")), Some(&[4.0, 3.0][..]));
        assert_eq!(samples.get(date("2024-03-02")), Some(&[2.5][..]));
    }

    #[test]
    fn offset_timestamps_keep_their_own_date() {
        let hourly = OpenMeteoHourly {
            time: vec!["2024-03-01T23:30:00+05:00".into()],
            temperature_2m: vec![Some(1.0)],
        };

        let samples = hourly.to_day_samples();
        assert_eq!(samples.get(date("2024-03-01")), Some(&[1.0][..]));
    }

    #[test]
    fn null_temperatures_and_bad_timestamps_are_skipped() {
        let hourly = OpenMeteoHourly {
            time: vec!["2024-03-01T00:00".into(), "garbage".into(), "2024-03-01T02:00".into()],
            temperature_2m: vec![None, Some(9.0), Some(5.0)],
        };

        let samples = hourly.to_day_samples();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples.get(date("2024-03-01")), Some(&[5.0][..]));
    }

    #[tokio::test]
    async fn fetch_requests_seven_days_of_hourly_temperature() {
        let stub = StubTransport::responding(
            r#"{"latitude":52.5,"hourly":{"time":["2024-03-01T00:00"],"temperature_2m":[3.2]}}"#,
        );
        let source = OpenMeteoSource::new(Arc::new(stub.clone()));

        let res = source.fetch(Coordinates::new(52.5, 13.4)).await;

        assert!(res.is_success());
        assert_eq!(res.source(), "Open-Meteo");
        assert_eq!(stub.call_count(), 1);
        assert_eq!(stub.query_value(0, "hourly").as_deref(), Some("temperature_2m"));
        assert_eq!(stub.query_value(0, "timezone").as_deref(), Some("auto"));
        assert_eq!(stub.query_value(0, "forecast_days").as_deref(), Some("7"));
        assert_eq!(stub.query_value(0, "latitude").as_deref(), Some("52.5"));
    }

    #[tokio::test]
    async fn missing_hourly_section_is_a_failure() {
        let stub = StubTransport::responding(r#"{"latitude":52.5}"#);
        let source = OpenMeteoSource::new(Arc::new(stub));

        let res = source.fetch(Coordinates::new(52.5, 13.4)).await;

        assert!(!res.is_success());
        assert!(res.error().unwrap().contains("no hourly data"));
    }

    #[tokio::test]
    async fn transport_errors_become_failed_envelopes() {
        let stub = StubTransport::failing("connection refused");
        let source = OpenMeteoSource::new(Arc::new(stub));

        let res = source.fetch(Coordinates::new(52.5, 13.4)).await;

        assert!(!res.is_success());
        assert!(res.data().is_none());
        assert!(res.error().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn malformed_json_becomes_failed_envelope() {
        let stub = StubTransport::responding("<html>oops</html>");
        let source = OpenMeteoSource::new(Arc::new(stub));

        let res = source.fetch(Coordinates::new(52.5, 13.4)).await;

        assert!(!res.is_success());
        assert!(res.error().unwrap().contains("Failed to parse Open-Meteo"));
    }
}
