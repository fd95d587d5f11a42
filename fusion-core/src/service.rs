use std::{collections::BTreeMap, sync::Arc};

use tokio::task::JoinError;
use tracing::{error, info};

use crate::{
    aggregate::aggregate,
    error::{ForecastError, SourceDetails},
    model::{Coordinates, ForecastRequest, ForecastResponse, SourceResult},
    provider::{ForecastSource, Sources},
};

/// Request handler: validates, fans out to both sources, gates, aggregates.
#[derive(Debug, Clone)]
pub struct ForecastService {
    open_meteo: Arc<dyn ForecastSource>,
    weather_api: Arc<dyn ForecastSource>,
}

impl ForecastService {
    pub fn new(open_meteo: Arc<dyn ForecastSource>, weather_api: Arc<dyn ForecastSource>) -> Self {
        Self { open_meteo, weather_api }
    }

    pub fn from_sources(sources: Sources) -> Self {
        Self::new(sources.open_meteo, sources.weather_api)
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, ForecastError> {
        let coords = request.coordinates().ok_or(ForecastError::MissingCoordinates)?;

        info!(latitude = coords.latitude, longitude = coords.longitude, "Fetching forecast");

        let (open_meteo, weather_api) = self.fetch_both(coords).await?;

        info!(
            open_meteo = open_meteo.is_success(),
            weather_api = weather_api.is_success(),
            "Source results"
        );

        if !open_meteo.is_success() && !weather_api.is_success() {
            return Err(ForecastError::AllSourcesFailed {
                details: Box::new(SourceDetails { open_meteo, weather_api }),
            });
        }

        let forecast = aggregate([&open_meteo, &weather_api]);

        if forecast.is_empty() {
            error!("A source reported success but no forecast days were produced");
            return Err(ForecastError::EmptyForecast);
        }

        let sources = BTreeMap::from([
            (open_meteo.source().to_string(), open_meteo.is_success()),
            (weather_api.source().to_string(), weather_api.is_success()),
        ]);

        Ok(ForecastResponse { success: true, location: coords, forecast, sources })
    }

    /// Runs both sources as separate tasks and waits for both to settle.
    async fn fetch_both(
        &self,
        coords: Coordinates,
    ) -> Result<(SourceResult, SourceResult), ForecastError> {
        let open_meteo = Arc::clone(&self.open_meteo);
        let weather_api = Arc::clone(&self.weather_api);

        let (om, wa) = tokio::join!(
            tokio::spawn(async move { open_meteo.fetch(coords).await }),
            tokio::spawn(async move { weather_api.fetch(coords).await }),
        );

        Ok((om.map_err(task_fault)?, wa.map_err(task_fault)?))
    }
}

fn task_fault(err: JoinError) -> ForecastError {
    error!(error = %err, "Forecast source task failed");
    ForecastError::Internal(err.to_string())
}
