//! HTTP front end: `POST /api/weather` plus static files.

use std::{any::Any, net::SocketAddr, path::Path};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};
use weather_fusion_core::{
    Config, ErrorClass, ForecastError, ForecastRequest, ForecastService, ProviderId,
    sources_from_config,
};

pub async fn serve(config: &Config, port: u16) -> anyhow::Result<()> {
    let service = ForecastService::from_sources(sources_from_config(config)?);
    let app = router(service, &config.static_dir());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(port, "Weather server running on http://localhost:{port}");
    for id in ProviderId::all() {
        info!(provider = id.display_name(), status = %config.key_status(*id), "API key status");
    }

    axum::serve(listener, app).await.context("HTTP server error")
}

/// Router with the forecast endpoint, permissive CORS and `static_dir` as fallback.
pub fn router(service: ForecastService, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/weather", post(weather))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::very_permissive())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(service)
}

async fn weather(
    State(service): State<ForecastService>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Response {
    // An unreadable body carries no coordinates.
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected forecast request body");
            ForecastRequest::default()
        }
    };

    match service.forecast(&request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &ForecastError) -> Response {
    let status = match err.class() {
        ErrorClass::Client => StatusCode::BAD_REQUEST,
        ErrorClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        warn!(%status, error = %err, "Forecast request failed");
    }

    (status, Json(err.body())).into_response()
}

/// Outermost boundary: a panic anywhere in request handling becomes a
/// generic 500 instead of a dropped connection.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(%message, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error", "message": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{self, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt as _;
    use weather_fusion_core::{
        Coordinates, ForecastSource, SourcePayload, SourceResult,
        provider::openmeteo::OpenMeteoHourly,
    };

    use super::*;

    const BODY_LIMIT: usize = 1024 * 1024;

    #[derive(Debug)]
    struct FixedSource(ProviderId, SourceResult);

    #[async_trait]
    impl ForecastSource for FixedSource {
        fn id(&self) -> ProviderId {
            self.0
        }

        async fn fetch(&self, _coords: Coordinates) -> SourceResult {
            self.1.clone()
        }
    }

    fn open_meteo_ok() -> Arc<FixedSource> {
        Arc::new(FixedSource(
            ProviderId::OpenMeteo,
            SourceResult::ok(
                "Open-Meteo",
                SourcePayload::Hourly(OpenMeteoHourly {
                    time: vec!["2024-03-01T00:00".into(), "2024-03-02T00:00".into()],
                    temperature_2m: vec![Some(10.04), Some(3.0)],
                }),
            ),
        ))
    }

    fn failed(id: ProviderId) -> Arc<FixedSource> {
        Arc::new(FixedSource(id, SourceResult::failed(id.display_name(), "down")))
    }

    fn test_router(om: Arc<FixedSource>, wa: Arc<FixedSource>) -> Router {
        router(ForecastService::new(om, wa), Path::new("does-not-exist"))
    }

    async fn post_weather(app: Router, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/weather")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("build POST /api/weather");

        let resp = app.oneshot(req).await.expect("oneshot /api/weather");
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn weather_returns_200_with_forecast() {
        let app = test_router(open_meteo_ok(), failed(ProviderId::WeatherApi));

        let (status, body) = post_weather(app, r#"{"latitude": 52.5, "longitude": 13.4}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["location"]["latitude"], 52.5);
        assert_eq!(body["forecast"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["forecast"][0]["dayName"], "Fri");
        assert_eq!(body["sources"]["WeatherAPI.com"], false);
    }

    #[tokio::test]
    async fn null_latitude_is_400() {
        let app = test_router(open_meteo_ok(), failed(ProviderId::WeatherApi));

        let (status, body) = post_weather(app, r#"{"latitude": null, "longitude": 13.4}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Latitude and longitude are required" }));
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let app = test_router(open_meteo_ok(), failed(ProviderId::WeatherApi));

        let (status, body) = post_weather(app, "not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Latitude and longitude are required");
    }

    #[tokio::test]
    async fn all_sources_down_is_503_with_details() {
        let app = test_router(failed(ProviderId::OpenMeteo), failed(ProviderId::WeatherApi));

        let (status, body) = post_weather(app, r#"{"latitude": 1, "longitude": 2}"#).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Unable to fetch weather data from any source");
        assert_eq!(body["details"]["openMeteo"]["success"], false);
        assert_eq!(body["details"]["weatherAPI"]["error"], "down");
    }

    #[test]
    fn panic_payload_is_reported_as_internal_error() {
        let resp = panic_response(Box::new("boom"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn empty_aggregation_is_500() {
        let empty = Arc::new(FixedSource(
            ProviderId::WeatherApi,
            SourceResult::ok("WeatherAPI.com", SourcePayload::Daily(vec![])),
        ));
        let app = test_router(failed(ProviderId::OpenMeteo), empty);

        let (status, body) = post_weather(app, r#"{"latitude": 1, "longitude": 2}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "No forecast data could be generated" }));
    }
}
