//! Core library for `weather-fusion`.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Forecast source adapters (Open-Meteo, WeatherAPI.com)
//! - Day-level fusion of their temperature samples
//! - The request handler used by both the CLI and the HTTP server
//!
//! It is used by `weather-fusion-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod transport;

pub use aggregate::{DaySamples, ToDaySamples, aggregate};
pub use config::{Config, KeyStatus, ProviderConfig, ServerConfig};
pub use error::{ErrorClass, ForecastError, SourceDetails};
pub use model::{
    Coordinates, ForecastDay, ForecastRequest, ForecastResponse, SourcePayload, SourceResult,
};
pub use provider::{ForecastSource, ProviderId, Sources, sources_from_config};
pub use service::ForecastService;
