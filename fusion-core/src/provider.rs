use crate::{
    Config, Coordinates, SourceResult,
    provider::{openmeteo::OpenMeteoSource, weatherapi::WeatherApiSource},
    transport::{HttpTransport, ReqwestTransport},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openmeteo;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenMeteo,
    WeatherApi,
}

impl ProviderId {
    /// Short identifier used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "openmeteo",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    /// Stable name reported in envelopes and in the `sources` map.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "Open-Meteo",
            ProviderId::WeatherApi => "WeatherAPI.com",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::WeatherApi)
    }

    /// Environment variable that overrides the configured API key.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenMeteo => None,
            ProviderId::WeatherApi => Some("WEATHERAPI_API_KEY"),
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenMeteo, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openmeteo" | "open-meteo" => Ok(ProviderId::OpenMeteo),
            "weatherapi" | "weatherapi.com" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openmeteo, weatherapi."
            )),
        }
    }
}

/// A forecast provider adapter.
///
/// `fetch` never fails: every transport, credential or decoding problem is
/// folded into a failed [`SourceResult`].
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn fetch(&self, coords: Coordinates) -> SourceResult;
}

/// Both forecast sources, built from config and sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct Sources {
    pub open_meteo: Arc<dyn ForecastSource>,
    pub weather_api: Arc<dyn ForecastSource>,
}

/// Construct both sources from config.
///
/// A missing WeatherAPI.com key is not an error here; that source then
/// reports a failed envelope on every call.
pub fn sources_from_config(config: &Config) -> anyhow::Result<Sources> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
    let weather_api_key = config.resolved_api_key(ProviderId::WeatherApi);

    Ok(Sources {
        open_meteo: Arc::new(OpenMeteoSource::new(transport.clone())),
        weather_api: Arc::new(WeatherApiSource::new(
            weather_api_key.map(secrecy::SecretString::new),
            transport,
        )),
    })
}
