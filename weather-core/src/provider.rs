use crate::{config::ApiConfig, error::TransportError, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// One GET against the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiRequest {
    Geocode { query: String },
    CurrentWeather { city: String },
    Forecast { city: String },
    Icon { code: String },
}

impl ApiRequest {
    pub fn label(&self) -> &'static str {
        match self {
            ApiRequest::Geocode { .. } => "geocode",
            ApiRequest::CurrentWeather { .. } => "weather",
            ApiRequest::Forecast { .. } => "forecast",
            ApiRequest::Icon { .. } => "icon",
        }
    }
}

/// Body of a completed request. Returned for every HTTP status: the API
/// reports its own errors inside the JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

/// Construct the OpenWeather-backed provider from injected configuration.
pub fn provider_from_config(config: ApiConfig) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    Ok(Arc::new(OpenWeatherProvider::new(config)?))
}
