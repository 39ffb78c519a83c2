use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::ApiConfig,
    error::TransportError,
    provider::{ApiRequest, RawResponse},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    config: ApiConfig,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self { config, http })
    }

    pub fn icon_url(&self, code: &str) -> String {
        icon_url(&self.config.endpoints.icon_host, code)
    }

    fn url_and_query(&self, request: &ApiRequest) -> (String, Vec<(&'static str, String)>) {
        let cfg = &self.config;
        match request {
            ApiRequest::Geocode { query } => (
                cfg.endpoints.geocode.clone(),
                vec![
                    ("q", query.clone()),
                    ("limit", cfg.result_limit.to_string()),
                    ("appid", cfg.api_key.clone()),
                ],
            ),
            ApiRequest::CurrentWeather { city } => {
                (cfg.endpoints.weather.clone(), self.city_query(city))
            }
            ApiRequest::Forecast { city } => {
                (cfg.endpoints.forecast.clone(), self.city_query(city))
            }
            ApiRequest::Icon { code } => (self.icon_url(code), Vec::new()),
        }
    }

    fn city_query(&self, city: &str) -> Vec<(&'static str, String)> {
        vec![
            ("q", city.to_string()),
            ("appid", self.config.api_key.clone()),
            ("units", self.config.units.clone()),
            ("lang", self.config.lang.clone()),
        ]
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let (url, query) = self.url_and_query(request);
        tracing::debug!(kind = request.label(), %url, "sending OpenWeather request");

        let res = self.http.get(&url).query(&query).send().await?;

        let status = res.status().as_u16();
        let body = res.bytes().await?;

        tracing::debug!(kind = request.label(), status, bytes = body.len(), "OpenWeather replied");

        Ok(RawResponse { status, body: body.to_vec() })
    }
}

/// `{icon_host}/{code}@2x.png`
pub fn icon_url(icon_host: &str, code: &str) -> String {
    format!("{}/{}@2x.png", icon_host.trim_end_matches('/'), code)
}
