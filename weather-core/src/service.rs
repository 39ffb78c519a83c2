use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    classify::classify,
    error::WeatherError,
    forecast::reduce_daily,
    model::{CurrentWeather, DailyForecast, LocationCandidate},
    parse::{forecast_offset, parse_candidates, parse_current_weather, parse_forecast_samples},
    provider::{ApiRequest, WeatherProvider},
};

/// Icon bytes memoized by icon code. Codes are content identifiers
/// (`"10d"`), so entries are shared by every row that shows them.
#[derive(Debug, Default)]
pub struct IconCache {
    icons: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl IconCache {
    pub fn get(&self, code: &str) -> Option<Arc<Vec<u8>>> {
        self.icons.read().get(code).cloned()
    }

    pub fn insert(&self, code: &str, bytes: Vec<u8>) -> Arc<Vec<u8>> {
        let bytes = Arc::new(bytes);
        self.icons.write().entry(code.to_string()).or_insert(bytes).clone()
    }

    pub fn len(&self) -> usize {
        self.icons.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One request per call: fetch, classify, parse.
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    icons: Arc<IconCache>,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider, icons: Arc::new(IconCache::default()) }
    }

    /// Candidates for `query`. Failures degrade to an empty list.
    pub async fn lookup_locations(&self, query: &str) -> Vec<LocationCandidate> {
        let request = ApiRequest::Geocode { query: query.to_string() };
        match self.provider.fetch(&request).await {
            Ok(response) if response.is_success() => parse_candidates(&response.body),
            Ok(response) => {
                tracing::debug!(status = response.status, query, "geocoding lookup rejected");
                Vec::new()
            }
            Err(e) => {
                tracing::debug!(error = %e, query, "geocoding lookup failed");
                Vec::new()
            }
        }
    }

    pub async fn current_weather(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        let city = non_empty(city)?;
        let outcome =
            self.provider.fetch(&ApiRequest::CurrentWeather { city: city.to_string() }).await;

        let weather = parse_current_weather(classify(outcome)?)?;
        tracing::info!(city = %weather.city_name, country = %weather.country_code, "current weather ready");
        Ok(weather)
    }

    pub async fn daily_forecast(&self, city: &str) -> Result<Vec<DailyForecast>, WeatherError> {
        let city = non_empty(city)?;
        let outcome = self.provider.fetch(&ApiRequest::Forecast { city: city.to_string() }).await;

        let payload = classify(outcome)?;
        let samples = parse_forecast_samples(&payload)?;
        let days = reduce_daily(&samples, forecast_offset(&payload));
        tracing::info!(city, samples = samples.len(), days = days.len(), "forecast reduced");
        Ok(days)
    }

    /// Icon bytes for `code`, fetched once and then served from the cache.
    pub async fn icon(&self, code: &str) -> Result<Arc<Vec<u8>>, WeatherError> {
        if let Some(bytes) = self.icons.get(code) {
            return Ok(bytes);
        }

        let response = self.provider.fetch(&ApiRequest::Icon { code: code.to_string() }).await?;
        if !response.is_success() {
            return Err(WeatherError::Api {
                status: Some(i64::from(response.status)),
                message: format!("API returned error code {}", response.status),
            });
        }

        Ok(self.icons.insert(code, response.body))
    }

    pub fn icon_cache(&self) -> &IconCache {
        &self.icons
    }
}

fn non_empty(city: &str) -> Result<&str, WeatherError> {
    let city = city.trim();
    if city.is_empty() { Err(WeatherError::EmptyLocation) } else { Ok(city) }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeProvider;
    use super::*;
    use crate::error::TransportError;
    use crate::provider::RawResponse;
    use serde_json::json;

    fn weather_request(city: &str) -> ApiRequest {
        ApiRequest::CurrentWeather { city: city.into() }
    }

    fn forecast_request(city: &str) -> ApiRequest {
        ApiRequest::Forecast { city: city.into() }
    }

    #[tokio::test]
    async fn current_weather_runs_full_pipeline() {
        let fake = FakeProvider::new();
        fake.json(
            weather_request("Berlin"),
            json!({"cod": 200, "name": "Berlin", "sys": {"country": "DE"}, "main": {"temp": 18.0}}),
        );
        let service = WeatherService::new(fake.clone());

        let weather = service.current_weather("  Berlin ").await.unwrap();
        assert_eq!(weather.city_name, "Berlin");
        assert_eq!(weather.country_code, "DE");
        assert_eq!(fake.calls(), vec![weather_request("Berlin")]);
    }

    #[tokio::test]
    async fn empty_city_is_rejected_without_request() {
        let fake = FakeProvider::new();
        let service = WeatherService::new(fake.clone());

        assert_eq!(service.current_weather("   ").await.unwrap_err(), WeatherError::EmptyLocation);
        assert_eq!(service.daily_forecast("").await.unwrap_err(), WeatherError::EmptyLocation);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn api_error_surfaces_message() {
        let fake = FakeProvider::new();
        fake.reply(
            weather_request("Atlantis"),
            Ok(RawResponse {
                status: 404,
                body: br#"{"cod":"404","message":"city not found"}"#.to_vec(),
            }),
        );
        let service = WeatherService::new(fake);

        let err = service.current_weather("Atlantis").await.unwrap_err();
        assert_eq!(err.to_string(), "API Error: city not found");
    }

    #[tokio::test]
    async fn forecast_is_reduced_in_location_time() {
        let fake = FakeProvider::new();
        // 2024-03-01T03:00Z and 2024-03-02T03:00Z: noon in UTC+9
        fake.json(
            forecast_request("Tokyo"),
            json!({
                "cod": "200",
                "city": {"name": "Tokyo", "timezone": 32400},
                "list": [
                    {"dt": 1_709_262_000, "main": {"temp": 12.0}, "weather": [{"description": "clear sky", "icon": "01d"}]},
                    {"dt": 1_709_348_400, "main": {"temp": 14.0, "temp_min": 10.0, "temp_max": 15.0}}
                ]
            }),
        );
        let service = WeatherService::new(fake);

        let days = service.daily_forecast("Tokyo").await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date.to_string(), "2024-03-01");
        assert_eq!((days[0].temp_min_c, days[0].temp_max_c), (9.0, 15.0));
        assert_eq!((days[1].temp_min_c, days[1].temp_max_c), (10.0, 15.0));
    }

    #[tokio::test]
    async fn lookup_failures_degrade_to_empty() {
        let fake = FakeProvider::new();
        fake.reply(ApiRequest::Geocode { query: "Ber".into() }, Err(TransportError::Timeout));
        fake.reply(
            ApiRequest::Geocode { query: "Bad".into() },
            Ok(RawResponse { status: 401, body: br#"{"cod":401}"#.to_vec() }),
        );
        let service = WeatherService::new(fake);

        assert!(service.lookup_locations("Ber").await.is_empty());
        assert!(service.lookup_locations("Bad").await.is_empty());
    }

    #[tokio::test]
    async fn icons_are_fetched_once() {
        let fake = FakeProvider::new();
        fake.reply(ApiRequest::Icon { code: "10d".into() }, Ok(RawResponse::ok(vec![1, 2, 3])));
        let service = WeatherService::new(fake.clone());

        let first = service.icon("10d").await.unwrap();
        let second = service.icon("10d").await.unwrap();

        assert_eq!(*first, vec![1, 2, 3]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fake.count(|r| matches!(r, ApiRequest::Icon { .. })), 1);
        assert_eq!(service.icon_cache().len(), 1);
    }
}
