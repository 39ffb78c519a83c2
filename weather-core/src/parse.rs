//! Typed views over OpenWeather payloads.
//!
//! Every nested object is optional. A missing, null or wrongly typed `main`,
//! `wind`, `sys` or `weather` leaves the corresponding fields at zero instead
//! of failing the whole parse.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    classify::Payload,
    error::WeatherError,
    model::{CurrentWeather, ForecastSample, LocationCandidate},
};

/// Field value, or its default when the JSON has the wrong type (including `null`).
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwMain {
    #[serde(deserialize_with = "or_default")]
    temp: f64,
    #[serde(deserialize_with = "or_default")]
    feels_like: f64,
    #[serde(deserialize_with = "or_default")]
    humidity: f64,
    #[serde(deserialize_with = "or_default")]
    temp_min: Option<f64>,
    #[serde(deserialize_with = "or_default")]
    temp_max: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWeather {
    #[serde(deserialize_with = "or_default")]
    description: String,
    #[serde(deserialize_with = "or_default")]
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWind {
    #[serde(deserialize_with = "or_default")]
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwSys {
    #[serde(deserialize_with = "or_default")]
    country: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCurrentResponse {
    #[serde(deserialize_with = "or_default")]
    name: String,
    #[serde(deserialize_with = "or_default")]
    sys: Option<OwSys>,
    #[serde(deserialize_with = "or_default")]
    main: Option<OwMain>,
    #[serde(deserialize_with = "or_default")]
    wind: Option<OwWind>,
    #[serde(deserialize_with = "or_default")]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    #[serde(default, deserialize_with = "or_default")]
    main: Option<OwMain>,
    #[serde(default, deserialize_with = "or_default")]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCity {
    timezone: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwGeoEntry {
    name: String,
    state: Option<String>,
    country: String,
    lat: f64,
    lon: f64,
}

/// Map a successful current-weather payload.
///
/// Fails only when the city name is absent or empty.
pub fn parse_current_weather(payload: Payload) -> Result<CurrentWeather, WeatherError> {
    let parsed: OwCurrentResponse = serde_json::from_value(Value::Object(payload))
        .map_err(|e| {
            tracing::debug!(error = %e, "current weather payload has unexpected shape");
            WeatherError::ParseFailure("weather data".to_string())
        })?;

    let main = parsed.main.unwrap_or_default();
    let wind = parsed.wind.unwrap_or_default();
    let condition = parsed.weather.into_iter().next().unwrap_or_default();

    let weather = CurrentWeather {
        city_name: parsed.name,
        country_code: parsed.sys.unwrap_or_default().country,
        temperature_c: main.temp,
        feels_like_c: main.feels_like,
        description: condition.description,
        humidity_pct: main.humidity.round().clamp(0.0, 100.0) as u8,
        wind_speed_mps: wind.speed,
        icon_code: condition.icon,
    };

    if weather.is_valid() {
        Ok(weather)
    } else {
        Err(WeatherError::ParseFailure("weather data".to_string()))
    }
}

/// Raw samples of a forecast payload's `list`, in feed order.
///
/// Elements without a usable `dt` are skipped.
pub fn parse_forecast_samples(payload: &Payload) -> Result<Vec<ForecastSample>, WeatherError> {
    let list = payload
        .get("list")
        .and_then(Value::as_array)
        .ok_or_else(|| WeatherError::ParseFailure("forecast data".to_string()))?;

    let samples = list
        .iter()
        .filter_map(|raw| match OwForecastEntry::deserialize(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed forecast entry");
                None
            }
        })
        .filter_map(|entry| {
            let timestamp = DateTime::<Utc>::from_timestamp(entry.dt, 0)?;
            let main = entry.main.unwrap_or_default();
            let condition = entry.weather.into_iter().next().unwrap_or_default();
            Some(ForecastSample {
                timestamp,
                temp_c: main.temp,
                temp_min_c: main.temp_min,
                temp_max_c: main.temp_max,
                description: condition.description,
                icon_code: condition.icon,
            })
        })
        .collect();

    Ok(samples)
}

/// UTC offset of the forecast location, falling back to UTC.
pub fn forecast_offset(payload: &Payload) -> FixedOffset {
    payload
        .get("city")
        .and_then(|city| OwCity::deserialize(city).ok())
        .and_then(|city| city.timezone)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Geocoding reply body -> candidates.
///
/// Never fails: a body that is not an array yields nothing and a malformed
/// element is skipped.
pub fn parse_candidates(body: &[u8]) -> Vec<LocationCandidate> {
    let elements = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(elements)) => elements,
        Ok(_) => {
            tracing::debug!("geocoding reply is not an array");
            return Vec::new();
        }
        Err(e) => {
            tracing::debug!(error = %e, "geocoding reply is not JSON");
            return Vec::new();
        }
    };

    elements
        .iter()
        .filter(|value| value.is_object())
        .filter_map(|value| OwGeoEntry::deserialize(value).ok())
        .map(|entry| LocationCandidate {
            name: entry.name,
            administrative_area: entry.state.filter(|s| !s.is_empty()),
            country: entry.country,
            latitude: entry.lat,
            longitude: entry.lon,
        })
        .collect()
}
