use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One location returned by the geocoding lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub name: String,
    pub administrative_area: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationCandidate {
    /// `name[, administrative area], country`; disambiguates candidates sharing a name.
    pub fn display_name(&self) -> String {
        let mut display = self.name.clone();
        if let Some(area) = self.administrative_area.as_deref().filter(|a| !a.is_empty()) {
            display.push_str(", ");
            display.push_str(area);
        }
        display.push_str(", ");
        display.push_str(&self.country);
        display
    }
}

/// Current conditions for one city. Replaced wholesale on each successful fetch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub city_name: String,
    pub country_code: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub icon_code: String,
}

impl CurrentWeather {
    pub fn is_valid(&self) -> bool {
        !self.city_name.is_empty()
    }
}

/// Raw 3-hour forecast sample, only alive while a forecast is being reduced.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    pub temp_c: f64,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub description: String,
    pub icon_code: String,
}

/// One reduced forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub description: String,
    pub icon_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Weather,
    Forecast,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::Weather => "weather",
            FetchKind::Forecast => "forecast",
        }
    }

    pub const fn all() -> &'static [FetchKind] {
        &[FetchKind::Weather, FetchKind::Forecast]
    }
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag carried by an in-flight weather or forecast request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub kind: FetchKind,
    pub generation: u64,
    pub location: String,
}

/// City part of a favorites display string (`"Berlin, DE"` -> `"Berlin"`).
pub fn city_from_display(display: &str) -> &str {
    display.split(',').next().unwrap_or_default().trim()
}
