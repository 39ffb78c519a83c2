use weather_core::{CurrentWeather, DailyForecast, FavoriteChange};

/// Upper-case the first character ("light rain" -> "Light rain").
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn format_weather(weather: &CurrentWeather) -> String {
    format!(
        "{}, {}\n  {:.1}°C  {}\n  Feels like: {:.1}°C\n  Humidity:   {}%\n  Wind:       {:.1} m/s",
        weather.city_name,
        weather.country_code,
        weather.temperature_c,
        capitalize(&weather.description),
        weather.feels_like_c,
        weather.humidity_pct,
        weather.wind_speed_mps,
    )
}

pub fn format_forecast(days: &[DailyForecast]) -> String {
    if days.is_empty() {
        return "No daily forecast available".to_string();
    }

    days.iter()
        .map(|day| {
            format!(
                "  {}  {:>4}° / {:>3}°  {}",
                day.date.format("%a, %b %d"),
                day.temp_min_c.round() as i64,
                day.temp_max_c.round() as i64,
                capitalize(&day.description),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_change(change: &FavoriteChange) -> String {
    match change {
        FavoriteChange::Added(name) => format!("{name} added to favorites"),
        FavoriteChange::Removed(name) => format!("{name} removed from favorites"),
        FavoriteChange::Reordered => "Favorites reordered".to_string(),
    }
}
