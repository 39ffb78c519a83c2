//! Reduces the 3-hour forecast feed to one representative sample per day.
//!
//! Dates and hours are taken in the offset passed by the caller (the
//! location's own UTC offset as reported by the forecast payload), so the
//! result does not depend on the machine's timezone.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use chrono::{FixedOffset, Timelike};

use crate::model::{DailyForecast, ForecastSample};

/// Maximum number of days in a reduced forecast.
pub const MAX_FORECAST_DAYS: usize = 5;

/// Local hours (inclusive) a sample must fall in to represent its day.
pub const REPRESENTATIVE_HOURS: RangeInclusive<u32> = 11..=14;

/// Half-width of the synthesized range when the feed lacks usable min/max.
const SYNTHETIC_SPREAD_C: f64 = 3.0;

/// Single pass over `samples` in feed order.
///
/// The first in-window sample of a date wins. A date that never has a sample
/// inside [`REPRESENTATIVE_HOURS`] is left out rather than filled from an
/// off-window sample.
pub fn reduce_daily(samples: &[ForecastSample], offset: FixedOffset) -> Vec<DailyForecast> {
    let mut seen = HashSet::new();
    let mut days = Vec::with_capacity(MAX_FORECAST_DAYS);

    for sample in samples {
        if days.len() == MAX_FORECAST_DAYS {
            break;
        }

        let local = sample.timestamp.with_timezone(&offset);
        let date = local.date_naive();

        if seen.contains(&date) || !REPRESENTATIVE_HOURS.contains(&local.hour()) {
            continue;
        }
        seen.insert(date);

        let (temp_min_c, temp_max_c) = temperature_range(sample);
        days.push(DailyForecast {
            date,
            temp_min_c,
            temp_max_c,
            description: sample.description.clone(),
            icon_code: sample.icon_code.clone(),
        });
    }

    days
}

/// Feed min/max when both are present and positive, otherwise `temp ± 3`.
fn temperature_range(sample: &ForecastSample) -> (f64, f64) {
    match (sample.temp_min_c, sample.temp_max_c) {
        (Some(min), Some(max)) if min > 0.0 && max > 0.0 => (min, max),
        _ => (sample.temp_c - SYNTHETIC_SPREAD_C, sample.temp_c + SYNTHETIC_SPREAD_C),
    }
}
