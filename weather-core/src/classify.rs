//! Turns a raw reply into `Success(payload)` or a terminal [`WeatherError`].

use serde_json::{Map, Value};

use crate::{
    error::{TransportError, WeatherError},
    provider::RawResponse,
};

pub type Payload = Map<String, Value>;

/// Normalized status carried by the `cod` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    Code(i64),
    /// Present but not numeric, e.g. `"oops"`.
    Unparsed(String),
}

impl StatusCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Code(200))
    }

    fn code(&self) -> Option<i64> {
        match self {
            StatusCode::Code(code) => Some(*code),
            StatusCode::Unparsed(_) => None,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Code(code) => write!(f, "{code}"),
            StatusCode::Unparsed(raw) => write!(f, "{raw:?}"),
        }
    }
}

/// Accepts both `200` and `"200"`: the weather and forecast endpoints disagree.
pub fn normalize_status(value: &Value) -> Option<StatusCode> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(StatusCode::Code)
            .or_else(|| Some(StatusCode::Unparsed(n.to_string()))),
        Value::String(s) => Some(
            s.trim()
                .parse::<i64>()
                .map(StatusCode::Code)
                .unwrap_or_else(|_| StatusCode::Unparsed(s.clone())),
        ),
        Value::Null => None,
        other => Some(StatusCode::Unparsed(other.to_string())),
    }
}

pub fn classify(outcome: Result<RawResponse, TransportError>) -> Result<Payload, WeatherError> {
    let response = outcome?;

    let payload = match serde_json::from_slice::<Value>(&response.body) {
        Ok(Value::Object(map)) => map,
        _ => return Err(WeatherError::MalformedResponse),
    };

    let status = payload
        .get("cod")
        .and_then(normalize_status)
        .unwrap_or(StatusCode::Code(i64::from(response.status)));

    if status.is_ok() {
        return Ok(payload);
    }

    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("API returned error code {status}"));

    Err(WeatherError::Api { status: status.code(), message })
}
