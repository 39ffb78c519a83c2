use thiserror::Error;

/// Transport-level failure of a single HTTP request.
///
/// The `Display` text is what gets shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No internet connection or server not found")]
    HostUnreachable,

    #[error("Request timeout. Please try again")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::HostUnreachable
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Terminal failure of one weather, forecast or lookup request.
///
/// None of these are retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("City name cannot be empty")]
    EmptyLocation,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid JSON response from API")]
    MalformedResponse,

    #[error("API Error: {message}")]
    Api { status: Option<i64>, message: String },

    #[error("Failed to parse {0}")]
    ParseFailure(String),

    #[error("Weather controller is no longer running")]
    ControllerClosed,
}
