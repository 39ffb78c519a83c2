//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather fetch client and response classification
//! - Forecast reduction to one sample per day
//! - Debounced location search and the controller that orchestrates fetches
//! - The favorites list
//!
//! It is used by `weather-cli`, but any front end can drive it through
//! [`controller::spawn`] and the [`Event`] stream.

pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod favorites;
pub mod forecast;
pub mod model;
pub mod parse;
pub mod provider;
pub mod search;
pub mod service;

pub use config::{ApiConfig, Config, Endpoints, SearchSettings};
pub use controller::{ControllerHandle, Event};
pub use error::{TransportError, WeatherError};
pub use favorites::{FavoriteChange, Favorites, FavoritesStore, JsonFileStore};
pub use model::{CurrentWeather, DailyForecast, FetchKind, LocationCandidate};
pub use provider::{ApiRequest, RawResponse, WeatherProvider};
pub use service::WeatherService;
