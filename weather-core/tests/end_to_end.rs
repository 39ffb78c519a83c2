//! End-to-end tests: controller + OpenWeather client against a mock server.

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use weather_core::{
    ApiConfig, ControllerHandle, Endpoints, Event, Favorites, FetchKind, JsonFileStore,
    SearchSettings, WeatherService, controller, provider::provider_from_config,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct App {
    handle: ControllerHandle,
    events: UnboundedReceiver<Event>,
    _data: tempfile::TempDir,
}

fn start(server: &MockServer) -> App {
    let provider =
        provider_from_config(ApiConfig::new("KEY", Endpoints::with_base(&server.uri()))).unwrap();
    let data = tempfile::tempdir().unwrap();
    let favorites =
        Favorites::load(Box::new(JsonFileStore::new(data.path().join("favorites.json"))));

    let (handle, events, _task) =
        controller::spawn(WeatherService::new(provider), favorites, &SearchSettings::default());
    App { handle, events, _data: data }
}

impl App {
    async fn next(&mut self) -> Event {
        tokio::time::timeout(Duration::from_secs(10), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("controller stopped")
    }

    async fn weather_and_forecast(&mut self) -> (Event, Event) {
        let (mut weather, mut forecast) = (None, None);
        while weather.is_none() || forecast.is_none() {
            match self.next().await {
                e @ (Event::WeatherReady(_) | Event::Error { kind: FetchKind::Weather, .. }) => {
                    weather = Some(e)
                }
                e @ (Event::ForecastReady(_) | Event::Error { kind: FetchKind::Forecast, .. }) => {
                    forecast = Some(e)
                }
                _ => {}
            }
        }
        (weather.unwrap(), forecast.unwrap())
    }
}

async fn mount_berlin_geocode(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Ber"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Berlin", "country": "DE", "lat": 52.52, "lon": 13.4}
        ])))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_weather(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Berlin"))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_forecast(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", "Berlin"))
        .respond_with(template)
        .mount(server)
        .await;
}

fn berlin_weather() -> serde_json::Value {
    json!({
        "cod": 200,
        "name": "Berlin",
        "sys": {"country": "DE"},
        "main": {"temp": 17.3, "feels_like": 16.8, "humidity": 60},
        "wind": {"speed": 4.1},
        "weather": [{"description": "broken clouds", "icon": "04d"}]
    })
}

/// Six days of 3-hourly samples starting 2024-03-01T00:00Z.
fn berlin_forecast() -> serde_json::Value {
    let start = 1_709_251_200_i64;
    let list: Vec<_> = (0..48)
        .map(|i| {
            json!({
                "dt": start + i * 3 * 3600,
                "main": {"temp": 8.0, "temp_min": 6.0, "temp_max": 11.0},
                "weather": [{"description": "light rain", "icon": "10d"}]
            })
        })
        .collect();
    json!({"cod": "200", "city": {"name": "Berlin", "timezone": 0}, "list": list})
}

#[tokio::test]
async fn typing_ber_then_selecting_berlin_yields_weather_and_forecast() {
    let server = MockServer::start().await;
    mount_berlin_geocode(&server).await;
    mount_weather(&server, ResponseTemplate::new(200).set_body_json(berlin_weather())).await;
    mount_forecast(&server, ResponseTemplate::new(200).set_body_json(berlin_forecast())).await;
    let mut app = start(&server);

    for text in ["B", "Be", "Ber"] {
        app.handle.query_text_changed(text).unwrap();
    }

    let candidates = loop {
        if let Event::CandidatesUpdated(c) = app.next().await {
            if !c.is_empty() {
                break c;
            }
        }
    };
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].display_name(), "Berlin, DE");

    app.handle.select_candidate(0).unwrap();
    let (weather, forecast) = app.weather_and_forecast().await;

    let Event::WeatherReady(weather) = weather else { panic!("unexpected {weather:?}") };
    assert_eq!(weather.city_name, "Berlin");
    assert_eq!(weather.icon_code, "04d");

    let Event::ForecastReady(days) = forecast else { panic!("unexpected {forecast:?}") };
    assert_eq!(days.len(), 5);
    assert!(days.windows(2).all(|w| w[0].date < w[1].date));
    assert_eq!((days[0].temp_min_c, days[0].temp_max_c), (6.0, 11.0));
}

#[tokio::test]
async fn forecast_still_arrives_when_weather_fails() {
    let server = MockServer::start().await;
    mount_weather(
        &server,
        ResponseTemplate::new(401)
            .set_body_json(json!({"cod": 401, "message": "Invalid API key"})),
    )
    .await;
    mount_forecast(&server, ResponseTemplate::new(200).set_body_json(berlin_forecast())).await;
    let mut app = start(&server);

    app.handle.search("Berlin").unwrap();
    let (weather, forecast) = app.weather_and_forecast().await;

    assert_eq!(
        weather,
        Event::Error { kind: FetchKind::Weather, message: "API Error: Invalid API key".into() }
    );
    assert!(matches!(forecast, Event::ForecastReady(days) if days.len() == 5));
}

#[tokio::test]
async fn garbage_body_is_reported_as_malformed() {
    let server = MockServer::start().await;
    mount_weather(&server, ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
    mount_forecast(&server, ResponseTemplate::new(200).set_body_string("")).await;
    let mut app = start(&server);

    app.handle.search("Berlin").unwrap();
    let (weather, forecast) = app.weather_and_forecast().await;

    let malformed = "Invalid JSON response from API".to_string();
    assert_eq!(weather, Event::Error { kind: FetchKind::Weather, message: malformed.clone() });
    assert_eq!(forecast, Event::Error { kind: FetchKind::Forecast, message: malformed });
}

#[tokio::test]
async fn favorites_persist_through_the_controller() {
    let server = MockServer::start().await;
    let mut app = start(&server);

    app.handle.add_favorite("Paris, FR").unwrap();
    app.handle.add_favorite("paris, fr").unwrap();
    app.handle.remove_favorite("PARIS, FR").unwrap();

    let mut lists = Vec::new();
    for _ in 0..2 {
        if let Event::FavoritesChanged { favorites, .. } = app.next().await {
            lists.push(favorites);
        }
    }
    assert_eq!(lists, vec![vec!["Paris, FR".to_string()], vec![]]);

    let saved = std::fs::read_to_string(app._data.path().join("favorites.json")).unwrap();
    assert_eq!(serde_json::from_str::<Vec<String>>(&saved).unwrap(), Vec::<String>::new());
}
