//! Single-writer actor tying search, fetches and favorites together.
//!
//! All state lives in one task. Network work runs in spawned tasks which
//! send their tagged result back on an internal channel, so every reply is
//! handled to completion before the next command, reply or timer.

use serde::Serialize;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};

use crate::{
    config::SearchSettings,
    error::WeatherError,
    favorites::{FavoriteChange, Favorites},
    model::{CurrentWeather, DailyForecast, FetchKind, LocationCandidate, PendingFetch, city_from_display},
    search::{LookupTicket, SearchDebouncer, TextChange},
    service::WeatherService,
};

/// Everything the core reports upward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    CandidatesUpdated(Vec<LocationCandidate>),
    LocationSelected { display_name: String, latitude: f64, longitude: f64 },
    WeatherReady(CurrentWeather),
    ForecastReady(Vec<DailyForecast>),
    Error { kind: FetchKind, message: String },
    FavoritesChanged { change: FavoriteChange, favorites: Vec<String> },
}

#[derive(Debug)]
enum Command {
    QueryTextChanged(String),
    SelectCandidate(usize),
    Search(String),
    Clear,
    AddFavorite(String),
    AddCurrentToFavorites,
    RemoveFavorite(String),
    ReorderFavorites(Vec<String>),
    LoadFavorite(String),
    LoadFirstFavorite,
    Shutdown,
}

#[derive(Debug)]
enum Reply {
    Lookup { generation: u64, candidates: Vec<LocationCandidate> },
    Weather { fetch: PendingFetch, result: Result<CurrentWeather, WeatherError> },
    Forecast { fetch: PendingFetch, result: Result<Vec<DailyForecast>, WeatherError> },
}

/// Current generation per fetch kind. A reply is only used if its tag is
/// still the current one.
#[derive(Debug, Default)]
struct FetchGenerations {
    weather: u64,
    forecast: u64,
}

impl FetchGenerations {
    fn slot(&mut self, kind: FetchKind) -> &mut u64 {
        match kind {
            FetchKind::Weather => &mut self.weather,
            FetchKind::Forecast => &mut self.forecast,
        }
    }

    fn issue(&mut self, kind: FetchKind, location: &str) -> PendingFetch {
        let slot = self.slot(kind);
        *slot += 1;
        PendingFetch { kind, generation: *slot, location: location.to_string() }
    }

    fn is_current(&mut self, fetch: &PendingFetch) -> bool {
        *self.slot(fetch.kind) == fetch.generation
    }

    fn invalidate_all(&mut self) {
        self.weather += 1;
        self.forecast += 1;
    }
}

/// Cloneable sender side of the controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    fn send(&self, command: Command) -> Result<(), WeatherError> {
        self.commands.send(command).map_err(|_| WeatherError::ControllerClosed)
    }

    /// The search field changed.
    pub fn query_text_changed(&self, text: impl Into<String>) -> Result<(), WeatherError> {
        self.send(Command::QueryTextChanged(text.into()))
    }

    /// Pick candidate `index` from the latest `CandidatesUpdated` list.
    pub fn select_candidate(&self, index: usize) -> Result<(), WeatherError> {
        self.send(Command::SelectCandidate(index))
    }

    /// Fetch weather and forecast for `location`.
    ///
    /// Empty input is rejected here, before anything is queued.
    pub fn search(&self, location: &str) -> Result<(), WeatherError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(WeatherError::EmptyLocation);
        }
        self.send(Command::Search(location.to_string()))
    }

    pub fn clear(&self) -> Result<(), WeatherError> {
        self.send(Command::Clear)
    }

    pub fn add_favorite(&self, name: impl Into<String>) -> Result<(), WeatherError> {
        self.send(Command::AddFavorite(name.into()))
    }

    /// Add the selected location, or the latest weather's `city, country`.
    ///
    /// Ignored until valid weather has been shown.
    pub fn add_current_to_favorites(&self) -> Result<(), WeatherError> {
        self.send(Command::AddCurrentToFavorites)
    }

    pub fn remove_favorite(&self, name: impl Into<String>) -> Result<(), WeatherError> {
        self.send(Command::RemoveFavorite(name.into()))
    }

    pub fn reorder_favorites(&self, order: Vec<String>) -> Result<(), WeatherError> {
        self.send(Command::ReorderFavorites(order))
    }

    /// Search the city part of a favorites entry.
    pub fn load_favorite(&self, entry: impl Into<String>) -> Result<(), WeatherError> {
        self.send(Command::LoadFavorite(entry.into()))
    }

    pub fn load_first_favorite(&self) -> Result<(), WeatherError> {
        self.send(Command::LoadFirstFavorite)
    }

    pub fn shutdown(&self) -> Result<(), WeatherError> {
        self.send(Command::Shutdown)
    }
}

/// Start the controller on the current tokio runtime.
pub fn spawn(
    service: WeatherService,
    favorites: Favorites,
    settings: &SearchSettings,
) -> (ControllerHandle, mpsc::UnboundedReceiver<Event>, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();

    let controller = Controller {
        service,
        favorites,
        search: SearchDebouncer::new(settings),
        generations: FetchGenerations::default(),
        current_weather: None,
        events: event_tx,
        replies: reply_tx,
    };

    let task = tokio::spawn(controller.run(command_rx, reply_rx));
    (ControllerHandle { commands: command_tx }, event_rx, task)
}

struct Controller {
    service: WeatherService,
    favorites: Favorites,
    search: SearchDebouncer,
    generations: FetchGenerations,
    current_weather: Option<CurrentWeather>,
    events: mpsc::UnboundedSender<Event>,
    replies: mpsc::UnboundedSender<Reply>,
}

impl Controller {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut replies: mpsc::UnboundedReceiver<Reply>,
    ) {
        loop {
            let deadline = self.search.deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(reply) = replies.recv() => self.handle_reply(reply),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.handle_timer();
                }
            }
        }

        tracing::debug!("weather controller stopped");
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::QueryTextChanged(text) => {
                if self.search.on_text_changed(&text, Instant::now()) == TextChange::Cleared {
                    self.emit(Event::CandidatesUpdated(Vec::new()));
                }
            }
            Command::SelectCandidate(index) => self.select_candidate(index),
            Command::Search(location) => {
                self.search.forget_selection();
                self.dispatch(&location);
            }
            Command::Clear => {
                self.search.clear();
                self.generations.invalidate_all();
                self.current_weather = None;
                self.emit(Event::CandidatesUpdated(Vec::new()));
            }
            Command::AddFavorite(name) => {
                let change = self.favorites.add(&name);
                self.favorites_changed(change);
            }
            Command::AddCurrentToFavorites => self.add_current_to_favorites(),
            Command::RemoveFavorite(name) => {
                let change = self.favorites.remove(&name);
                self.favorites_changed(change);
            }
            Command::ReorderFavorites(order) => {
                let change = self.favorites.reorder(order);
                self.favorites_changed(Some(change));
            }
            Command::LoadFavorite(entry) => self.load_favorite(&entry),
            Command::LoadFirstFavorite => match self.favorites.first().map(str::to_string) {
                Some(first) => self.load_favorite(&first),
                None => tracing::debug!("no favorites to load"),
            },
            // handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn handle_timer(&mut self) {
        if let Some(ticket) = self.search.on_timer_expired() {
            self.lookup(ticket);
        }
    }

    fn lookup(&self, ticket: LookupTicket) {
        tracing::debug!(query = %ticket.query, generation = ticket.generation, "geocoding lookup");

        let service = self.service.clone();
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let candidates = service.lookup_locations(&ticket.query).await;
            let _ = replies.send(Reply::Lookup { generation: ticket.generation, candidates });
        });
    }

    fn select_candidate(&mut self, index: usize) {
        let Some(candidate) = self.search.select(index) else {
            tracing::warn!(index, "no candidate at index");
            return;
        };

        self.emit(Event::CandidatesUpdated(Vec::new()));
        self.emit(Event::LocationSelected {
            display_name: candidate.display_name(),
            latitude: candidate.latitude,
            longitude: candidate.longitude,
        });
        self.dispatch(&candidate.name);
    }

    fn load_favorite(&mut self, entry: &str) {
        let city = city_from_display(entry);
        if city.is_empty() {
            tracing::warn!(favorite = entry, "favorite has no city part");
            return;
        }
        self.search.set_text_silently(entry);
        self.search.forget_selection();
        self.dispatch(city);
    }

    /// Needs valid current weather; names it after the selected candidate
    /// when there is one.
    fn add_current_to_favorites(&mut self) {
        let Some(weather) = self.current_weather.as_ref().filter(|w| w.is_valid()) else {
            tracing::warn!("no current weather to add to favorites");
            return;
        };

        let name = match self.search.selected() {
            Some(candidate) => candidate.display_name(),
            None => format!("{}, {}", weather.city_name, weather.country_code),
        };

        let change = self.favorites.add(&name);
        self.favorites_changed(change);
    }

    fn favorites_changed(&self, change: Option<FavoriteChange>) {
        if let Some(change) = change {
            self.emit(Event::FavoritesChanged { change, favorites: self.favorites.list().to_vec() });
        }
    }

    /// Fire independent weather and forecast fetches for `location`.
    ///
    /// Issuing new tags supersedes any fetch of the same kind still in flight.
    fn dispatch(&mut self, location: &str) {
        for &kind in FetchKind::all() {
            let fetch = self.generations.issue(kind, location);
            tracing::debug!(%kind, location, generation = fetch.generation, "dispatching fetch");

            let service = self.service.clone();
            let replies = self.replies.clone();
            tokio::spawn(async move {
                let reply = match fetch.kind {
                    FetchKind::Weather => {
                        let result = service.current_weather(&fetch.location).await;
                        Reply::Weather { fetch, result }
                    }
                    FetchKind::Forecast => {
                        let result = service.daily_forecast(&fetch.location).await;
                        Reply::Forecast { fetch, result }
                    }
                };
                let _ = replies.send(reply);
            });
        }
    }

    fn handle_reply(&mut self, reply: Reply) {
        match reply {
            Reply::Lookup { generation, candidates } => {
                if self.search.on_lookup_finished(generation, candidates) {
                    self.emit(Event::CandidatesUpdated(self.search.candidates().to_vec()));
                } else {
                    tracing::debug!(generation, "dropping superseded lookup reply");
                }
            }
            Reply::Weather { fetch, result } => {
                if !self.accept(&fetch) {
                    return;
                }
                match result {
                    Ok(weather) => {
                        self.current_weather = Some(weather.clone());
                        self.emit(Event::WeatherReady(weather));
                    }
                    Err(e) => self.fail(fetch.kind, e),
                }
            }
            Reply::Forecast { fetch, result } => {
                if !self.accept(&fetch) {
                    return;
                }
                match result {
                    Ok(days) => self.emit(Event::ForecastReady(days)),
                    Err(e) => self.fail(fetch.kind, e),
                }
            }
        }
    }

    fn accept(&mut self, fetch: &PendingFetch) -> bool {
        let current = self.generations.is_current(fetch);
        if !current {
            tracing::debug!(
                kind = %fetch.kind,
                location = %fetch.location,
                generation = fetch.generation,
                "dropping superseded reply"
            );
        }
        current
    }

    fn fail(&self, kind: FetchKind, error: WeatherError) {
        tracing::info!(%kind, error = %error, "fetch failed");
        self.emit(Event::Error { kind, message: error.to_string() });
    }
}
