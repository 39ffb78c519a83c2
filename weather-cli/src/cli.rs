use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, Select, Text};
use tokio::sync::mpsc::UnboundedReceiver;
use weather_core::{
    Config, ControllerHandle, Event, Favorites, FetchKind, JsonFileStore, WeatherService,
    controller, provider::provider_from_config,
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Show current weather and the daily forecast.
    Show {
        /// City name; defaults to the first favorite.
        city: Option<String>,

        /// Print raw events as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Search for a location interactively.
    Search {
        /// Initial query; prompted for if absent.
        query: Option<String>,
    },

    /// Manage favorite locations.
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Download a weather icon, e.g. `10d`.
    Icon {
        code: String,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    /// List saved locations.
    List,
    /// Add a location, e.g. "Berlin, DE".
    Add { name: String },
    /// Remove a location (case-insensitive).
    Remove { name: String },
    /// Replace the saved order with the given names.
    Reorder {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// A running controller plus the stream of its events.
struct Session {
    handle: ControllerHandle,
    events: UnboundedReceiver<Event>,
}

impl Session {
    fn start(config: &Config, favorites: Favorites) -> anyhow::Result<Self> {
        let provider = provider_from_config(config.api_config()?)?;
        tracing::debug!(favorites = favorites.len(), "starting weather controller");

        let (handle, events, _task) =
            controller::spawn(WeatherService::new(provider), favorites, &config.search);
        Ok(Self { handle, events })
    }

    async fn next(&mut self) -> anyhow::Result<Event> {
        self.events.recv().await.context("weather controller stopped unexpectedly")
    }

    /// Print events until both the weather and the forecast have finished.
    async fn print_results(&mut self, json: bool) -> anyhow::Result<()> {
        let (mut weather_done, mut forecast_done) = (false, false);

        while !(weather_done && forecast_done) {
            let event = self.next().await?;
            if json {
                println!("{}", serde_json::to_string(&event)?);
            }

            match event {
                Event::WeatherReady(weather) => {
                    weather_done = true;
                    if !json {
                        println!("{}\n", output::format_weather(&weather));
                    }
                }
                Event::ForecastReady(days) => {
                    forecast_done = true;
                    if !json {
                        println!("Forecast:\n{}\n", output::format_forecast(&days));
                    }
                }
                Event::Error { kind, message } => {
                    match kind {
                        FetchKind::Weather => weather_done = true,
                        FetchKind::Forecast => forecast_done = true,
                    }
                    if !json {
                        eprintln!("Failed to fetch {kind} data: {message}\n");
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Stop the controller and report any favorites changes still queued.
    async fn finish(mut self) -> anyhow::Result<()> {
        self.handle.shutdown()?;
        while let Some(event) = self.events.recv().await {
            if let Event::FavoritesChanged { change, .. } = event {
                println!("{}", output::format_change(&change));
            }
        }
        Ok(())
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, json } => show(city, json).await,
            Command::Search { query } => search(query).await,
            Command::Favorites { action } => favorites(action),
            Command::Icon { code, output } => icon(&code, &output).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    let mut cfg = Config::load_from(&path)?;

    if cfg.is_configured() {
        let replace = Confirm::new("An API key is already configured. Replace it?")
            .with_default(false)
            .prompt()
            .context("Failed to read confirmation")?;
        if !replace {
            return Ok(());
        }
    }

    let key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if key.trim().is_empty() {
        bail!("API key cannot be empty");
    }

    cfg.set_api_key(key);
    cfg.save_to(&path)?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn show(city: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let favorites = load_favorites()?;
    ensure_show_target(city.as_deref(), &favorites)?;

    let mut session = Session::start(&config, favorites)?;
    match city {
        Some(city) => session.handle.search(&city)?,
        None => session.handle.load_first_favorite()?,
    }

    session.print_results(json).await?;
    session.finish().await
}

/// `show` without a city needs at least one favorite to fall back on.
fn ensure_show_target(city: Option<&str>, favorites: &Favorites) -> anyhow::Result<()> {
    if city.is_none() && favorites.is_empty() {
        bail!("No city given and no favorites saved.\nHint: run `weather show <CITY>`.");
    }
    Ok(())
}

async fn search(query: Option<String>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut session = Session::start(&config, load_favorites()?)?;

    let query = match query {
        Some(query) => query,
        None => Text::new("City:").prompt().context("Failed to read search text")?,
    };

    if query.trim().chars().count() < config.search.min_query_chars {
        bail!("Type at least {} characters to search", config.search.min_query_chars);
    }

    session.handle.query_text_changed(query)?;

    let candidates = loop {
        if let Event::CandidatesUpdated(candidates) = session.next().await? {
            break candidates;
        }
    };

    if candidates.is_empty() {
        println!("No matching locations");
        return session.finish().await;
    }

    let names: Vec<String> = candidates.iter().map(|c| c.display_name()).collect();
    let chosen = Select::new("Location:", names)
        .raw_prompt()
        .context("Failed to read location choice")?;

    session.handle.select_candidate(chosen.index)?;
    session.print_results(false).await?;

    let add = Confirm::new(&format!("Add {} to favorites?", chosen.value))
        .with_default(false)
        .prompt()
        .unwrap_or(false);
    if add {
        session.handle.add_current_to_favorites()?;
    }

    session.finish().await
}

fn load_favorites() -> anyhow::Result<Favorites> {
    Ok(Favorites::load(Box::new(JsonFileStore::default_location()?)))
}

fn favorites(action: FavoritesAction) -> anyhow::Result<()> {
    let mut favorites = load_favorites()?;

    let change = match action {
        FavoritesAction::List => {
            if favorites.is_empty() {
                println!("No favorites saved");
            }
            for (i, name) in favorites.list().iter().enumerate() {
                println!("{:>2}. {name}", i + 1);
            }
            return Ok(());
        }
        FavoritesAction::Add { name } => {
            if favorites.is_favorite(&name) {
                println!("This city is already in your favorites");
                return Ok(());
            }
            favorites.add(&name)
        }
        FavoritesAction::Remove { name } => favorites.remove(&name),
        FavoritesAction::Reorder { names } => Some(favorites.reorder(names)),
    };

    match change {
        Some(change) => println!("{}", output::format_change(&change)),
        None => println!("Nothing changed"),
    }
    Ok(())
}

async fn icon(code: &str, output: &Path) -> anyhow::Result<()> {
    let config = Config::load()?;
    let service = WeatherService::new(provider_from_config(config.api_config()?)?);

    let bytes = service.icon(code).await?;
    std::fs::write(output, bytes.as_slice())
        .with_context(|| format!("Failed to write icon to {}", output.display()))?;

    println!("Saved icon {code} to {}", output.display());
    Ok(())
}
