use anyhow::Context;
use clap::{Parser, Subcommand};
use weather_core::{City, Config, HistoryStore, RequestHandler, WeatherReport, WeatherSnapshot};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather dashboard CLI and server")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key in the config file.
    Configure,

    /// Start the HTTP server for the browser client.
    Serve {
        /// Bind address, e.g. 0.0.0.0:3001. Defaults to the configured address.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Show current weather and the 5-day forecast for a city.
    Show {
        /// City name.
        city: String,
    },

    /// Inspect or edit the search history.
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List previously searched cities, oldest first.
    List,

    /// Delete a city from the history by id.
    Delete {
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Serve { addr } => {
                let config = Config::load()?.with_env_overrides();
                server::serve(&config, addr).await
            }
            Command::Show { city } => {
                let config = Config::load()?.with_env_overrides();
                let handler = RequestHandler::from_config(&config)?;

                let report = handler.search(Some(city.as_str())).await?;

                print!("{}", render_report(&report));
                Ok(())
            }
            Command::History { action } => {
                let config = Config::load()?.with_env_overrides();
                let store = HistoryStore::new(config.history_dir());

                match action {
                    HistoryCommand::List => {
                        print!("{}", render_history(&store.list().await));
                    }
                    HistoryCommand::Delete { id } => {
                        store.remove(&id).await?;
                        println!("City with ID {id} deleted from history");
                    }
                }
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Get one at https://home.openweathermap.org/api_keys")
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn render_snapshot(s: &WeatherSnapshot) -> String {
    format!(
        "{:<11} {:>6.1}°F  {:>3}% humidity  {:>5.1} mph  {}",
        s.date, s.temperature, s.humidity, s.wind_speed, s.description
    )
}

fn render_report(report: &WeatherReport) -> String {
    let mut out = format!("{} ({})\n", report.current.city, report.current.date);
    out.push_str(&format!("  Now:  {}\n", render_snapshot(&report.current)));

    if report.forecast.is_empty() {
        out.push_str("  No forecast available\n");
    } else {
        out.push_str("  Forecast:\n");
        for day in &report.forecast {
            out.push_str(&format!("    {}\n", render_snapshot(day)));
        }
    }

    out
}

fn render_history(cities: &[City]) -> String {
    if cities.is_empty() {
        return "No search history yet\n".to_string();
    }

    cities.iter().map(|c| format!("{}  {}\n", c.id, c.name)).collect()
}
