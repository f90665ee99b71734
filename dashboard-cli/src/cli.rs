use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dashboard_core::{
    Config, ConnectionClass, ManualProbe, ReachabilityMonitor, SearchCoordinator, StoreOptions, WeatherRecord,
    WeatherStore, client_from_config, probe_reachability,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Live weather dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key.
    Configure,

    /// Show live weather, refreshing periodically. Reads commands from stdin.
    Watch {
        /// City to start with; defaults to the first configured city.
        #[arg(long)]
        city: Option<String>,

        /// Connection class to report while reachable (wifi, mobile, ethernet,
        /// unknown). Overrides the configured one.
        #[arg(long, value_parser = parse_class)]
        class: Option<ConnectionClass>,
    },

    /// Look up a city once and print what was found.
    Search {
        query: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Watch { city, class } => {
                let mut config = Config::load()?;
                if let Some(class) = class {
                    config.connection_class = class;
                }
                watch(config, city).await
            }
            Command::Search { query } => search(Config::load()?, &query).await,
        }
    }
}

fn parse_class(value: &str) -> Result<ConnectionClass, String> {
    ConnectionClass::try_from(value).map_err(|err| err.to_string())
}

/// A line typed while watching.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Intent {
    City(String),
    Refresh,
    Retry,
    Check,
    Dismiss,
    Search(String),
    Pick(usize),
    Close,
    Pause,
    Resume,
    Help,
    Quit,
}

fn parse_intent(line: &str) -> Result<Intent, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let intent = match word.to_lowercase().as_str() {
        "city" | "c" if !rest.is_empty() => Intent::City(rest.to_string()),
        "city" | "c" => return Err("usage: city NAME".to_string()),
        "refresh" | "r" => Intent::Refresh,
        "retry" => Intent::Retry,
        "check" => Intent::Check,
        "dismiss" => Intent::Dismiss,
        "search" | "s" => Intent::Search(rest.to_string()),
        "pick" | "p" => {
            let n: usize = rest.parse().map_err(|_| "usage: pick N".to_string())?;
            if n == 0 {
                return Err("results are numbered from 1".to_string());
            }
            Intent::Pick(n)
        }
        "close" => Intent::Close,
        "pause" => Intent::Pause,
        "resume" => Intent::Resume,
        "help" | "?" => Intent::Help,
        "quit" | "q" | "exit" => Intent::Quit,
        "" => return Err(String::new()),
        other => return Err(format!("unknown command '{other}', type `help`")),
    };
    Ok(intent)
}

const HELP: &str = "commands: city NAME | refresh | retry | check | dismiss | search QUERY | \
                    pick N | close | pause | resume | help | quit";

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = inquire::Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    cfg.set_api_key(api_key);
    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn connectivity(config: &Config) -> Arc<ManualProbe> {
    let initial = probe_reachability(
        &config.reachability_host,
        config.connection_class,
        config.request_timeout(),
    )
    .await;
    Arc::new(ManualProbe::new(initial))
}

async fn watch(config: Config, city: Option<String>) -> anyhow::Result<()> {
    let client = Arc::new(client_from_config(&config)?);
    let probe = connectivity(&config).await;
    let monitor = ReachabilityMonitor::spawn(
        Arc::clone(&probe),
        config.reachability_host.clone(),
        config.connection_class,
        config.reachability_interval(),
    );

    let mut options = StoreOptions::from_config(&config);
    if let Some(city) = city {
        options.initial_city = city;
    }
    let store = WeatherStore::create(client, probe, options);

    println!("cities: {}", config.cities.join(", "));
    println!("{HELP}");

    let mut states = store.subscribe();
    println!("{}", render::state_line(&store.current_city(), &states.borrow_and_update()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut results: Vec<WeatherRecord> = Vec::new();

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                println!("{}", render::state_line(&store.current_city(), &state));
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_intent(&line) {
                    Ok(Intent::Quit) => break,
                    Ok(intent) => dispatch(&store, intent, &mut results).await,
                    Err(msg) if msg.is_empty() => {}
                    Err(msg) => println!("{msg}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    store.dispose();
    monitor.stop();
    Ok(())
}

async fn dispatch(store: &WeatherStore, intent: Intent, results: &mut Vec<WeatherRecord>) {
    match intent {
        Intent::City(city) => store.select_city(&city),
        Intent::Refresh => store.refresh_weather(),
        Intent::Retry => store.retry(),
        Intent::Check => store.check_network_and_retry(),
        Intent::Dismiss => store.dismiss_network_dialog(),
        Intent::Search(query) => {
            store.show_search();
            *results = match store.search(&query).await {
                Ok(found) if found.is_empty() => {
                    println!("No cities found for '{query}'");
                    found
                }
                Ok(found) => found,
                Err(err) => {
                    println!("Error searching: {err}");
                    Vec::new()
                }
            };
            for (i, record) in results.iter().enumerate() {
                println!("  {}. {}", i + 1, render::record_line(record));
            }
        }
        Intent::Pick(n) => match results.get(n - 1) {
            Some(record) => store.select_search_result(record),
            None => println!("no search result #{n}"),
        },
        Intent::Close => store.hide_search(),
        Intent::Pause => store.on_background(),
        Intent::Resume => store.on_foreground(),
        Intent::Help => println!("{HELP}"),
        Intent::Quit => {}
    }
}

async fn search(config: Config, query: &str) -> anyhow::Result<()> {
    let client = Arc::new(client_from_config(&config)?);
    let probe = connectivity(&config).await;
    let coordinator = SearchCoordinator::new(client, probe);

    let found = coordinator.search(query).await?;
    if found.is_empty() {
        println!("No cities found for '{query}'");
    }
    for record in &found {
        println!("{}", render::record_line(record));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(parse_intent("city New York"), Ok(Intent::City("New York".into())));
        assert_eq!(parse_intent("  c   Tokyo "), Ok(Intent::City("Tokyo".into())));
        assert_eq!(parse_intent("search Par"), Ok(Intent::Search("Par".into())));
        assert_eq!(parse_intent("pick 2"), Ok(Intent::Pick(2)));
        assert_eq!(parse_intent("REFRESH"), Ok(Intent::Refresh));
        assert_eq!(parse_intent("q"), Ok(Intent::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_intent("city").unwrap_err().contains("usage"));
        assert!(parse_intent("pick zero").unwrap_err().contains("usage"));
        assert!(parse_intent("pick 0").is_err());
        assert!(parse_intent("fly").unwrap_err().contains("unknown command"));
        assert_eq!(parse_intent("   "), Err(String::new()));
    }

    #[test]
    fn watch_accepts_connection_class_override() {
        let cli = Cli::try_parse_from(["weather-dashboard", "watch", "--class", "Mobile"])
            .expect("valid args");
        match cli.command {
            Command::Watch { city, class } => {
                assert_eq!(city, None);
                assert_eq!(class, Some(ConnectionClass::Mobile));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let err = Cli::try_parse_from(["weather-dashboard", "watch", "--class", "dialup"])
            .unwrap_err();
        assert!(err.to_string().contains("Unknown connection class 'dialup'"));
    }

    #[test]
    fn search_without_query_is_allowed() {
        // Short queries come back empty from the store.
        assert_eq!(parse_intent("search"), Ok(Intent::Search(String::new())));
    }
}
