use clap::Parser;
use log::{error, info};
use pong_server::network::{Server, ServerConfig};
use pong_server::registry::{GameRegistry, MatchConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Ticks per second, overrides the registry value
    #[arg(short, long)]
    tick_rate: Option<f64>,

    /// Game mode (classicPong or multiplayerPong)
    #[arg(short, long)]
    mode: Option<String>,

    /// Number of seats, defaults to the mode minimum
    #[arg(short = 'n', long)]
    players: Option<usize>,

    /// Seats played by the server
    #[arg(short, long, default_value = "0")]
    ai: usize,

    /// Strategy of the AI seats: naive, improvedNaive, foresight or random
    #[arg(long, default_value = "naive")]
    ai_strategy: String,

    /// Seed for every random draw in the match
    #[arg(short, long)]
    seed: Option<u64>,

    /// Extra behavior unit, repeatable
    #[arg(long = "modifier")]
    modifiers: Vec<String>,

    /// Extra power-up, repeatable
    #[arg(long = "power-up")]
    power_ups: Vec<String>,

    /// Only use the units given with --modifier
    #[arg(long)]
    no_default_modifiers: bool,

    /// Only use the power-ups given with --power-up
    #[arg(long)]
    no_default_power_ups: bool,

    /// JSON registry replacing the built-in one
    #[arg(long)]
    registry: Option<PathBuf>,

    /// JSON match configuration, command line flags take precedence
    #[arg(long)]
    match_config: Option<PathBuf>,

    /// Seconds of silence before a client is dropped
    #[arg(long, default_value = "10")]
    client_timeout: u64,
}

fn build_config(args: &Args) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut registry = match &args.registry {
        Some(path) => GameRegistry::from_file(path)?,
        None => GameRegistry::builtin()?,
    };
    if let Some(tick_rate) = args.tick_rate {
        registry.server_tickrate_s = tick_rate;
    }

    let mut match_config = match &args.match_config {
        Some(path) => MatchConfig::from_file(path)?,
        None => MatchConfig::new("classicPong", 0),
    };
    if let Some(mode) = &args.mode {
        match_config.mode = mode.clone();
    }
    if let Some(players) = args.players {
        match_config.player_count = players;
    }
    if match_config.player_count == 0 {
        match_config.player_count = registry
            .game_modes
            .get(&match_config.mode)
            .map(|entry| entry.min_players)
            .unwrap_or(2);
    }
    if args.seed.is_some() {
        match_config.seed = args.seed;
    }
    if args.no_default_modifiers {
        match_config.use_default_modifiers = false;
    }
    if args.no_default_power_ups {
        match_config.use_default_power_ups = false;
    }
    for name in &args.modifiers {
        match_config.modifiers.entry(name.clone()).or_insert_with(|| serde_json::json!({}));
    }
    for name in &args.power_ups {
        match_config.power_ups.entry(name.clone()).or_insert_with(|| serde_json::json!({}));
    }

    let mut config = ServerConfig::new(registry, match_config);
    config.ai_count = args.ai;
    config.ai_strategy = args.ai_strategy.clone();
    config.client_timeout = Duration::from_secs(args.client_timeout);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;

    info!(
        "Starting {} server for {} players ({} AI)",
        config.match_config.mode, config.match_config.player_count, config.ai_count
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config).await?;
    let handle = server.handle();

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    tokio::select! {
        result = server_task => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
        }
    }

    Ok(())
}
