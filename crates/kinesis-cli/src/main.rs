//! kinesis - headless runner for the first-person character controllers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kinesis_controller::ControllerConfig;
use std::path::{Path, PathBuf};

mod scenario;
mod sim;

use scenario::Scenario;

#[derive(Parser)]
#[command(name = "kinesis")]
#[command(about = "Drive character controllers through scripted physics scenarios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted scenario against a Rapier scene
    Simulate {
        /// Scenario TOML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Controller config TOML file (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print one JSON object per frame instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Validate a controller config file and print the effective values
    CheckConfig {
        /// Config TOML file
        file: PathBuf,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Logs go to stderr so `--json` output stays machine readable.
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            scenario,
            config,
            json,
        } => simulate(&scenario, config.as_deref(), json)?,
        Commands::CheckConfig { file } => check_config(&file)?,
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<ControllerConfig> {
    ControllerConfig::load(path).with_context(|| format!("Invalid config {}", path.display()))
}

fn simulate(scenario: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let scenario = Scenario::load(scenario)?;
    let config = match config {
        Some(path) => load_config(path)?,
        None => ControllerConfig::default(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    sim::run(&scenario, &config, json, &mut out)?;
    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let effective = toml::to_string_pretty(&config).context("Failed to render config")?;
    println!("{} is valid\n", path.display());
    print!("{effective}");
    Ok(())
}
