/// Duet Sim - two playback surfaces on one in-process bus
mod scenarios;
mod surface;

use clap::{Parser, Subcommand, ValueEnum};
use duet_playback::EngineConfig;
use scenarios::Scenario;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "duet-sim")]
#[command(about = "Drive a main surface and a miniplayer through playback scenarios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted scenario
    Scenario {
        /// Scenario to run
        #[arg(value_enum)]
        name: ScenarioName,

        /// Number of generated tracks in the queue
        #[arg(short, long, default_value_t = 8)]
        tracks: usize,

        /// Engine configuration file (TOML)
        #[arg(short, long, env = "DUET_SIM_CONFIG")]
        config: Option<PathBuf>,

        /// Seed for the shuffle source
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioName {
    /// Changes on either surface reach the other exactly once
    Echo,
    /// Smart shuffle over many transitions
    Shuffle,
    /// Repeat off, all and one at the end of the queue
    Repeat,
    /// Sync is held off while a crossfade runs
    Crossfade,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duet_sim=info,duet_playback=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scenario {
            name,
            tracks,
            config,
            seed,
        } => {
            anyhow::ensure!(tracks > 0, "--tracks must be at least 1");

            let config = EngineConfig::load(config.as_deref())?;
            tracing::info!(scenario = ?name, tracks, seed, "Running scenario");

            let scenario = Scenario::new(config, tracks, seed);
            match name {
                ScenarioName::Echo => scenarios::echo(&scenario)?,
                ScenarioName::Shuffle => scenarios::shuffle(&scenario)?,
                ScenarioName::Repeat => scenarios::repeat(&scenario)?,
                ScenarioName::Crossfade => scenarios::crossfade(&scenario)?,
            }
        }
    }

    Ok(())
}
