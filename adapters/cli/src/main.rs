#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the spawn director headlessly.

mod session;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use spawn_director_core::{CardCatalog, DirectorConfig};
use spawn_director_system_director::SpawnDirector;
use spawn_director_world::{World, WorldRules};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::session::{Autoplay, Session};

const DEFAULT_CATALOG: &str = include_str!("../data/catalog.toml");

/// Simulates a run against the spawn director and reports what it did.
#[derive(Debug, Parser)]
#[command(name = "spawn-director", version, about)]
struct Cli {
    /// Director configuration file; built-in defaults when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Card catalog file; the bundled sample catalog when omitted.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    /// Simulated seconds to run.
    #[arg(long, default_value_t = 300.0)]
    seconds: f32,
    /// Fixed tick length in milliseconds.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Overrides the session seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Seconds an ordinary hostile survives before the autoplayer kills it.
    #[arg(long, default_value_t = 4.0)]
    hostile_lifetime: f32,
    /// Damage per second the autoplayer deals to a vulnerable boss.
    #[arg(long, default_value_t = 300.0)]
    boss_dps: f32,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Entry point for the spawn director command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            DirectorConfig::from_toml_str(&contents)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => DirectorConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let catalog = match &cli.catalog {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            CardCatalog::from_toml_str(&contents)
                .with_context(|| format!("invalid catalog {}", path.display()))?
        }
        None => CardCatalog::from_toml_str(DEFAULT_CATALOG).context("invalid bundled catalog")?,
    };

    ensure!(cli.tick_ms > 0, "--tick-ms must be positive");
    let duration = Duration::try_from_secs_f32(cli.seconds).context("invalid --seconds")?;
    let hostile_lifetime =
        Duration::try_from_secs_f32(cli.hostile_lifetime).context("invalid --hostile-lifetime")?;

    info!(
        seed = config.seed,
        cards = catalog.cards().len(),
        seconds = cli.seconds,
        "starting headless run"
    );
    let director = SpawnDirector::new(config, catalog).context("director rejected setup")?;
    let mut session = Session::new(
        World::new(WorldRules::default()),
        director,
        Autoplay {
            hostile_lifetime,
            boss_dps: cli.boss_dps,
        },
    );
    session.run(duration, Duration::from_millis(cli.tick_ms));

    println!("{}", session.summary());
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
