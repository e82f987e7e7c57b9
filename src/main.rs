//! Battle Forecast - command line entry point
//!
//! Runs a remote forecast batch against a ledger endpoint and prints the
//! aggregated outcome. Ctrl-C cancels the batch and prints the partial result.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use battle_forecast::combat::SkirmishResolver;
use battle_forecast::core::error::{ForecastError, Result};
use battle_forecast::core::types::{Address, StageId};
use battle_forecast::core::ForecastConfig;
use battle_forecast::gateway::{HttpGateway, TimeoutGateway};
use battle_forecast::sheets::TableSheets;
use battle_forecast::simulation::{
    ProgressCallback, RemoteRequest, SeedPolicy, SimulationContext, Target,
};
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Battle Forecast - win-rate and stage-clear estimates from ledger state
#[derive(Parser, Debug)]
#[command(name = "battle-forecast")]
#[command(about = "Estimate arena win rates and stage clear tiers without sending a transaction")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Avatar to simulate
    #[arg(long, global = true)]
    avatar: Option<Address>,

    /// Ledger endpoint (overrides the config file)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Rule tables
    #[arg(long, global = true, default_value = "data/sheets.toml")]
    sheets: PathBuf,

    /// Forecast config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of trials (defaults to the configured trial count)
    #[arg(long, global = true, allow_negative_numbers = true)]
    trials: Option<i64>,

    /// Fixed base seed for a reproducible batch
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Also print the aggregate as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Play a stage against its waves
    Stage {
        /// Stage id from the rule tables
        #[arg(long)]
        stage: StageId,
    },
    /// Fight another avatar in the arena
    Arena {
        /// Opponent avatar address
        #[arg(long)]
        opponent: Address,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("battle_forecast=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ForecastConfig::load_from_toml(path)?,
        None => ForecastConfig::default(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    config.validate()?;

    let avatar = args
        .avatar
        .ok_or_else(|| ForecastError::Config("--avatar is required".into()))?;
    let target = match args.mode {
        Mode::Stage { stage } => Target::Stage(stage),
        Mode::Arena { opponent } => Target::Opponent(opponent),
    };
    let trials = args.trials.unwrap_or_else(|| i64::from(config.default_trial_count));

    let sheets = TableSheets::load_from_toml(&args.sheets)?;
    tracing::info!(
        characters = sheets.characters.len(),
        stages = sheets.stages.len(),
        "rule tables loaded"
    );

    let gateway = TimeoutGateway::new(HttpGateway::from_config(&config)?, config.fetch_timeout());
    let resolver = SkirmishResolver::from_config(&config);
    let context = Arc::new(SimulationContext::new(gateway, sheets, resolver, config));

    let mut request = RemoteRequest::new(trials, avatar, target);
    if let Some(seed) = args.seed {
        request.seeds = SeedPolicy::Replay(seed);
    }

    let rt = Runtime::new()?;
    let report = rt.block_on(async {
        let total = trials.max(1) as usize;
        let step = (total / 100).max(1);
        let progress: ProgressCallback = Arc::new(move |completed: usize| {
            if completed % step == 0 || completed == total {
                eprint!("\r{}/{}", completed, total);
                let _ = std::io::stderr().flush();
            }
        });

        let handle = context.spawn_remote(request, Some(progress));
        let control = handle.control().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling batch");
                control.cancel();
            }
        });
        handle.wait().await
    });
    eprintln!();
    let report = report?;

    println!("\n=== FORECAST ===");
    println!("Avatar: {}", avatar);
    match target {
        Target::Stage(stage) => println!("Stage: {}", stage),
        Target::Opponent(opponent) => println!("Opponent: {}", opponent),
    }
    println!(
        "Trials: {}/{}{}",
        report.completed(),
        report.requested,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    println!("Base seed: {}", report.base_seed);
    println!();
    println!("{}", report.result.summary());

    if args.json {
        println!("\n{}", report.result.to_json());
    }

    Ok(())
}
