//--------------------------------------------------------------------------------------------------
// MASLOV ORDER BOOK SIMULATOR
//--------------------------------------------------------------------------------------------------
// Generates Maslov order flow, feeds it through an OrderBook and prints a JSON report.
//
// Configuration layers, lowest precedence first: defaults, --config JSON file, LOB_* environment
// variables (.env honoured), command line flags.
//--------------------------------------------------------------------------------------------------

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maslov_lob::domain::services::simulation;
use maslov_lob::{OrderBook, SimulationConfig};

/// Command line arguments for the simulator
#[derive(Parser, Debug)]
#[command(author, version, about = "Maslov limit order book simulation")]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of orders to generate
    #[arg(short, long)]
    steps: Option<u64>,

    /// Reference price before the first trade
    #[arg(long)]
    price0: Option<i64>,

    /// Probability of a limit order
    #[arg(long)]
    p_limit: Option<f64>,

    /// Probability of a sell order
    #[arg(long)]
    p_sell: Option<f64>,

    /// Largest order size
    #[arg(long)]
    max_quantity: Option<u64>,

    /// Largest limit price offset from the reference price
    #[arg(long)]
    max_delta_price: Option<u64>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Log every cancelled order
    #[arg(short, long)]
    verbose: bool,

    /// Write the snapshot history to stdout as JSON lines
    #[arg(long)]
    dump_history: bool,
}

impl Args {
    fn apply(&self, mut config: SimulationConfig) -> SimulationConfig {
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(price0) = self.price0 {
            config.price0 = price0;
        }
        if let Some(p_limit) = self.p_limit {
            config.p_limit = p_limit;
        }
        if let Some(p_sell) = self.p_sell {
            config.p_sell = p_sell;
        }
        if let Some(max_quantity) = self.max_quantity {
            config.max_quantity = max_quantity;
        }
        if let Some(max_delta_price) = self.max_delta_price {
            config.max_delta_price = max_delta_price;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.verbose |= self.verbose;
        config
    }
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let base = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    let config = args.apply(base.with_env().context("Invalid LOB_* environment")?);
    config.validate().context("Invalid simulation parameters")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;
    info!("Starting simulation with {:?}", config);

    let mut book = OrderBook::verbose(config.verbose);
    let report = simulation::run(&config, &mut book).context("Simulation halted")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.dump_history {
        for snapshot in book.history() {
            serde_json::to_writer(&mut out, snapshot)?;
            writeln!(out)?;
        }
    }
    serde_json::to_writer_pretty(&mut out, &report)?;
    writeln!(out)?;
    out.flush()?;

    info!("Final book: {}", book);
    Ok(())
}
