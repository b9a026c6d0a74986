//! LMSR Calculator — Entry Point
//!
//! Evaluates one calculator operation over an SDK-style options object
//! and prints the result on stdout.
//!
//! Wiring sequence:
//! 1. Parse CLI arguments
//! 2. Load config.toml (optional) + validate
//! 3. Init tracing (stderr, optionally JSON)
//! 4. Read options JSON from the argument or stdin
//! 5. Evaluate and print

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use lmsr_calculator::adapters::options::Operation;
use lmsr_calculator::config::{self, AppConfig};
use lmsr_calculator::domain::LmsrCalculator;

/// Off-chain LMSR market maker calculator
#[derive(Parser, Debug)]
#[command(name = "lmsr-calculator")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Significant digits, overriding the configuration
    #[arg(long, value_name = "N")]
    precision: Option<u32>,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Operation to evaluate
    #[arg(value_enum)]
    operation: Operation,

    /// Options object, e.g. '{"netOutcomeTokensSold":[0,0],"funding":1e18,...}'.
    /// Read from stdin when omitted.
    options: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ────────────────────────────────
    let mut config = config::loader::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(precision) = cli.precision {
        config.calculator.precision = precision;
        config::loader::validate_config(&config).context("Invalid --precision")?;
    }

    // ── 2. Initialize logging ────────────────────────────────
    init_tracing(&config);

    // ── 3. Read options ──────────────────────────────────────
    let raw = match cli.options {
        Some(raw) => raw,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read options from stdin")?;
            buffer
        }
    };
    let options: serde_json::Value =
        serde_json::from_str(raw.trim()).context("Options must be a JSON object")?;

    // ── 4. Evaluate ──────────────────────────────────────────
    let calculator = LmsrCalculator::with_precision(config.calculator.precision)?;
    debug!(
        operation = %cli.operation,
        precision = config.calculator.precision,
        "Evaluating"
    );
    let result = cli
        .operation
        .evaluate(&calculator, &options)
        .with_context(|| format!("Failed to evaluate {}", cli.operation))?;
    info!(operation = %cli.operation, %result, "Evaluated");

    if cli.json {
        let output = serde_json::json!({
            "operation": cli.operation.to_string(),
            "result": result,
        });
        println!("{output}");
    } else {
        println!("{result}");
    }
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
