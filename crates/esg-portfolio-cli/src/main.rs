mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::analyze::AnalyzeArgs;
use commands::optimize::OptimizeArgs;
use commands::prepare::PrepareArgs;
use commands::universe::UniverseArgs;

/// Currency-normalized ESG portfolio optimization
#[derive(Parser)]
#[command(
    name = "esgp",
    version,
    about = "Currency-normalized ESG portfolio optimization and analytics",
    long_about = "Prepare a daily returns table from multi-currency prices, then build \
                  max-return, min-volatility, ESG-tilted or equal-weight portfolios \
                  with annualized metrics and cumulative performance."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert prices to one currency and write the daily returns table
    Prepare(PrepareArgs),
    /// Optimize a portfolio and report metrics, allocation and performance
    Optimize(OptimizeArgs),
    /// Report metrics, allocation and performance for explicit weights
    Analyze(AnalyzeArgs),
    /// List the asset registry
    Universe(UniverseArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` overrides
/// the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Prepare(args) => commands::prepare::run_prepare(args),
        Commands::Optimize(args) => commands::optimize::run_optimize(args),
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Universe(args) => commands::universe::run_universe(args),
        Commands::Version => {
            println!("esgp {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
