mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::compute::ComputeArgs;
use commands::estimate::EstimateArgs;

/// Irregular internal rate of return over dated cash flows
#[derive(Parser)]
#[command(
    name = "xirr",
    version,
    about = "Irregular internal rate of return over dated cash flows",
    long_about = "Computes XIRR per group of dated cash flows. Rows are accumulated \
                  in input order, same-date neighbours are merged, and each group is \
                  solved with Newton-Raphson seeded by an annualized-return estimate."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver diagnostics to stderr (-v debug, -vv every iteration)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate XIRR for every group of cash flows
    Compute(ComputeArgs),
    /// Show the annualized-return seed and Newton iterations per group
    Estimate(EstimateArgs),
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

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "xirr_core=debug",
        _ => "xirr_core=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compute(args) => commands::compute::run_compute(args),
        Commands::Estimate(args) => commands::estimate::run_estimate(args),
        Commands::Version => {
            println!("xirr {}", env!("CARGO_PKG_VERSION"));
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
