mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::convert::ConvertRateArgs;
use commands::invoice::InvoiceArgs;
use commands::settle::SettleArgs;

/// Export-agent invoice and tax rebate calculations
#[derive(Parser)]
#[command(
    name = "eri",
    version,
    about = "Export-agent invoice and tax rebate calculations",
    long_about = "A CLI for export-trade billing-agent arithmetic with decimal precision. \
                  Solves single-party invoice amounts under both rebate-sharing formula \
                  variants, allocates a total invoice across multi-factory consignments, \
                  settles per-factory cash flows, and converts between absolute and \
                  relative agent rate representations."
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
    /// Solve the invoice amount for a single sales transaction
    Invoice(InvoiceArgs),
    /// Allocate and settle a multi-factory consignment from a CSV file
    Settle(SettleArgs),
    /// Convert between absolute points and relative share of the rebate
    ConvertRate(ConvertRateArgs),
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

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Invoice(args) => commands::invoice::run_invoice(args),
        Commands::Settle(args) => commands::settle::run_settle(args),
        Commands::ConvertRate(args) => commands::convert::run_convert_rate(args),
        Commands::Version => {
            println!("eri {}", env!("CARGO_PKG_VERSION"));
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
