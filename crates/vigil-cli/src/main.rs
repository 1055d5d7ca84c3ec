//! Vigil CLI
//!
//! Command-line interface for the stalkerware traffic monitor.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    logging::init(&args)?;

    // Print banner
    if !args.quiet {
        print_banner();
    }

    // Run the main logic
    let result = run(args);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Some(commands::Command::Run(ref run_args)) => {
            commands::run::execute(&args, run_args.clone())
        }
        Some(commands::Command::Indicators(ref ind_args)) => {
            commands::indicators::execute(&args, ind_args.clone())
        }
        None => {
            // Default: monitor with defaults
            commands::run::execute(&args, commands::run::RunArgs::default())
        }
    }
}

fn print_banner() {
    use colored::Colorize;

    println!();
    println!("{}", "╔═══════════════════════════════════════════════╗".cyan());
    println!(
        "{}{}{}",
        "║  ".cyan(),
        "Vigil".green().bold(),
        "                                        ║".cyan()
    );
    println!(
        "{}{}{}",
        "║  ".cyan(),
        "Stalkerware traffic detection".white(),
        "                ║".cyan()
    );
    println!("{}", "╚═══════════════════════════════════════════════╝".cyan());
    println!();
}
