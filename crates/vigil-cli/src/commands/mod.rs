//! CLI commands

pub mod indicators;
pub mod run;

use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Monitor traffic for stalkerware activity (main command)
    Run(run::RunArgs),

    /// Query the indicator store
    Indicators(indicators::IndicatorsArgs),
}
