//! Indicators command - query the indicator store

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use vigil_core::indicators::IndicatorStore;

use crate::args::Args as GlobalArgs;

/// Indicators command arguments
#[derive(Args, Debug, Clone)]
pub struct IndicatorsArgs {
    /// Indicator file path (defaults to the built-in table)
    #[arg(short = 'i', long, value_name = "FILE")]
    pub file: Option<String>,

    /// Action to perform
    #[command(subcommand)]
    pub action: IndicatorsAction,
}

/// Indicator store queries
#[derive(Subcommand, Debug, Clone)]
pub enum IndicatorsAction {
    /// List known indicator domains
    List,

    /// Check a domain, app identifier or URL scheme against the store
    Check {
        /// Value to check; use `app:` or `scheme:` prefixes for non-domains
        value: String,
    },
}

/// Execute the indicators command
pub fn execute(_global: &GlobalArgs, args: IndicatorsArgs) -> Result<()> {
    let store = match args.file {
        Some(ref path) => IndicatorStore::from_file(path)
            .with_context(|| format!("failed to load indicators from {path}"))?,
        None => IndicatorStore::builtin(),
    };

    match args.action {
        IndicatorsAction::List => list(&store),
        IndicatorsAction::Check { value } => check(&store, &value),
    }

    Ok(())
}

fn list(store: &IndicatorStore) {
    let entries = store.snapshot().domain_entries();
    println!("{} known indicator domains:", entries.len());
    for (domain, product) in entries {
        println!("  {domain}  ({product})");
    }
}

fn check(store: &IndicatorStore, value: &str) {
    let product = if let Some(app) = value.strip_prefix("app:") {
        store.product_for_app(app)
    } else if let Some(scheme) = value.strip_prefix("scheme:") {
        store
            .is_known_scheme(scheme)
            .then(|| "known scheme".to_string())
    } else {
        store.product_for_domain(value)
    };

    match product {
        Some(product) => println!(
            "{} {} is associated with {}",
            "⚠".red().bold(),
            value,
            product.red().bold()
        ),
        None => println!("{} {} is not a known indicator", "✓".green(), value),
    }
}
