//! Run command - traffic monitoring execution

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use vigil_core::config::{CaptureMode, Config};
use vigil_core::event::{Event, EventKind};
use vigil_core::indicators::IndicatorStore;
use vigil_service::MonitorService;

use crate::args::Args as GlobalArgs;

/// Run command arguments
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Indicator file path (defaults to the built-in table)
    #[arg(short = 'i', long, value_name = "FILE")]
    pub indicators: Option<String>,

    /// Stop after this many seconds (default: run until ctrl-c)
    #[arg(short = 'd', long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Traffic source selection override
    #[arg(long, value_enum)]
    pub capture: Option<CaptureArg>,

    /// Emit intercepted events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Traffic source selection from the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CaptureArg {
    /// Native capture when available, else synthetic
    Auto,
    /// Require native capture
    Native,
    /// Always use the synthetic generator
    Synthetic,
}

impl From<CaptureArg> for CaptureMode {
    fn from(arg: CaptureArg) -> Self {
        match arg {
            CaptureArg::Auto => CaptureMode::Auto,
            CaptureArg::Native => CaptureMode::Native,
            CaptureArg::Synthetic => CaptureMode::Synthetic,
        }
    }
}

/// Execute the run command
pub fn execute(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let mut config = load_config(global)?;
    if let Some(capture) = args.capture {
        config.general.capture = capture.into();
    }
    config.validate()?;

    let store = load_indicators(&config, args.indicators.as_deref())?;
    info!(indicators = store.len(), "Indicator table ready");

    let service = MonitorService::from_config(&config);
    subscribe_renderers(&service, Arc::clone(&store), args.json);

    let mut outcome = service.start_vpn();
    if outcome.requires_permission {
        info!("Interception permission missing; requesting consent");
        if service.request_permission().unwrap_or(false) {
            outcome = service.start_vpn();
        }
    }
    if !outcome.success {
        bail!(
            "failed to start monitoring: {}",
            outcome
                .error_message
                .unwrap_or_else(|| "permission not granted".to_string())
        );
    }

    info!(
        native = service.is_native_backed(),
        "Monitoring started; press ctrl-c to stop"
    );

    wait_for_shutdown(args.duration)?;

    let stop = service.stop_vpn();
    if !stop.success {
        warn!(error = ?stop.error_message, "Stop reported a failure");
    }

    print_summary(&service);
    Ok(())
}

/// Block until ctrl-c or the optional duration elapses
fn wait_for_shutdown(duration: Option<u64>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the wait-loop runtime")?;

    runtime.block_on(async {
        match duration {
            Some(secs) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Interrupted"),
                    () = tokio::time::sleep(Duration::from_secs(secs)) => {
                        info!(secs, "Monitoring window elapsed");
                    }
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
                info!("Interrupted");
            }
        }
    });

    Ok(())
}

/// Load configuration from the global `--config` flag
fn load_config(global: &GlobalArgs) -> Result<Config> {
    match global.config {
        Some(ref path) => {
            Config::load(path).with_context(|| format!("failed to load config from {path}"))
        }
        None => Ok(Config::default()),
    }
}

/// Build the indicator store: explicit file > config file > built-in
fn load_indicators(config: &Config, override_path: Option<&str>) -> Result<Arc<IndicatorStore>> {
    let path = override_path.or(config.indicators.file.as_deref());

    let store = match path {
        Some(path) => IndicatorStore::from_file(path)
            .with_context(|| format!("failed to load indicators from {path}"))?,
        None => IndicatorStore::builtin(),
    };

    let inline = store.extend_with_entries(&config.indicators.entries);
    if inline > 0 {
        info!(inline, "Applied inline indicator entries");
    }

    Ok(Arc::new(store))
}

/// Attach the classification/presentation handlers
fn subscribe_renderers(service: &MonitorService, store: Arc<IndicatorStore>, json: bool) {
    let dns_store = Arc::clone(&store);
    service.subscribe(EventKind::DnsRequest, move |event| {
        let Event::DnsRequest(dns) = event else { return };
        if json {
            print_json(event);
            return;
        }

        let product = dns_store.product_for_domain(&dns.domain).or_else(|| {
            dns.source_app
                .as_deref()
                .and_then(|app| dns_store.product_for_app(app))
        });
        let app = dns.source_app.as_deref().unwrap_or("unknown app");

        match product {
            Some(product) => println!(
                "{} {} {} from {} ({})",
                "⚠".red().bold(),
                dns.query_type,
                dns.domain.red().bold(),
                app,
                product.red()
            ),
            None => println!(
                "  {} {} from {}",
                dns.query_type,
                dns.domain.dimmed(),
                app.dimmed()
            ),
        }
    });

    let conn_store = store;
    service.subscribe(EventKind::Connection, move |event| {
        let Event::Connection(conn) = event else { return };
        if json {
            print_json(event);
            return;
        }

        let flagged = conn
            .source_app
            .as_deref()
            .map(|app| conn_store.is_known_app(app))
            .unwrap_or(false);
        let line = format!(
            "  {} {}:{} <> {} bytes out, {} bytes in ({})",
            conn.protocol,
            conn.dest_ip,
            conn.dest_port,
            conn.bytes_out,
            conn.bytes_in,
            conn.source_app.as_deref().unwrap_or("unknown app")
        );
        if flagged {
            println!("{}", line.red());
        } else {
            println!("{}", line.dimmed());
        }
    });

    service.subscribe(EventKind::VpnStateChange, move |event| {
        let Event::StateChange(change) = event else { return };
        if json {
            print_json(event);
            return;
        }
        match change.error_message {
            Some(ref message) => println!("{} {}", "session error:".red().bold(), message),
            None => println!("{} {}", "session:".cyan(), change.state.as_str()),
        }
    });
}

fn print_json(event: &Event) {
    let line = serde_json::json!({
        "kind": event.kind(),
        "event": event,
    });
    println!("{line}");
}

/// Print the final session summary
fn print_summary(service: &MonitorService) {
    let status = service.vpn_status();
    println!();
    println!("{}", "Session summary".cyan().bold());
    println!("  packets processed:       {}", status.packets_processed);
    println!("  DNS queries intercepted: {}", status.dns_queries_intercepted);
}
