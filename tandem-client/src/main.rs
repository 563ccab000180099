//! Tandem client: entry point.
//!
//! ```text
//! tandem-client                       Run with tandem-client.toml
//! tandem-client --config <path>       Load a custom config TOML
//! tandem-client --server <host:port>  Override the server address
//! tandem-client --dry-run             Log input instead of sending it
//! tandem-client --gen-config          Write default config to stdout
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tandem_client::config::{ClientConfig, LoggingConfig};
use tandem_client::desktop::{DryRunDesktop, SystemDesktop};
use tandem_client::service::ClientService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tandem-client", about = "Tandem keystroke client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "tandem-client.toml")]
    config: PathBuf,

    /// Server address as host:port, overriding the config file.
    #[arg(short, long)]
    server: Option<String>,

    /// Log clicks and keys instead of injecting them.
    #[arg(long)]
    dry_run: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Logging ──────────────────────────────────────────────────────

/// Console output always; a copy goes to `logging.file` when set.
fn init_tracing(logging: &LoggingConfig) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = if logging.file.is_empty() {
        None
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.file)?;
        Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        println!("{}", ClientConfig::default_toml()?);
        return Ok(());
    }

    let (mut config, problem) = ClientConfig::load(&cli.config);
    if let Some(server) = &cli.server {
        config.set_server(server)?;
    }

    init_tracing(&config.logging)?;
    if let Some(e) = problem {
        warn!("{e}; using defaults");
    }

    info!("tandem-client v{}", env!("CARGO_PKG_VERSION"));
    info!("server: {}", config.server());
    info!("targets: {}", config.targets.len());
    info!(
        "cooldown: {}s, idle timeout: {}s",
        config.state.cooldown_secs, config.state.idle_timeout_secs
    );

    let service = if cli.dry_run {
        info!("dry run: input will be logged, not sent");
        ClientService::new(config, Arc::new(DryRunDesktop))
    } else {
        ClientService::new(config, Arc::new(SystemDesktop::new()))
    };

    // Ctrl-C handler.
    let stop = service.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received; shutting down");
        stop.cancel();
    });

    service.run().await;

    Ok(())
}
