//! Tandem server: entry point.
//!
//! ```text
//! tandem-server                     Run with tandem-server.toml
//! tandem-server --config <path>     Load a custom config TOML
//! tandem-server --bind <host:port>  Override the listen address
//! tandem-server --gen-config        Write default config to stdout
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tandem_server::config::{LoggingConfig, ServerConfig};
use tandem_server::server::TandemServer;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tandem-server", about = "Tandem keystroke broadcast server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "tandem-server.toml")]
    config: PathBuf,

    /// Listen address as host:port, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

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
        println!("{}", ServerConfig::default_toml()?);
        return Ok(());
    }

    let (mut config, problem) = ServerConfig::load(&cli.config);
    if let Some(bind) = &cli.bind {
        config.set_bind(bind)?;
    }

    init_tracing(&config.logging)?;
    if let Some(e) = problem {
        warn!("{e}; using defaults");
    }

    info!("tandem-server v{}", env!("CARGO_PKG_VERSION"));
    for (key, target) in &config.keybinds {
        info!("keybind {key} -> {target}");
    }
    if config.script.enabled {
        info!("key script: {} steps", config.script.steps.len());
    }

    let server = TandemServer::bind(config).await?;

    // Ctrl-C handler.
    let stop = server.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received; shutting down");
        stop.cancel();
    });

    server.run().await;

    Ok(())
}
