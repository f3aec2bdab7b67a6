//! Interception proxy server.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                INTERCEPTION PROXY                │
//!   Client POST      │  ┌────────┐    ┌──────────┐    ┌──────────────┐  │
//!   ─────────────────┼─▶│  http  │───▶│ upstream │───▶│   pipeline   │  │      Upstream
//!                    │  │handlers│    │  client  │◀───┼──────────────┼──┼───── service
//!   Client reply     │  │        │◀───┤          │    │ plugin chain │  │
//!   ◀────────────────┼──│        │    └──────────┘    └──────▲───────┘  │
//!                    │  └───┬────┘                           │          │
//!                    │      │ POST /config   ┌──────────┐    │          │
//!                    │      └───────────────▶│  state   │────┘          │
//!                    │                       │ snapshot │               │
//!                    │  ┌─────────────┐      └──────────┘               │
//!                    │  │ diagnostics │  per-client records, GET pages  │
//!                    │  └─────────────┘                                 │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use intercept_proxy::config::validation::validate_config;
use intercept_proxy::config::watcher::ConfigWatcher;
use intercept_proxy::config::{load_config, ConfigError, ProxyConfig};
use intercept_proxy::observability::{logging, metrics};
use intercept_proxy::{HttpServer, PluginRegistry, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "intercept-proxy")]
#[command(about = "Forwarding proxy that rewrites upstream XML replies through plugins")]
struct Args {
    /// Proxy configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(long)]
    listen: Option<String>,

    /// Override upstream.url.
    #[arg(long)]
    upstream: Option<String>,

    /// Override plugins.directory.
    #[arg(long)]
    plugin_dir: Option<PathBuf>,

    /// Override plugins.config_path.
    #[arg(long)]
    plugin_config: Option<PathBuf>,

    /// Enable a diagnostic log category (repeatable).
    #[arg(long = "enable-log", value_name = "CATEGORY")]
    enable_log: Vec<String>,

    /// Disable a diagnostic log category (repeatable).
    #[arg(long = "disable-log", value_name = "CATEGORY")]
    disable_log: Vec<String>,

    /// Print every built-in plugin's default configuration and exit.
    #[arg(long)]
    print_default_config: bool,
}

impl Args {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(upstream) = self.upstream {
            config.upstream.url = upstream;
        }
        if let Some(dir) = self.plugin_dir {
            config.plugins.directory = dir;
        }
        if let Some(path) = self.plugin_config {
            config.plugins.config_path = Some(path);
        }
        config.diagnostics.enable.extend(self.enable_log);
        config.diagnostics.disable.extend(self.disable_log);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let registry = PluginRegistry::builtin();

    if args.print_default_config {
        print!("{}", registry.default_config());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!("intercept-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        plugin_dir = %config.plugins.directory.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the life of the server.
    let (_watcher, config_updates) =
        match (config.plugins.watch, config.plugins.config_path.clone()) {
            (true, Some(path)) => {
                let (watcher, rx) = ConfigWatcher::new(&path);
                (Some(watcher.run()?), rx)
            }
            _ => {
                let (_tx, rx) = mpsc::unbounded_channel();
                (None, rx)
            }
        };

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, registry)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
