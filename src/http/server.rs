//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared proxy state from configuration
//! - Load the initial plugin chain (startup fails if it cannot be loaded)
//! - Create the Axum router and wire up middleware (tracing, limits, request ID)
//! - Apply plugin config updates arriving from the file watcher
//! - Serve until shutdown

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{load_plugin_config, ConfigError, PluginConfig, ProxyConfig};
use crate::diagnostics::{Category, CategoryRegistry, DiagnosticLog, UnknownCategory};
use crate::http::handlers;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::plugin::{LoadError, PluginLoader, PluginRegistry};
use crate::state::{RequestProcessedSignal, Snapshot, SnapshotStore};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Client address under which file-watcher reloads are recorded.
pub const WATCHER_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Fatal problems while building the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid diagnostics configuration")]
    Diagnostics(#[from] UnknownCategory),

    #[error("cannot load initial plugin configuration")]
    PluginConfig(#[from] ConfigError),

    #[error("cannot load plugins")]
    Plugins(#[from] LoadError),

    #[error("invalid upstream configuration")]
    Upstream(#[from] UpstreamError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub snapshots: Arc<SnapshotStore>,
    pub loader: Arc<PluginLoader>,
    pub diagnostics: Arc<DiagnosticLog>,
    pub upstream: UpstreamClient,
    pub signal: Arc<RequestProcessedSignal>,
}

impl AppState {
    /// Load a new chain for `config` and swap it in together with `config`.
    ///
    /// Blocking (reads the plugin directory). On failure the current
    /// snapshot stays active. Both outcomes are recorded in the `config`
    /// category under `client`, so every reload source counts the same.
    pub fn reconfigure(
        &self,
        config: PluginConfig,
        source: &'static str,
        client: IpAddr,
    ) -> Result<Arc<Snapshot>, LoadError> {
        match self.loader.load(Some(&config)) {
            Ok(chain) => {
                tracing::info!(source, plugins = ?chain.names(), "Plugins reloaded");
                let snapshot = self.snapshots.set(Snapshot::new(Some(config), chain));
                metrics::record_reload(source, true);
                if self.diagnostics.is_enabled(Category::Config) {
                    self.diagnostics.log(
                        client,
                        Category::Config,
                        &format!("plugins reloaded from {}: [{}]", source, snapshot.chain().names().join(", ")),
                        Some(snapshot.config_text().as_str()),
                    );
                }
                Ok(snapshot)
            }
            Err(e) => {
                let detail = crate::error::report(&e);
                tracing::error!(
                    source,
                    error = %detail,
                    "Plugin reload failed, keeping current plugins"
                );
                metrics::record_reload(source, false);
                self.diagnostics.log(
                    client,
                    Category::Config,
                    "configuration rejected",
                    Some(detail.as_str()),
                );
                Err(e)
            }
        }
    }
}

/// HTTP server for the interception proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Build the server and load the initial plugin chain.
    pub fn new(config: ProxyConfig, registry: PluginRegistry) -> Result<Self, StartupError> {
        let categories = CategoryRegistry::from_config(&config.diagnostics)?;
        let diagnostics = Arc::new(DiagnosticLog::new(categories));

        let loader = Arc::new(PluginLoader::new(registry, config.plugins.directory.clone()));
        let plugin_config = config
            .plugins
            .config_path
            .as_deref()
            .map(load_plugin_config)
            .transpose()?;
        let chain = loader.load(plugin_config.as_ref())?;
        tracing::info!(
            directory = %loader.directory().display(),
            plugins = ?chain.names(),
            "Plugins loaded"
        );

        let state = AppState {
            snapshots: Arc::new(SnapshotStore::new(Snapshot::new(plugin_config, chain))),
            loader,
            diagnostics,
            upstream: UpstreamClient::new(&config.upstream, config.limits.max_body_size)?,
            signal: Arc::new(RequestProcessedSignal::new()),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route(
                "/num_entries",
                get(handlers::num_entries).post(handlers::proxy),
            )
            .route(
                "/wait_request",
                get(handlers::wait_request).post(handlers::proxy),
            )
            .route(
                "/config",
                get(handlers::get_config).post(handlers::post_config),
            )
            .fallback(handlers::fallback)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            let request_id = request
                                .headers()
                                .get(X_REQUEST_ID)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("unknown");
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = %request_id,
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_size)),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Plugin configurations received on `config_updates` go through the
    /// same reload path as `POST /config`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<PluginConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let state = reload_state.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    state.reconfigure(config, "watcher", WATCHER_CLIENT)
                })
                .await;
                if let Err(e) = outcome {
                    tracing::error!(error = %e, "Plugin reload task failed");
                }
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
