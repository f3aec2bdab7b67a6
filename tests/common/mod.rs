//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Bytes, http::header, response::IntoResponse, Router};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use intercept_proxy::config::PluginConfig;
use intercept_proxy::http::AppState;
use intercept_proxy::{HttpServer, PluginRegistry, ProxyConfig, Shutdown};

pub const BRANDS_XML: &str =
    "<Brands><Brand code=\"AA\">Basic</Brand><Brand code=\"BB\">Plus</Brand></Brands>";

/// Start an upstream stub that answers every POST with `reply(body)` as XML.
pub async fn start_upstream<F>(reply: F) -> SocketAddr
where
    F: Fn(Bytes) -> String + Clone + Send + Sync + 'static,
{
    let app = Router::new().fallback(move |body: Bytes| {
        let reply = reply.clone();
        async move { ([(header::CONTENT_TYPE, "text/xml")], reply(body)).into_response() }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Upstream stub returning a fixed document.
pub async fn start_fixed_upstream(xml: &'static str) -> SocketAddr {
    start_upstream(move |_| xml.to_string()).await
}

/// Upstream stub wrapping the request body in `<Echo>`.
pub async fn start_echo_upstream() -> SocketAddr {
    start_upstream(|body| format!("<Echo>{}</Echo>", String::from_utf8_lossy(&body))).await
}

/// A running proxy bound to an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub state: AppState,
    pub client: reqwest::Client,
    /// Feeds the same reload path the file watcher uses.
    pub config_updates: mpsc::UnboundedSender<PluginConfig>,
    shutdown: Shutdown,
    _plugins: TempDir,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header(header::CONTENT_TYPE.as_str(), "text/xml")
            .body(body.to_string())
            .send()
            .await
            .expect("proxy unreachable")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("proxy unreachable")
    }

    pub async fn num_entries(&self) -> u64 {
        self.get("/num_entries").await.text().await.unwrap().parse().unwrap()
    }

    /// Poll `/num_entries` until it reaches `count`.
    pub async fn wait_for_entries(&self, count: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.num_entries().await < count {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("diagnostic records never appeared");
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy in front of `upstream`.
///
/// `markers` become files in a fresh plugin directory; `plugin_config`
/// is written next to them and used as the initial configuration.
pub async fn start_proxy(
    upstream: SocketAddr,
    markers: &[&str],
    plugin_config: Option<&str>,
) -> TestProxy {
    start_proxy_with(upstream, markers, plugin_config, |_| {}).await
}

pub async fn start_proxy_with(
    upstream: SocketAddr,
    markers: &[&str],
    plugin_config: Option<&str>,
    customize: impl FnOnce(&mut ProxyConfig),
) -> TestProxy {
    let plugins = tempfile::tempdir().unwrap();
    let plugin_dir = plugins.path().join("plugins");
    fs::create_dir(&plugin_dir).unwrap();
    for marker in markers {
        fs::write(plugin_dir.join(marker), "").unwrap();
    }

    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.url = format!("http://{}", upstream);
    config.plugins.directory = plugin_dir;
    if let Some(text) = plugin_config {
        // Fail here rather than at startup if a test passes bad ini.
        PluginConfig::parse(text).unwrap();
        let path = plugins.path().join("plugins.ini");
        fs::write(&path, text).unwrap();
        config.plugins.config_path = Some(path);
    }
    customize(&mut config);

    let server = HttpServer::new(config, PluginRegistry::builtin()).unwrap();
    let state = server.state().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    TestProxy {
        addr,
        state,
        client,
        config_updates: updates_tx,
        shutdown,
        _plugins: plugins,
    }
}
