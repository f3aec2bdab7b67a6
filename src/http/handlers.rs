//! Request handlers.
//!
//! A proxied `POST` goes through: read body → forward upstream → parse the
//! reply as a document → run the current snapshot's plugin chain → reply.
//! The reply is fully buffered before a status is chosen, so an upstream
//! failure is reported as `502` rather than as a truncated `200`. The
//! request-processed signal fires only after the reply body has been handed
//! to the connection, never before.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use futures_util::StreamExt;
use serde::Deserialize;
use thiserror::Error;

use crate::config::PluginConfig;
use crate::diagnostics::{render_page, Category};
use crate::error::report;
use crate::http::request::X_REQUEST_ID;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{self, PipelineOutput};
use crate::plugin::{Document, DocumentError};
use crate::state::RequestProcessedSignal;
use crate::upstream::UpstreamError;

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// `GET /num_entries`
pub async fn num_entries(State(state): State<AppState>) -> String {
    state.diagnostics.count_all().to_string()
}

/// `GET /config`
pub async fn get_config(State(state): State<AppState>) -> String {
    state.snapshots.get().config_text()
}

#[derive(Debug, Deserialize)]
pub struct WaitParams {
    /// Give up after this many milliseconds. Unbounded when absent.
    pub timeout_ms: Option<u64>,
}

/// `GET /wait_request`
pub async fn wait_request(
    State(state): State<AppState>,
    Query(params): Query<WaitParams>,
) -> Response {
    let waiter = state.signal.waiter();
    let timeout = params.timeout_ms.map(Duration::from_millis);

    if waiter.wait(timeout).await {
        (StatusCode::OK, "request processed").into_response()
    } else {
        (
            StatusCode::REQUEST_TIMEOUT,
            "no request was processed before the timeout",
        )
            .into_response()
    }
}

/// `POST /config`
pub async fn post_config(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    body: String,
) -> Response {
    let start = Instant::now();
    let ip = client.ip();

    let config = match PluginConfig::parse(&body) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(client = %ip, error = %e, "Rejected plugin configuration");
            metrics::record_reload("http", false);
            return reject_config(&state, ip, report(&e), start);
        }
    };

    let reload_state = state.clone();
    let outcome =
        tokio::task::spawn_blocking(move || reload_state.reconfigure(config, "http", ip)).await;

    match outcome {
        Ok(Ok(snapshot)) => {
            metrics::record_request("POST", "config", 200, start);
            (
                StatusCode::OK,
                format!(
                    "loaded {} plugins: [{}]\n",
                    snapshot.chain().len(),
                    snapshot.chain().names().join(", ")
                ),
            )
                .into_response()
        }
        // Already recorded by `reconfigure`.
        Ok(Err(e)) => {
            metrics::record_request("POST", "config", 400, start);
            (StatusCode::BAD_REQUEST, report(&e)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Plugin reload task failed");
            metrics::record_request("POST", "config", 500, start);
            (StatusCode::INTERNAL_SERVER_ERROR, "plugin reload task failed").into_response()
        }
    }
}

fn reject_config(state: &AppState, ip: IpAddr, detail: String, start: Instant) -> Response {
    state
        .diagnostics
        .log(ip, Category::Config, "configuration rejected", Some(detail.as_str()));
    metrics::record_request("POST", "config", 400, start);
    (StatusCode::BAD_REQUEST, detail).into_response()
}

/// `POST` on any path other than `/config`.
pub async fn proxy(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    proxy_request(state, client.ip(), uri, headers, body).await
}

/// Anything not routed explicitly: `GET` renders the log, `POST` proxies.
pub async fn fallback(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match method {
        Method::GET => Html(render_page(&state.diagnostics)).into_response(),
        Method::POST => proxy_request(state, client.ip(), uri, headers, body).await,
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

#[derive(Debug, Error)]
enum ProxyError {
    #[error("upstream call failed")]
    Upstream(#[from] UpstreamError),

    #[error("upstream response is not a usable document")]
    Document(#[from] DocumentError),

    #[error("pipeline task failed")]
    Task(#[from] tokio::task::JoinError),
}

async fn proxy_request(
    state: AppState,
    ip: IpAddr,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();

    state.diagnostics.record_connection(ip);
    if state.diagnostics.is_enabled(Category::Request) {
        state.diagnostics.log(
            ip,
            Category::Request,
            &format!("POST {}", path_and_query),
            Some(String::from_utf8_lossy(&body).as_ref()),
        );
    }

    let response = match transform(&state, ip, &path_and_query, &headers, body).await {
        Ok((output, upstream_type)) => {
            if state.diagnostics.is_enabled(Category::Response) {
                let short = match &output {
                    PipelineOutput::Terminated { plugin, .. } => format!("reply set by plugin `{}`", plugin),
                    PipelineOutput::Completed(_) => "transformed upstream response".to_string(),
                };
                state
                    .diagnostics
                    .log(ip, Category::Response, &short, Some(output.as_str()));
            }

            let content_type = if output.is_terminated() {
                HeaderValue::from_static(TEXT_CONTENT_TYPE)
            } else {
                upstream_type.unwrap_or_else(|| HeaderValue::from_static(XML_CONTENT_TYPE))
            };
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type)],
                output.into_bytes(),
            )
                .into_response()
        }
        Err(e) => {
            let detail = report(&e);
            tracing::error!(client = %ip, path = %path_and_query, error = %detail, "Proxied request failed");
            state.diagnostics.log(
                ip,
                Category::Error,
                &format!("POST {} failed", path_and_query),
                Some(detail.as_str()),
            );
            let status = match e {
                ProxyError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, detail).into_response()
        }
    };

    metrics::record_request("POST", "proxy", response.status().as_u16(), start);
    signal_when_sent(response, Arc::clone(&state.signal))
}

/// Sets the signal when dropped.
struct SignalOnDrop(Arc<RequestProcessedSignal>);

impl Drop for SignalOnDrop {
    fn drop(&mut self) {
        self.0.set();
    }
}

/// Tie `signal` to the response body: it is set once the server has taken
/// the last chunk and released the body, or when the body is dropped unsent
/// because the client went away.
fn signal_when_sent(response: Response, signal: Arc<RequestProcessedSignal>) -> Response {
    let guard = SignalOnDrop(signal);
    response.map(|body| {
        Body::from_stream(body.into_data_stream().map(move |chunk| {
            let _held = &guard;
            chunk
        }))
    })
}

async fn transform(
    state: &AppState,
    ip: IpAddr,
    path_and_query: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(PipelineOutput, Option<HeaderValue>), ProxyError> {
    let upstream = state
        .upstream
        .forward(
            path_and_query,
            headers.get(header::CONTENT_TYPE),
            headers.get(X_REQUEST_ID),
            body,
        )
        .await?;

    if state.diagnostics.is_enabled(Category::Upstream) {
        state.diagnostics.log(
            ip,
            Category::Upstream,
            &format!("upstream replied {}", upstream.status),
            Some(String::from_utf8_lossy(&upstream.body).as_ref()),
        );
    }

    // Loaded once; a concurrent reload does not affect this request.
    let snapshot = state.snapshots.get();
    let diagnostics = Arc::clone(&state.diagnostics);
    let raw = upstream.body;

    let output = tokio::task::spawn_blocking(move || -> Result<PipelineOutput, DocumentError> {
        let document = Document::parse(&raw)?;
        Ok(pipeline::run(snapshot.chain(), document, &diagnostics.sink(ip)))
    })
    .await??;

    Ok((output, upstream.content_type))
}
