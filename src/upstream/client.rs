//! Upstream HTTP client.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::X_REQUEST_ID;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream url `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot build upstream request for {uri}")]
    Request {
        uri: String,
        #[source]
        source: axum::http::Error,
    },

    #[error("upstream request to {uri} failed")]
    Send {
        uri: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("cannot read upstream response body")]
    Body(#[source] axum::Error),
}

/// The fully read upstream reply.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    base: Url,
    max_body_size: usize,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, max_body_size: usize) -> Result<Self, UpstreamError> {
        let base = Url::parse(&config.url).map_err(|source| UpstreamError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            base,
            max_body_size,
        })
    }

    /// Upstream URI for an incoming path and query.
    pub fn target(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path_and_query)
    }

    /// POST `body` upstream, unmodified, and read the whole response.
    pub async fn forward(
        &self,
        path_and_query: &str,
        content_type: Option<&HeaderValue>,
        request_id: Option<&HeaderValue>,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let uri = self.target(path_and_query);

        let mut builder = Request::builder().method(Method::POST).uri(&uri);
        if let Some(value) = content_type {
            builder = builder.header(header::CONTENT_TYPE, value);
        }
        if let Some(value) = request_id {
            builder = builder.header(X_REQUEST_ID, value);
        }
        let request = builder
            .body(Body::from(body))
            .map_err(|source| UpstreamError::Request {
                uri: uri.clone(),
                source,
            })?;

        let response: hyper::Response<Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|source| UpstreamError::Send {
                uri: uri.clone(),
                source,
            })?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = axum::body::to_bytes(Body::new(response.into_body()), self.max_body_size)
            .await
            .map_err(UpstreamError::Body)?;

        tracing::debug!(uri = %uri, status = %status, bytes = body.len(), "Upstream responded");
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base", &self.base.as_str())
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}
