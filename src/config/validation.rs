//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Every problem is
//! reported, not just the first, and validation runs before any subsystem
//! is built from the config.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::diagnostics::Category;

/// A single semantic problem in a [`ProxyConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("upstream.url `{url}` is invalid: {reason}")]
    UpstreamUrl { url: String, reason: String },

    #[error("diagnostics: unknown log category `{0}`")]
    UnknownCategory(String),

    #[error("limits.max_body_size must be greater than zero")]
    BodyLimit,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match url::Url::parse(&config.upstream.url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::UpstreamUrl {
            url: config.upstream.url.clone(),
            reason: format!("scheme `{}` is not supported, use http", url.scheme()),
        }),
        Ok(url) if url.host_str().is_none() => errors.push(ValidationError::UpstreamUrl {
            url: config.upstream.url.clone(),
            reason: "missing host".to_string(),
        }),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::UpstreamUrl {
            url: config.upstream.url.clone(),
            reason: e.to_string(),
        }),
    }

    for name in config
        .diagnostics
        .enable
        .iter()
        .chain(config.diagnostics.disable.iter())
    {
        if name.parse::<Category>().is_err() {
            errors.push(ValidationError::UnknownCategory(name.clone()));
        }
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
