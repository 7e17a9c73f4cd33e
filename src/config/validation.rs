//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every backend token must be a usable `http://host[:port]` URL
//! - Validate value ranges (intervals and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("invalid backend `{address}`: {reason}")]
    InvalidBackend { address: String, reason: String },

    #[error("duplicate backend `{0}`")]
    DuplicateBackend(String),

    #[error("invalid bind address `{0}`")]
    InvalidBindAddress(String),

    #[error("`{0}` must be greater than zero")]
    ZeroValue(&'static str),

    #[error("health_check.timeout_secs ({timeout_secs}) must be shorter than interval_secs ({interval_secs})")]
    ProbeOutlastsInterval { timeout_secs: u64, interval_secs: u64 },

    #[error("admin API enabled without an api_key")]
    MissingAdminKey,
}

/// Parse one backend token into a target URL.
///
/// Only plain HTTP targets with an explicit host are accepted; the upstream
/// client does not speak TLS.
pub fn parse_backend_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidBackend {
        address: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for raw in &config.backends {
        match parse_backend_url(raw) {
            Ok(url) => {
                if !seen.insert(url.clone()) {
                    errors.push(ValidationError::DuplicateBackend(url.to_string()));
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroValue("health_check.interval_secs"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("health_check.timeout_secs"));
    }
    // Sweeps must not overlap.
    let hc = &config.health_check;
    if hc.interval_secs > 0 && hc.timeout_secs >= hc.interval_secs {
        errors.push(ValidationError::ProbeOutlastsInterval {
            timeout_secs: hc.timeout_secs,
            interval_secs: hc.interval_secs,
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.connect_secs"));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidBindAddress(
                config.admin.bind_address.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
