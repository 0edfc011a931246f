//! Triple client configuration.
//!
//! Settings can be loaded from JSON and overridden from the environment.
//!
//! Environment variables:
//! - `TRIPLE_VERSION`: protocol version tag stamped on every response.
//!   Defaults to `3.0.0`.
//! - `TRIPLE_SERIALIZATION`: serialization scheme negotiated for exception
//!   payloads. Defaults to `hessian4`.

use std::sync::LazyLock;

use serde::Deserialize;

use crate::{error::TripleError, exception::ResolutionHints};

/// Protocol version tag of the triple protocol.
pub const TRI_VERSION: &str = "3.0.0";

/// Default serialization scheme for exception payloads.
pub const DEFAULT_SERIALIZATION: &str = "hessian4";

/// Client-side settings for unary triple calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Protocol version tag stamped on every response
    pub version: String,
    /// Serialization scheme negotiated for exception payloads
    pub serialization: String,
    /// Service key passed to the exception registry
    pub service: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: TRI_VERSION.to_owned(),
            serialization: DEFAULT_SERIALIZATION.to_owned(),
            service: String::new(),
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns error if `json` is not a valid configuration document
    pub fn from_json(json: &str) -> Result<Self, TripleError> {
        serde_json::from_str(json).map_err(|e| TripleError::Internal(format!("invalid config: {e}")))
    }

    /// Defaults overridden from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(version) = lookup("TRIPLE_VERSION").filter(|v| !v.is_empty()) {
            self.version = version;
        }
        if let Some(serialization) = lookup("TRIPLE_SERIALIZATION").filter(|v| !v.is_empty()) {
            self.serialization = serialization;
        }
        self
    }

    /// Resolution hints for the exception registry
    #[must_use]
    pub fn hints(&self) -> ResolutionHints {
        ResolutionHints {
            serialization: self.serialization.clone(),
            service: self.service.clone(),
        }
    }
}

/// Globally initialized configuration, read from environment variables at first access.
pub static CLIENT_CONFIG: LazyLock<ClientConfig> = LazyLock::new(ClientConfig::from_env);
