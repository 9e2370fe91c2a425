//! Runtime configuration for the geo tools.
//!
//! The geocoding credential is never read from ambient state inside a tool;
//! it is resolved through a [`CredentialProvider`] handed to the geocoder.

use std::fmt;
use std::time::Duration;

pub const DEFAULT_GEOCODER_URL: &str = "https://geocode.maps.co";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const API_KEY_ENV: &str = "GEOLOCATION_API_KEY";

/// Source of the geocoding API key.
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from the process environment on every call.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(API_KEY_ENV)
    }
}

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// A fixed key, or none at all.
#[derive(Clone, Default)]
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

// keep the key out of logs
impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.0.is_some() { "Some(***)" } else { "None" };
        f.debug_tuple("StaticCredentials").field(&format_args!("{shown}")).finish()
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Debug, Clone)]
pub struct GeoConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GeoConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}
