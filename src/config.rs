//! Configuration options for the client

use log::warn;
use std::time::Duration;

/// Environment variable holding the request timeout in seconds
pub const REQUEST_TIMEOUT_ENV: &str = "OMF_REQUEST_TIMEOUT_SECS";

/// Environment variable holding the cache stale time in seconds
pub const STALE_TIME_ENV: &str = "OMF_STALE_TIME_SECS";

/// Configuration options for the client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// How long a fetched query stays fresh; `None` keeps it fresh until invalidated
    pub stale_time: Option<Duration>,

    /// Value of the `X-Client-Info` header
    pub client_info: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            stale_time: None,
            client_info: format!("oh-my-fitness-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientOptions {
    /// Defaults overridden by `OMF_*` environment variables
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(secs) = read_secs(REQUEST_TIMEOUT_ENV) {
            options.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = read_secs(STALE_TIME_ENV) {
            options.stale_time = Some(Duration::from_secs(secs));
        }
        options
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the stale time of cached queries
    pub fn with_stale_time(mut self, value: Option<Duration>) -> Self {
        self.stale_time = value;
        self
    }

    /// Set the client info header
    pub fn with_client_info(mut self, value: &str) -> Self {
        self.client_info = value.to_string();
        self
    }
}

fn read_secs(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!("ignoring {}={:?}: not a number of seconds", name, raw);
            None
        }
    }
}
