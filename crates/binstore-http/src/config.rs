use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cap on concurrent requests to one route.
pub const DEFAULT_MAX_PER_ROUTE: usize = 5;

/// Default cap on concurrent requests overall.
pub const DEFAULT_MAX_TOTAL: usize = 2 * DEFAULT_MAX_PER_ROUTE;

/// Default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Configuration for [`HttpResolver`](crate::HttpResolver).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpResolverConfig {
    pub max_connections_per_route: usize,
    pub max_connections_total: usize,
    pub max_redirects: usize,
    /// Whole-request timeout in seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    /// Refuse writes and deletes.
    pub read_only: bool,
    pub user_agent: String,
}

impl Default for HttpResolverConfig {
    fn default() -> Self {
        Self {
            max_connections_per_route: DEFAULT_MAX_PER_ROUTE,
            max_connections_total: DEFAULT_MAX_TOTAL,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout_secs: None,
            read_only: false,
            user_agent: concat!("binstore/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpResolverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Check that the connection limits are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections_per_route == 0 {
            return Err("max_connections_per_route must be at least 1".into());
        }
        if self.max_connections_total == 0 {
            return Err("max_connections_total must be at least 1".into());
        }
        Ok(())
    }
}
