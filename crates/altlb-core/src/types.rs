//! Core types for altlb

use crate::error::{LbError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// URL scheme used for both discovery and data requests
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = LbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(LbError::InvalidScheme(other.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one backend node: scheme, host and port.
///
/// Built from a bare host (no scheme, no port) plus the configured scheme
/// and port. Immutable once built; request URLs are derived with
/// [`NodeAddress::url_with`].
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct NodeAddress {
    scheme: Scheme,
    url: Url,
}

impl NodeAddress {
    pub fn new(scheme: Scheme, host: &str, port: u16) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(LbError::invalid_address(host, "empty host"));
        }
        if host.contains(['/', '?', '#', '@']) {
            return Err(LbError::invalid_address(host, "expected a bare host"));
        }

        // Bare IPv6 literals need brackets before a port can be appended
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };

        let url = Url::parse(&format!("{}://{}", scheme, authority))
            .map_err(|e| LbError::invalid_address(host, e))?;

        if url.host_str().map_or(true, str::is_empty) {
            return Err(LbError::invalid_address(host, "missing host"));
        }

        Ok(Self { scheme, url })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or_default()
    }

    /// Base URL of the node (root path, no query)
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// Build a URL on this node with the given path and query.
    ///
    /// An empty query leaves the URL without one.
    pub fn url_with(&self, path: &str, query: &str) -> Url {
        let mut url = self.url.clone();
        url.set_path(path);
        if !query.is_empty() {
            url.set_query(Some(query));
        }
        url
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({})", self)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host(), self.port())
    }
}

/// Seconds since Unix epoch, used for refresh deadlines
pub fn unix_now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
