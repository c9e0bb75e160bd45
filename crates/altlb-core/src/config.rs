//! Configuration types for altlb

use crate::error::{LbError, Result};
use crate::types::Scheme;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of a live-node directory
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveNodesConfig {
    /// Scheme for discovery and data requests
    pub scheme: Scheme,

    /// Port every node listens on
    pub port: u16,

    /// Only target nodes from this rack
    pub rack: Option<String>,

    /// Only target nodes from this datacenter
    pub datacenter: Option<String>,

    /// How often the node list is refreshed while requests are flowing, in
    /// milliseconds. Zero disables traffic-driven refresh.
    #[serde(with = "duration_millis")]
    pub update_period: Duration,

    /// How often the node list is refreshed when no requests are flowing, in
    /// milliseconds. Zero disables the idle timer.
    #[serde(with = "duration_millis")]
    pub idle_update_period: Duration,

    /// HTTP transport used for discovery calls
    pub transport: HttpTransportConfig,
}

impl Default for LiveNodesConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            port: 8080,
            rack: None,
            datacenter: None,
            update_period: Duration::from_secs(10),
            idle_update_period: Duration::from_secs(60),
            transport: HttpTransportConfig::default(),
        }
    }
}

impl LiveNodesConfig {
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_rack(mut self, rack: impl Into<String>) -> Self {
        self.rack = Some(rack.into());
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn with_update_period(mut self, period: Duration) -> Self {
        self.update_period = period;
        self
    }

    pub fn with_idle_update_period(mut self, period: Duration) -> Self {
        self.idle_update_period = period;
        self
    }

    pub fn with_transport(mut self, transport: HttpTransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Configured rack, ignoring empty strings
    pub fn rack(&self) -> Option<&str> {
        self.rack.as_deref().filter(|r| !r.is_empty())
    }

    /// Configured datacenter, ignoring empty strings
    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter.as_deref().filter(|dc| !dc.is_empty())
    }

    pub fn active_refresh_enabled(&self) -> bool {
        !self.update_period.is_zero()
    }

    pub fn idle_refresh_enabled(&self) -> bool {
        !self.idle_update_period.is_zero()
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(LbError::InvalidConfig("port must be non-zero".into()));
        }
        self.transport.validate()
    }
}

/// HTTP transport settings for discovery calls
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Timeout for a single discovery request
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,

    /// Accept invalid server certificates
    pub ignore_server_certificate_error: bool,

    /// Idle connections kept per node
    pub max_idle_connections_per_host: usize,

    /// How long an idle connection is kept alive
    #[serde(with = "duration_secs")]
    pub idle_connection_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            ignore_server_certificate_error: false,
            max_idle_connections_per_host: 100,
            idle_connection_timeout: Duration::from_secs(6 * 3600), // 6 hours
        }
    }
}

impl HttpTransportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(LbError::InvalidConfig(
                "request timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

// Serde helpers for Duration
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LiveNodesConfig::default();
        assert_eq!(config.scheme, Scheme::Http);
        assert_eq!(config.port, 8080);
        assert!(config.active_refresh_enabled());
        assert!(config.idle_refresh_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_rack_is_unset() {
        let config = LiveNodesConfig::default().with_rack("").with_datacenter("dc1");
        assert_eq!(config.rack(), None);
        assert_eq!(config.datacenter(), Some("dc1"));
    }

    #[test]
    fn test_zero_periods_disable_refresh() {
        let config = LiveNodesConfig::default()
            .with_update_period(Duration::ZERO)
            .with_idle_update_period(Duration::ZERO);
        assert!(!config.active_refresh_enabled());
        assert!(!config.idle_refresh_enabled());
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let config = LiveNodesConfig::default().with_port(0);
        assert!(matches!(config.validate(), Err(LbError::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{
            "scheme": "https",
            "port": 9999,
            "datacenter": "dc1",
            "update_period": 300000,
            "transport": { "request_timeout": 2500 }
        }"#;
        let config: LiveNodesConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.scheme, Scheme::Https);
        assert_eq!(config.port, 9999);
        assert_eq!(config.datacenter(), Some("dc1"));
        assert_eq!(config.update_period, Duration::from_secs(300));
        assert_eq!(config.idle_update_period, Duration::from_secs(60));
        assert_eq!(config.transport.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.transport.max_idle_connections_per_host, 100);
    }

    #[test]
    fn test_sub_second_periods_survive_serialization() {
        let config = LiveNodesConfig::default()
            .with_update_period(Duration::from_millis(250))
            .with_idle_update_period(Duration::from_millis(50));

        let json = serde_json::to_string(&config).unwrap();
        let loaded: LiveNodesConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.update_period, Duration::from_millis(250));
        assert_eq!(loaded.idle_update_period, Duration::from_millis(50));
        assert!(loaded.active_refresh_enabled());
        assert!(loaded.idle_refresh_enabled());
    }
}
