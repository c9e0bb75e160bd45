//! Node discovery protocol
//!
//! A node answers `GET /localnodes` with a JSON array of bare hosts it
//! considers live. Optional `rack` and `dc` query parameters narrow the
//! answer to one rack and/or datacenter.

use crate::fetch::NodeFetcher;
use altlb_core::{LbError, LiveNodesConfig, NodeAddress, Result, Scheme};
use reqwest::StatusCode;
use std::fmt;
use tracing::{debug, warn};
use url::form_urlencoded;
use url::Url;

/// Path of the discovery endpoint on every node
pub const LOCAL_NODES_PATH: &str = "/localnodes";

/// Rack/datacenter filter for a discovery query
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoveryScope {
    pub rack: Option<String>,
    pub datacenter: Option<String>,
}

impl DiscoveryScope {
    pub fn unscoped() -> Self {
        Self::default()
    }

    pub fn rack(rack: impl Into<String>) -> Self {
        Self {
            rack: Some(rack.into()),
            datacenter: None,
        }
    }

    pub fn from_config(config: &LiveNodesConfig) -> Self {
        Self {
            rack: config.rack().map(str::to_string),
            datacenter: config.datacenter().map(str::to_string),
        }
    }

    pub fn is_unscoped(&self) -> bool {
        self.rack.is_none() && self.datacenter.is_none()
    }

    /// Query string, `rack` first then `dc`
    pub fn query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(rack) = &self.rack {
            query.append_pair("rack", rack);
        }
        if let Some(dc) = &self.datacenter {
            query.append_pair("dc", dc);
        }
        query.finish()
    }

    /// Discovery URL on the given node
    pub fn url_for(&self, node: &NodeAddress) -> Url {
        node.url_with(LOCAL_NODES_PATH, &self.query())
    }
}

impl fmt::Display for DiscoveryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.rack, &self.datacenter) {
            (None, None) => write!(f, "unscoped"),
            (Some(rack), None) => write!(f, "rack={}", rack),
            (None, Some(dc)) => write!(f, "dc={}", dc),
            (Some(rack), Some(dc)) => write!(f, "rack={}, dc={}", rack, dc),
        }
    }
}

/// Client for the discovery endpoint
pub struct DiscoveryClient<F> {
    fetcher: F,
    scheme: Scheme,
    port: u16,
}

impl<F: NodeFetcher> DiscoveryClient<F> {
    /// `scheme` and `port` are applied to every discovered host
    pub fn new(fetcher: F, scheme: Scheme, port: u16) -> Self {
        Self {
            fetcher,
            scheme,
            port,
        }
    }

    /// Ask `node` for the live nodes within `scope`
    pub async fn discover(
        &self,
        node: &NodeAddress,
        scope: &DiscoveryScope,
    ) -> Result<Vec<NodeAddress>> {
        self.fetch_nodes(&scope.url_for(node)).await
    }

    /// GET a discovery URL and parse the node list
    pub async fn fetch_nodes(&self, url: &Url) -> Result<Vec<NodeAddress>> {
        let response = self.fetcher.fetch(url).await?;

        if response.status != StatusCode::OK {
            return Err(LbError::UnexpectedStatus {
                status: response.status.as_u16(),
                url: url.to_string(),
            });
        }

        let nodes = self.parse_nodes(&response.body)?;
        debug!(url = %url, count = nodes.len(), "Discovered nodes");
        Ok(nodes)
    }

    /// Parse a JSON array of hosts; hosts that do not form a valid
    /// address are skipped.
    pub fn parse_nodes(&self, body: &[u8]) -> Result<Vec<NodeAddress>> {
        let hosts: Vec<String> = serde_json::from_slice(body)?;

        let nodes = hosts
            .iter()
            .filter_map(|host| match NodeAddress::new(self.scheme, host, self.port) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!(host = %host, error = %e, "Skipping malformed host in node list");
                    None
                }
            })
            .collect();

        Ok(nodes)
    }
}
