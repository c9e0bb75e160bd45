//! Live node membership
//!
//! Holds the published node list and picks nodes round robin without
//! taking locks. The bootstrap list is kept as a fallback for when no
//! live list has been published.

use altlb_core::{LbError, NodeAddress, Result};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

/// Published node list plus round-robin cursor
pub struct NodeMembership {
    /// Current live nodes, replaced wholesale
    live: ArcSwap<Vec<NodeAddress>>,

    /// Caller-supplied initial nodes, never empty
    bootstrap: Arc<Vec<NodeAddress>>,

    /// Shared round-robin counter
    cursor: AtomicU64,
}

impl NodeMembership {
    pub fn new(bootstrap: Vec<NodeAddress>) -> Result<Self> {
        if bootstrap.is_empty() {
            return Err(LbError::EmptyBootstrap);
        }

        let bootstrap = Arc::new(bootstrap);
        Ok(Self {
            live: ArcSwap::new(bootstrap.clone()),
            bootstrap,
            cursor: AtomicU64::new(0),
        })
    }

    /// Publish a new node list. Empty lists are ignored.
    ///
    /// Returns whether the list was published.
    pub fn replace(&self, nodes: Vec<NodeAddress>) -> bool {
        if nodes.is_empty() {
            return false;
        }
        self.live.store(Arc::new(nodes));
        true
    }

    /// Pick the next node round robin
    pub fn next_node(&self) -> NodeAddress {
        let live = self.live.load();
        let nodes = if live.is_empty() {
            self.bootstrap.as_slice()
        } else {
            live.as_slice()
        };

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % nodes.len() as u64;
        nodes[idx as usize].clone()
    }

    /// Next node as a URL with the given path and query
    pub fn next_url(&self, path: &str, query: &str) -> Url {
        self.next_node().url_with(path, query)
    }

    /// Currently published nodes
    pub fn live_nodes(&self) -> Arc<Vec<NodeAddress>> {
        self.live.load_full()
    }

    pub fn bootstrap_nodes(&self) -> &[NodeAddress] {
        &self.bootstrap
    }

    pub fn node_count(&self) -> usize {
        self.live.load().len()
    }
}
