//! Live node directory
//!
//! [`LiveNodes`] is the entry point request builders use: it hands out
//! nodes round robin and keeps the node list current in the background.
//!
//! ```ignore
//! use altlb_cluster::LiveNodes;
//! use altlb_core::LiveNodesConfig;
//!
//! let nodes = LiveNodes::new(&["10.0.0.1", "10.0.0.2"], LiveNodesConfig::default())?;
//! nodes.start();
//!
//! let url = nodes.next_url("/", "");
//! // ... send the request to `url` ...
//!
//! nodes.stop();
//! ```

use crate::discovery::{DiscoveryClient, DiscoveryScope};
use crate::fetch::{HttpFetcher, NodeFetcher};
use crate::membership::NodeMembership;
use crate::scheduler::{spawn_refresh_loop, RefreshDeadline, Refresher};
use crate::topology;
use altlb_core::{unix_now_secs, LbError, LiveNodesConfig, NodeAddress, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Client-side directory of live nodes.
///
/// Cheap to clone; all clones share the same node list and background
/// refresh loop. The loop is stopped by [`stop()`](Self::stop) or when the
/// last clone is dropped.
pub struct LiveNodes<F: NodeFetcher = HttpFetcher> {
    inner: Arc<Inner<F>>,
}

impl<F: NodeFetcher> Clone for LiveNodes<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<F> {
    config: LiveNodesConfig,

    /// Scope applied to refreshes and the correctness check
    scope: DiscoveryScope,

    membership: NodeMembership,

    deadline: RefreshDeadline,

    discovery: DiscoveryClient<F>,

    /// Set once the refresh loop has been spawned
    started: AtomicBool,

    /// Wakes the refresh loop for a traffic-driven refresh
    signal: Arc<Notify>,

    cancel: CancellationToken,
}

impl LiveNodes<HttpFetcher> {
    /// Create a directory that discovers nodes over HTTP.
    ///
    /// `bootstrap` holds bare hosts (no scheme, no port).
    pub fn new<S: AsRef<str>>(bootstrap: &[S], config: LiveNodesConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(&config.transport)?;
        Self::with_fetcher(bootstrap, config, fetcher)
    }
}

impl<F: NodeFetcher> LiveNodes<F> {
    /// Create a directory using a custom transport
    pub fn with_fetcher<S: AsRef<str>>(
        bootstrap: &[S],
        config: LiveNodesConfig,
        fetcher: F,
    ) -> Result<Self> {
        config.validate()?;

        if bootstrap.is_empty() {
            return Err(LbError::EmptyBootstrap);
        }

        let nodes = bootstrap
            .iter()
            .map(|host| NodeAddress::new(config.scheme, host.as_ref(), config.port))
            .collect::<Result<Vec<_>>>()?;

        let inner = Inner {
            scope: DiscoveryScope::from_config(&config),
            membership: NodeMembership::new(nodes)?,
            deadline: RefreshDeadline::new(config.update_period),
            discovery: DiscoveryClient::new(fetcher, config.scheme, config.port),
            started: AtomicBool::new(false),
            signal: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> &LiveNodesConfig {
        &self.inner.config
    }

    /// Start the background refresh loop.
    ///
    /// Idempotent: only the first call spawns the loop. Does nothing when
    /// both update periods are zero, after [`stop()`](Self::stop), or when
    /// called outside a Tokio runtime.
    pub fn start(&self) {
        let config = &self.inner.config;
        if !config.active_refresh_enabled() && !config.idle_refresh_enabled() {
            return;
        }
        if self.inner.cancel.is_cancelled() {
            return;
        }

        if Handle::try_current().is_err() {
            debug!("No Tokio runtime, refresh loop not started");
            return;
        }

        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        spawn_refresh_loop(
            Arc::downgrade(&self.inner),
            config.idle_update_period,
            self.inner.signal.clone(),
            self.inner.cancel.clone(),
        );
    }

    /// Stop the background refresh loop. Safe to call repeatedly and
    /// before [`start()`](Self::start).
    pub fn stop(&self) {
        if !self.inner.cancel.is_cancelled() {
            info!("Stopping live node directory");
            self.inner.cancel.cancel();
        }
    }

    /// Whether the refresh loop has been started and not stopped
    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::Acquire) && !self.inner.cancel.is_cancelled()
    }

    /// Next node to send a request to.
    ///
    /// Never blocks: a due refresh is handed to the background loop and
    /// the node is picked from the current list.
    pub fn next_node(&self) -> NodeAddress {
        self.start();
        self.trigger_refresh();
        self.inner.membership.next_node()
    }

    /// Next node as a URL with the given path and query
    pub fn next_url(&self, path: &str, query: &str) -> Url {
        self.next_node().url_with(path, query)
    }

    /// Refresh the node list now.
    ///
    /// Returns how many nodes were published; an empty answer keeps the
    /// current list and returns 0.
    pub async fn refresh_now(&self) -> Result<usize> {
        self.inner.refresh_now().await
    }

    /// See [`topology::check_rack_datacenter_correct`]
    pub async fn check_rack_datacenter_correct(&self) -> Result<()> {
        let node = self.inner.membership.next_node();
        topology::check_rack_datacenter_correct(&self.inner.discovery, &node, &self.inner.scope)
            .await
    }

    /// See [`topology::check_rack_datacenter_supported`]
    pub async fn check_rack_datacenter_supported(&self) -> Result<bool> {
        let node = self.inner.membership.next_node();
        topology::check_rack_datacenter_supported(&self.inner.discovery, &node).await
    }

    /// Currently published nodes
    pub fn live_nodes(&self) -> Arc<Vec<NodeAddress>> {
        self.inner.membership.live_nodes()
    }

    pub fn bootstrap_nodes(&self) -> &[NodeAddress] {
        self.inner.membership.bootstrap_nodes()
    }

    fn trigger_refresh(&self) {
        if self.inner.deadline.try_claim(unix_now_secs()) {
            debug!("Node list refresh due");
            self.inner.signal.notify_one();
        }
    }
}

impl<F: NodeFetcher> Inner<F> {
    async fn refresh_now(&self) -> Result<usize> {
        let node = self.membership.next_node();
        let nodes = self.discovery.discover(&node, &self.scope).await?;
        let count = nodes.len();

        if self.membership.replace(nodes) {
            debug!(node = %node, count, "Published node list");
            Ok(count)
        } else {
            warn!(node = %node, "Discovery returned no nodes, keeping existing list");
            Ok(0)
        }
    }
}

impl<F: NodeFetcher> Refresher for Inner<F> {
    async fn refresh(&self) -> Result<usize> {
        self.refresh_now().await
    }

    fn deadline(&self) -> &RefreshDeadline {
        &self.deadline
    }
}

impl<F> Drop for Inner<F> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
