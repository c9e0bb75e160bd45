//! Rack/datacenter awareness checks

use crate::discovery::{DiscoveryClient, DiscoveryScope};
use crate::fetch::NodeFetcher;
use altlb_core::{LbError, NodeAddress, Result};
use tracing::debug;

/// Rack name no cluster is expected to have
pub const FAKE_RACK: &str = "fakeRack";

/// Verify that the cluster knows the configured rack/datacenter.
///
/// An unscoped configuration always passes. A scoped query that comes back
/// empty means the cluster does not recognize the rack or datacenter.
pub async fn check_rack_datacenter_correct<F: NodeFetcher>(
    client: &DiscoveryClient<F>,
    node: &NodeAddress,
    scope: &DiscoveryScope,
) -> Result<()> {
    if scope.is_unscoped() {
        return Ok(());
    }

    let nodes = client.discover(node, scope).await?;
    if nodes.is_empty() {
        return Err(LbError::UnknownRackOrDatacenter(scope.to_string()));
    }

    debug!(node = %node, scope = %scope, count = nodes.len(), "Rack/datacenter recognized");
    Ok(())
}

/// Probe whether the cluster honors rack/datacenter scoped queries.
///
/// Asks `node` for its nodes twice: unscoped, and scoped to a rack that
/// does not exist. A cluster without the feature ignores the scope and
/// returns the same list both times.
pub async fn check_rack_datacenter_supported<F: NodeFetcher>(
    client: &DiscoveryClient<F>,
    node: &NodeAddress,
) -> Result<bool> {
    let with_fake_rack = client.discover(node, &DiscoveryScope::rack(FAKE_RACK)).await?;
    let without_rack = client.discover(node, &DiscoveryScope::unscoped()).await?;

    if without_rack.is_empty() {
        return Err(LbError::EmptyNodeList);
    }

    let supported = with_fake_rack.len() != without_rack.len();
    debug!(node = %node, supported, "Probed rack/datacenter support");
    Ok(supported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{json_hosts, ScriptedFetcher};
    use crate::fetch::FetchResponse;
    use altlb_core::Scheme;
    use reqwest::StatusCode;
    use tokio_test::{assert_err, assert_ok};
    use url::Url;

    fn node() -> NodeAddress {
        NodeAddress::new(Scheme::Http, "10.0.0.1", 8080).unwrap()
    }

    fn query_param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Cluster with dc1/rack1 holding two nodes and dc2 holding one
    fn rack_aware_cluster() -> std::sync::Arc<ScriptedFetcher> {
        ScriptedFetcher::new(|url| {
            let rack = query_param(url, "rack");
            let dc = query_param(url, "dc");
            let hosts: Vec<&str> = match (rack.as_deref(), dc.as_deref()) {
                (None, None) => vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"],
                (None, Some("dc1")) | (Some("rack1"), Some("dc1")) | (Some("rack1"), None) => {
                    vec!["10.0.0.1", "10.0.0.2"]
                }
                (None, Some("dc2")) => vec!["10.0.0.3"],
                _ => vec![],
            };
            Ok(json_hosts(&hosts))
        })
    }

    fn rack_unaware_cluster() -> std::sync::Arc<ScriptedFetcher> {
        ScriptedFetcher::hosts(&["10.0.0.1", "10.0.0.2"])
    }

    #[tokio::test]
    async fn test_unscoped_is_trivially_correct() {
        let fetcher = rack_aware_cluster();
        let client = DiscoveryClient::new(fetcher.clone(), Scheme::Http, 8080);

        let scope = DiscoveryScope::unscoped();
        assert_ok!(check_rack_datacenter_correct(&client, &node(), &scope).await);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_known_datacenter_is_correct() {
        let client = DiscoveryClient::new(rack_aware_cluster(), Scheme::Http, 8080);
        let scope = DiscoveryScope {
            rack: None,
            datacenter: Some("dc1".into()),
        };

        assert_ok!(check_rack_datacenter_correct(&client, &node(), &scope).await);
    }

    #[tokio::test]
    async fn test_known_rack_is_correct() {
        let client = DiscoveryClient::new(rack_aware_cluster(), Scheme::Http, 8080);
        let scope = DiscoveryScope {
            rack: Some("rack1".into()),
            datacenter: Some("dc1".into()),
        };

        assert_ok!(check_rack_datacenter_correct(&client, &node(), &scope).await);
    }

    #[tokio::test]
    async fn test_wrong_datacenter_is_configuration_error() {
        let client = DiscoveryClient::new(rack_aware_cluster(), Scheme::Http, 8080);
        let scope = DiscoveryScope {
            rack: None,
            datacenter: Some("wrongDC".into()),
        };

        let err = check_rack_datacenter_correct(&client, &node(), &scope)
            .await
            .unwrap_err();
        assert!(matches!(err, LbError::UnknownRackOrDatacenter(_)));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_wrong_rack_is_configuration_error() {
        let client = DiscoveryClient::new(rack_aware_cluster(), Scheme::Http, 8080);
        let scope = DiscoveryScope {
            rack: Some("wrongRack".into()),
            datacenter: Some("dc1".into()),
        };

        let err = assert_err!(check_rack_datacenter_correct(&client, &node(), &scope).await);
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_correctness_check_propagates_transport_error() {
        let fetcher = ScriptedFetcher::new(|_| Err(LbError::Timeout));
        let client = DiscoveryClient::new(fetcher, Scheme::Http, 8080);

        let err = check_rack_datacenter_correct(&client, &node(), &DiscoveryScope::rack("r1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LbError::Timeout));
    }

    #[tokio::test]
    async fn test_feature_supported() {
        let fetcher = rack_aware_cluster();
        let client = DiscoveryClient::new(fetcher.clone(), Scheme::Http, 8080);

        assert!(check_rack_datacenter_supported(&client, &node()).await.unwrap());

        // Both probes go to the same node
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].host_str(), calls[1].host_str());
        assert_eq!(query_param(&calls[0], "rack").as_deref(), Some(FAKE_RACK));
        assert_eq!(calls[1].query(), None);
    }

    #[tokio::test]
    async fn test_feature_unsupported() {
        let client = DiscoveryClient::new(rack_unaware_cluster(), Scheme::Http, 8080);
        assert!(!check_rack_datacenter_supported(&client, &node()).await.unwrap());
    }

    #[tokio::test]
    async fn test_feature_probe_empty_cluster_errors() {
        let client = DiscoveryClient::new(ScriptedFetcher::hosts(&[]), Scheme::Http, 8080);
        let err = check_rack_datacenter_supported(&client, &node())
            .await
            .unwrap_err();
        assert!(matches!(err, LbError::EmptyNodeList));
    }

    #[tokio::test]
    async fn test_feature_probe_non_ok_status() {
        let fetcher = ScriptedFetcher::new(|_| Ok(FetchResponse::new(StatusCode::NOT_FOUND, "")));
        let client = DiscoveryClient::new(fetcher, Scheme::Http, 8080);
        let err = check_rack_datacenter_supported(&client, &node())
            .await
            .unwrap_err();
        assert!(err.is_protocol());
    }
}
