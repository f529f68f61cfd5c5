//! # Confirmation Flow
//!
//! Primary response -> round -> validator replies -> classification, over
//! the simulated network.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mrs_remote_nodes::{
        ConfirmationApi, ConfirmationConfig, ConfirmationService, RemoteNode, RequestDispatcher,
        SendOptions, StaticPeerSource,
    };

    use crate::integration::{params, ChainView, SimulatedNetwork, PRIMARY};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const VALIDATORS: [&str; 3] = ["10.0.0.1", "10.0.0.2", "10.0.0.3"];

    fn honest_network() -> SimulatedNetwork {
        VALIDATORS.iter().fold(
            SimulatedNetwork::new().with_node(PRIMARY, ChainView::honest()),
            |network, address| network.with_node(address, ChainView::honest()),
        )
    }

    fn create_service(
        network: SimulatedNetwork,
    ) -> (ConfirmationService<SimulatedNetwork>, Arc<SimulatedNetwork>) {
        let network = Arc::new(network);
        let service =
            ConfirmationService::new(ConfirmationConfig::for_testing(), Arc::clone(&network))
                .unwrap();
        service.add_nodes(VALIDATORS.iter().map(|a| RemoteNode::new(*a)).collect());
        (service, network)
    }

    /// Send to the primary, confirm, wait for every validator.
    async fn confirm_request(
        service: &ConfirmationService<SimulatedNetwork>,
        network: &SimulatedNetwork,
        request_type: &str,
        pairs: &[(&str, &str)],
    ) -> mrs_remote_nodes::HistoryRow {
        let params = params(pairs);
        let response = network
            .send(request_type, &params, &SendOptions::primary())
            .await
            .unwrap();
        let ticket = service
            .confirm(request_type, &params, &response, &RemoteNode::new(PRIMARY))
            .expect("request should be confirmed");
        let round_id = ticket.round_id();
        ticket.wait().await;
        service.round_row(&round_id).unwrap()
    }

    // =============================================================================
    // CLASSIFICATION
    // =============================================================================

    #[tokio::test]
    async fn test_honest_network_confirms_account() {
        let (service, network) = create_service(honest_network());
        let row = confirm_request(&service, &network, "getAccount", &[("account", "MRS-ALICE")]).await;

        assert_eq!(row.confirming.len(), 3);
        assert!(row.rejecting.is_empty());
        assert!(row.processing.is_empty());

        let signal = service.trust_signal();
        assert!(!signal.has_rejections);
        assert_eq!(signal.color, service.config().palette.neutral);
        assert_eq!(signal.confirmations, 4);
    }

    #[tokio::test]
    async fn test_lying_primary_is_rejected() {
        let network = honest_network().with_node(PRIMARY, ChainView::honest().with_balance("MRS-ALICE", 9_999));
        let (service, network) = create_service(network);

        let row = confirm_request(&service, &network, "getAccount", &[("account", "MRS-ALICE")]).await;
        assert_eq!(row.rejecting.len(), 3);

        // Other accounts still agree.
        let row = confirm_request(&service, &network, "getAccount", &[("account", "MRS-BOB")]).await;
        assert_eq!(row.confirming.len(), 3);

        let signal = service.trust_signal();
        assert!(signal.has_rejections);
        // 2 * 3 / (1 + 1 + 3) > 1
        assert_eq!(signal.rejection_ratio, 1.0);
        assert_eq!(signal.color, service.config().palette.danger);
    }

    #[tokio::test]
    async fn test_block_volatile_fields_ignored() {
        let network = honest_network().with_node("10.0.0.3", ChainView::honest().with_height(1_005));
        let (service, network) = create_service(network);

        // Different tip, different confirmation counts, pruned messages.
        let row = confirm_request(&service, &network, "getBlock", &[("height", "990")]).await;
        assert_eq!(row.confirming.len(), 3, "{row}");
    }

    #[tokio::test]
    async fn test_blockchain_status_compares_stable_fields_only() {
        let network = honest_network().with_node("10.0.0.1", ChainView::honest().with_height(1_001));
        let (service, network) = create_service(network);

        let row = confirm_request(&service, &network, "getBlockchainStatus", &[]).await;
        assert_eq!(row.confirming.len(), 3);
    }

    #[tokio::test]
    async fn test_account_ledger_ignores_ledger_ids() {
        let (service, network) = create_service(honest_network());
        let row = confirm_request(&service, &network, "getAccountLedger", &[("account", "MRS-ALICE")]).await;
        assert_eq!(row.confirming.len(), 3);
        assert!(row.rejecting.is_empty());
    }

    #[tokio::test]
    async fn test_node_state_always_confirms() {
        let network = honest_network().with_node("10.0.0.2", ChainView::honest().with_peers(vec![]));
        let (service, network) = create_service(network);
        let row = confirm_request(&service, &network, "getState", &[]).await;
        assert_eq!(row.confirming.len(), 3);
    }

    #[tokio::test]
    async fn test_peer_lists_compared_by_overlap() {
        let peers = |range: std::ops::RangeInclusive<u32>| -> Vec<String> {
            range.map(|i| format!("10.0.0.{i}")).collect()
        };
        // Primary knows 1..=10.
        let network = honest_network()
            // 8 of 10 shared
            .with_node("10.0.0.1", ChainView::honest().with_peers(peers(3..=12)))
            // 7 of 10 shared: not strictly more than 70%
            .with_node("10.0.0.2", ChainView::honest().with_peers(peers(4..=13)))
            // nothing known
            .with_node("10.0.0.3", ChainView::honest().with_peers(vec![]));
        let (service, network) = create_service(network);

        let row = confirm_request(&service, &network, "getPeers", &[]).await;
        assert_eq!(row.confirming, vec!["10.0.0.1".to_string()]);
        let mut rejecting = row.rejecting.clone();
        rejecting.sort();
        assert_eq!(rejecting, vec!["10.0.0.2".to_string(), "10.0.0.3".to_string()]);
    }

    #[tokio::test]
    async fn test_transaction_list_keeps_height_drops_confirmations() {
        let network = Arc::new(
            SimulatedNetwork::new()
                .with_node("10.0.0.1", ChainView::honest().with_height(100))
                .with_node("10.0.0.2", ChainView::honest().with_height(101)),
        );
        let config = ConfirmationConfig {
            validators_count: 2,
            ..ConfirmationConfig::for_testing()
        };
        let service = ConfirmationService::new(config, Arc::clone(&network)).unwrap();
        service.add_nodes(vec![RemoteNode::new("10.0.0.1"), RemoteNode::new("10.0.0.2")]);

        let params = params(&[("account", "MRS-ALICE")]);
        let response = serde_json::json!({
            "height": 100,
            "transactions": [{"transaction": "t1", "confirmations": 5}],
        });
        let ticket = service
            .confirm("getBlockchainTransactions", &params, &response, &RemoteNode::new(PRIMARY))
            .expect("transaction lists are confirmed");
        let round_id = ticket.round_id();
        ticket.wait().await;

        let row = service.round_row(&round_id).unwrap();
        assert_eq!(row.confirming, vec!["10.0.0.1".to_string()], "{row}");
        assert_eq!(row.rejecting, vec!["10.0.0.2".to_string()], "{row}");
        assert!(service.trust_signal().has_rejections);
    }

    #[tokio::test]
    async fn test_suffixed_request_type_confirmed() {
        let (service, network) = create_service(honest_network());
        let row = confirm_request(&service, &network, "getBlock+withTransactions", &[("height", "990")]).await;
        assert_eq!(row.confirming.len(), 3, "{row}");
    }

    // =============================================================================
    // FAILURES AND TIMEOUTS
    // =============================================================================

    #[tokio::test]
    async fn test_error_replies_and_unreachable_nodes_are_discounted() {
        let network = Arc::new(
            honest_network().with_node("10.0.0.1", ChainView::honest().failing(5)),
        );
        let config = ConfirmationConfig {
            validators_count: 4,
            ..ConfirmationConfig::for_testing()
        };
        let service = ConfirmationService::new(config, Arc::clone(&network)).unwrap();
        // 10.9.9.9 is not part of the network.
        service.add_nodes(
            VALIDATORS
                .iter()
                .chain(std::iter::once(&"10.9.9.9"))
                .map(|a| RemoteNode::new(*a))
                .collect(),
        );

        let row = confirm_request(&service, &network, "getAccount", &[("account", "MRS-BOB")]).await;
        assert_eq!(row.confirming.len(), 2);
        assert!(row.rejecting.is_empty());
        assert!(row.processing.is_empty());
        assert!(row.timed_out.is_empty());
        assert_eq!(service.stats().discounted, 2);
        assert!(!service.trust_signal().has_rejections);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_and_slow_validators() {
        let network = honest_network()
            .with_node("10.0.0.1", ChainView::honest().silent())
            .with_node("10.0.0.2", ChainView::honest().delayed(Duration::from_millis(1_500)))
            .with_node("10.0.0.3", ChainView::honest().delayed(Duration::from_secs(5)));
        let (service, network) = create_service(network);

        let row = confirm_request(&service, &network, "getAccount", &[("account", "MRS-ALICE")]).await;
        assert_eq!(row.confirming, vec!["10.0.0.2".to_string()]);
        let mut timed_out = row.timed_out.clone();
        timed_out.sort();
        assert_eq!(timed_out, vec!["10.0.0.1".to_string(), "10.0.0.3".to_string()]);
        assert!(row.processing.is_empty());
        assert_eq!(service.stats().timed_out, 2);
    }

    #[tokio::test]
    async fn test_pending_validators_visible_while_outstanding() {
        let network = honest_network()
            .with_node("10.0.0.1", ChainView::honest().delayed(Duration::from_millis(200)));
        let (service, network) = create_service(network);

        let params = params(&[("account", "MRS-ALICE")]);
        let response = network
            .send("getAccount", &params, &SendOptions::primary())
            .await
            .unwrap();
        let ticket = service
            .confirm("getAccount", &params, &response, &RemoteNode::new(PRIMARY))
            .unwrap();

        let row = service.round_row(&ticket.round_id()).unwrap();
        assert_eq!(row.processing.len() + row.confirming.len(), 3);
        assert!(row.processing.contains(&"10.0.0.1".to_string()));

        ticket.wait().await;
        assert!(service.history_rows()[0].processing.is_empty());
    }

    // =============================================================================
    // SELECTION
    // =============================================================================

    #[tokio::test]
    async fn test_mutating_and_local_requests_not_confirmed() {
        let (service, _network) = create_service(honest_network());
        let primary = RemoteNode::new(PRIMARY);
        let response = serde_json::json!({"transaction": "1"});

        assert!(service.confirm("sendMoney", &params(&[]), &response, &primary).is_none());
        assert!(service.confirm("getForging", &params(&[]), &response, &primary).is_none());
        assert!(service.confirm("getNothing", &params(&[]), &response, &primary).is_none());
        assert!(service.history_rows().is_empty());
    }

    #[tokio::test]
    async fn test_blacklisted_and_primary_nodes_never_validate() {
        let network = honest_network().with_node("10.0.0.4", ChainView::honest());
        let (service, network) = create_service(network);
        service.add_nodes(vec![
            RemoteNode::new("10.0.0.4").blacklisted(),
            RemoteNode::new(PRIMARY),
        ]);

        for _ in 0..10 {
            let row = confirm_request(&service, &network, "getBlockchainStatus", &[]).await;
            assert!(!row.confirming.contains(&"10.0.0.4".to_string()));
            assert!(!row.confirming.contains(&PRIMARY.to_string()));
            assert_eq!(row.confirming.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_empty_registry_records_round_without_votes() {
        let network = Arc::new(honest_network());
        let service =
            ConfirmationService::new(ConfirmationConfig::for_testing(), Arc::clone(&network))
                .unwrap();

        let row = confirm_request(&service, &network, "getBlockchainStatus", &[]).await;
        assert!(row.confirming.is_empty());
        assert!(row.rejecting.is_empty());
        assert_eq!(service.trust_signal().confirmations, 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_validators() {
        let network = honest_network().with_node("10.0.0.7", ChainView::honest());
        let (service, network) = create_service(network);

        let source = StaticPeerSource {
            peers: vec![RemoteNode::new("10.0.0.7")],
        };
        assert_eq!(service.refresh_nodes(&source).await.unwrap(), 1);

        let row = confirm_request(&service, &network, "getAccount", &[("account", "MRS-BOB")]).await;
        assert_eq!(row.confirming, vec!["10.0.0.7".to_string()]);
    }
}
