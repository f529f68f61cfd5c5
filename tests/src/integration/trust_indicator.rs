//! # Trust Indicator
//!
//! Signal aggregation across rounds, subscriber notification and recovery
//! once bad rounds age out of the history.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mrs_remote_nodes::{
        ConfirmationApi, ConfirmationConfig, ConfirmationService, RemoteNode,
        RequestDispatcher, SendOptions, TrustPalette,
    };

    use crate::integration::{params, ChainView, SimulatedNetwork, PRIMARY};

    const VALIDATORS: [&str; 3] = ["10.0.0.1", "10.0.0.2", "10.0.0.3"];

    fn network_with_liar(liar: &str) -> Arc<SimulatedNetwork> {
        let network = SimulatedNetwork::new().with_node(PRIMARY, ChainView::honest());
        let network = VALIDATORS.iter().fold(network, |network, address| {
            let view = if *address == liar {
                ChainView::honest().with_balance("MRS-ALICE", 1)
            } else {
                ChainView::honest()
            };
            network.with_node(address, view)
        });
        Arc::new(network)
    }

    fn create_service(
        network: &Arc<SimulatedNetwork>,
        config: ConfirmationConfig,
    ) -> ConfirmationService<SimulatedNetwork> {
        let service = ConfirmationService::new(config, Arc::clone(network)).unwrap();
        service.add_nodes(VALIDATORS.iter().map(|a| RemoteNode::new(*a)).collect());
        service
    }

    async fn confirm_account(
        service: &ConfirmationService<SimulatedNetwork>,
        network: &SimulatedNetwork,
        account: &str,
    ) {
        let params = params(&[("account", account)]);
        let response = network
            .send("getAccount", &params, &SendOptions::primary())
            .await
            .unwrap();
        service
            .confirm("getAccount", &params, &response, &RemoteNode::new(PRIMARY))
            .unwrap()
            .wait()
            .await;
    }

    #[tokio::test]
    async fn test_single_dissenter_gives_intermediate_color() {
        let network = network_with_liar("10.0.0.2");
        let service = create_service(&network, ConfirmationConfig::for_testing());

        confirm_account(&service, &network, "MRS-BOB").await;
        confirm_account(&service, &network, "MRS-ALICE").await;

        // (1 + 3) + (1 + 2) confirmations, 1 rejection.
        let signal = service.trust_signal();
        assert_eq!(signal.confirmations, 7);
        assert_eq!(signal.rejections, 1);
        assert!((signal.rejection_ratio - 2.0 / 7.0).abs() < 1e-9);

        let palette = TrustPalette::default();
        assert_eq!(signal.color, palette.warning.lerp(palette.danger, 2.0 / 7.0));
        assert_ne!(signal.color, palette.warning);
        assert_ne!(signal.color, palette.danger);
    }

    #[tokio::test]
    async fn test_signal_accumulates_over_rounds() {
        let network = network_with_liar("10.0.0.1");
        let service = create_service(&network, ConfirmationConfig::for_testing());

        for account in ["MRS-ALICE", "MRS-BOB", "MRS-ALICE"] {
            confirm_account(&service, &network, account).await;
        }

        let signal = service.trust_signal();
        assert_eq!(signal.rejections, 2);
        assert_eq!(signal.confirmations, (1 + 2) + (1 + 3) + (1 + 2));
        assert!((signal.rejection_ratio - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rejection_weight_is_configurable() {
        let network = network_with_liar("10.0.0.3");
        let config = ConfirmationConfig {
            rejection_weight: 1.0,
            ..ConfirmationConfig::for_testing()
        };
        let service = create_service(&network, config);

        confirm_account(&service, &network, "MRS-ALICE").await;
        // 1 * 1 / 3
        assert!((service.trust_signal().rejection_ratio - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_subscriber_sees_every_republish() {
        let network = network_with_liar("10.0.0.1");
        let service = create_service(&network, ConfirmationConfig::for_testing());
        let mut rx = service.subscribe_trust();
        assert!(!rx.borrow_and_update().has_rejections);

        confirm_account(&service, &network, "MRS-ALICE").await;
        assert!(rx.has_changed().unwrap());
        let signal = rx.borrow_and_update().clone();
        assert!(signal.has_rejections);
        assert_eq!(signal, service.trust_signal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trust_recovers_after_retention_window() {
        let network = network_with_liar("10.0.0.1");
        let service = create_service(&network, ConfirmationConfig::for_testing());

        confirm_account(&service, &network, "MRS-ALICE").await;
        assert!(service.trust_signal().has_rejections);

        // Still inside the 75s window.
        tokio::time::advance(Duration::from_secs(60)).await;
        confirm_account(&service, &network, "MRS-BOB").await;
        assert_eq!(service.history_rows().len(), 2);
        assert!(service.trust_signal().has_rejections);

        // The bad round is now older than 75s relative to the newest.
        tokio::time::advance(Duration::from_secs(20)).await;
        confirm_account(&service, &network, "MRS-BOB").await;
        let rows = service.history_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.rejecting.is_empty()));

        let signal = service.trust_signal();
        assert!(!signal.has_rejections);
        assert_eq!(signal.color, service.config().palette.neutral);
    }

    #[tokio::test]
    async fn test_history_capped_newest_first() {
        let network = network_with_liar("none");
        let config = ConfirmationConfig {
            max_history: 5,
            ..ConfirmationConfig::for_testing()
        };
        let service = create_service(&network, config);

        for i in 0..8 {
            let account = if i == 7 { "MRS-ALICE" } else { "MRS-BOB" };
            confirm_account(&service, &network, account).await;
        }

        let rows = service.history_rows();
        assert_eq!(rows.len(), 5);
        assert!(rows.windows(2).all(|w| w[0].requested_at >= w[1].requested_at));
        assert_eq!(service.stats().rounds_started, 8);
        assert_eq!(service.trust_signal().confirmations, 5 * 4);
    }
}
