//! Unit tests for node discovery

#[cfg(test)]
mod tests {
    use crate::config::BootstrapConfig;
    use crate::discovery::*;
    use crate::test_utils::*;
    use maas_client::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    struct Rig {
        config: BootstrapConfig,
        client: MockMaasClient,
        probe: Arc<MockProbe>,
    }

    impl Rig {
        fn new() -> Self {
            let config = test_config(&[]);
            let client = seeded_client(&config.layout);
            add_placement(&client, &config);
            Self {
                config,
                client,
                probe: Arc::new(MockProbe::new()),
            }
        }

        fn address(&self, slot: u8) -> Ipv4Addr {
            self.config.layout.management_address(slot).unwrap()
        }

        async fn discover(&self) -> DiscoveryReport {
            let snapshot = DiscoverySnapshot::fetch(&self.client, &self.config.baseline)
                .await
                .unwrap();
            let discovery = NodeDiscovery::new(
                Arc::new(self.client.clone()),
                self.probe.clone(),
                self.config.layout,
                DiscoverySettings::from_config(&self.config),
            );
            discovery.run(snapshot).await
        }
    }

    #[tokio::test]
    async fn test_all_slots_enlisted_on_fresh_rack() {
        let rig = Rig::new();

        let report = rig.discover().await;

        assert_eq!(report.outcomes.len(), 10);
        assert_eq!(report.succeeded(), 10);
        assert_eq!(report.created(), 10);

        for slot in 1..=10u8 {
            let hostname = format!("node{:02}ob8", slot);
            let machine = rig.client.machine_by_hostname(&hostname).unwrap();
            assert_eq!(machine.architecture, "amd64/generic");
            assert_eq!(machine.power_type, "amt");
            assert_eq!(
                machine.mac_addresses(),
                vec![MockProbe::mac_for(rig.address(slot)).to_string().as_str()]
            );

            let (power_type, params) = rig.client.power_of(&machine.system_id).unwrap();
            assert_eq!(power_type, "amt");
            assert_eq!(params.power_address, format!("172.27.8.{}", 10 + slot));
            assert_eq!(params.power_pass, "Password1+");

            let tags: Vec<_> = machine.tag_names.iter().map(String::as_str).collect();
            assert_eq!(tags, vec!["physical", "use-fastpath-installer"]);
        }
    }

    #[tokio::test]
    async fn test_zones_assigned_in_buckets_of_six() {
        let rig = Rig::new();

        rig.discover().await;

        for slot in 1..=6u8 {
            let machine = rig.client.machine_by_hostname(&format!("node{:02}ob8", slot)).unwrap();
            assert_eq!(machine.zone_name(), Some("zone1"), "slot {}", slot);
        }
        for slot in 7..=10u8 {
            let machine = rig.client.machine_by_hostname(&format!("node{:02}ob8", slot)).unwrap();
            assert_eq!(machine.zone_name(), Some("zone2"), "slot {}", slot);
        }
    }

    #[tokio::test]
    async fn test_unreachable_slot_does_not_affect_others() {
        let rig = Rig::new();
        rig.probe.mark_down(rig.address(4).to_string());

        let report = rig.discover().await;

        assert_eq!(report.succeeded(), 9);
        assert_eq!(
            report.outcome(4),
            Some(&SlotOutcome::Skipped {
                slot: 4,
                hostname: "node04ob8".to_string(),
                reason: SkipReason::Unreachable,
            })
        );
        assert_eq!(rig.client.call_count("create_machine"), 9);
        assert!(rig.client.machine_by_hostname("node04ob8").is_none());
    }

    #[tokio::test]
    async fn test_missing_neighbor_entry_skips_slot() {
        let rig = Rig::new();
        rig.probe.drop_neighbor(rig.address(2));

        let report = rig.discover().await;

        let skipped: Vec<_> = report.skipped().map(|o| o.slot()).collect();
        assert_eq!(skipped, vec![2]);
        match report.outcome(2) {
            Some(SlotOutcome::Skipped { reason, .. }) => {
                assert_eq!(*reason, SkipReason::NoNeighborEntry);
                assert_eq!(reason.to_string(), "no neighbor entry");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_existing_machine_is_reused_and_repowered() {
        let rig = Rig::new();
        rig.client.add_machine(enlisted_machine("abc123", "node03ob8"));

        let report = rig.discover().await;

        assert_eq!(
            report.outcome(3),
            Some(&SlotOutcome::Done {
                slot: 3,
                hostname: "node03ob8".to_string(),
                system_id: "abc123".to_string(),
                created: false,
            })
        );
        assert!(!rig.client.calls().contains(&"create_machine:node03ob8".to_string()));
        assert_eq!(rig.client.call_count("create_machine"), 9);

        let (power_type, params) = rig.client.power_of("abc123").unwrap();
        assert_eq!(power_type, "amt");
        assert_eq!(params.power_address, "172.27.8.13");
        assert_eq!(rig.client.machine_by_hostname("node03ob8").unwrap().zone_name(), Some("zone1"));
    }

    #[tokio::test]
    async fn test_second_pass_creates_nothing_and_keeps_tags() {
        let rig = Rig::new();

        let first = rig.discover().await;
        let second = rig.discover().await;

        assert_eq!(first.created(), 10);
        assert_eq!(second.succeeded(), 10);
        assert_eq!(second.created(), 0);
        assert_eq!(rig.client.call_count("create_machine"), 10);

        let machine = rig.client.machine_by_hostname("node07ob8").unwrap();
        assert_eq!(machine.tag_names.len(), 2);
        assert_eq!(machine.zone_name(), Some("zone2"));

        // System ids stay stable across passes
        for (a, b) in first.outcomes.iter().zip(&second.outcomes) {
            match (a, b) {
                (
                    SlotOutcome::Done { system_id: first_id, .. },
                    SlotOutcome::Done { system_id: second_id, .. },
                ) => assert_eq!(first_id, second_id),
                other => panic!("unexpected outcomes: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_registration_failure_isolated() {
        let rig = Rig::new();
        rig.client.fail_on("create_machine:node05ob8");

        let report = rig.discover().await;

        assert_eq!(report.succeeded(), 9);
        assert!(matches!(
            report.outcome(5),
            Some(SlotOutcome::Skipped { reason: SkipReason::Registration(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_power_failure_skips_before_tagging() {
        let rig = Rig::new();
        rig.client.add_machine(enlisted_machine("abc123", "node01ob8"));
        rig.client.fail_on("set_power:abc123");

        let report = rig.discover().await;

        assert!(matches!(
            report.outcome(1),
            Some(SlotOutcome::Skipped { reason: SkipReason::PowerConfiguration(_), .. })
        ));
        assert!(!rig.client.calls().contains(&"add_tag:abc123".to_string()));
        assert!(!rig.client.calls().contains(&"save_machine:abc123".to_string()));
        assert_eq!(report.succeeded(), 9);
    }

    #[tokio::test]
    async fn test_tag_failure_skips_slot() {
        let rig = Rig::new();
        rig.client.add_machine(enlisted_machine("abc123", "node10ob8"));
        rig.client.fail_on("add_tag:abc123");

        let report = rig.discover().await;

        match report.outcome(10) {
            Some(SlotOutcome::Skipped { reason, .. }) => {
                assert!(reason.to_string().starts_with("tag assignment failed: physical"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_zone_bucket_skips_slot() {
        let rig = Rig::new();
        let mut snapshot = DiscoverySnapshot::fetch(&rig.client, &rig.config.baseline)
            .await
            .unwrap();
        snapshot.zones.truncate(1);

        let discovery = NodeDiscovery::new(
            Arc::new(rig.client.clone()),
            rig.probe.clone(),
            rig.config.layout,
            DiscoverySettings::from_config(&rig.config),
        );
        let report = discovery.run(snapshot).await;

        assert_eq!(report.succeeded(), 6);
        for outcome in report.skipped() {
            assert!(outcome.slot() >= 7);
            assert!(matches!(
                outcome,
                SlotOutcome::Skipped { reason: SkipReason::ZoneAssignment(_), .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_save_failure_reported_as_zone_assignment() {
        let rig = Rig::new();
        rig.client.add_machine(enlisted_machine("abc123", "node06ob8"));
        rig.client.fail_on("save_machine:abc123");

        let report = rig.discover().await;

        assert!(matches!(
            report.outcome(6),
            Some(SlotOutcome::Skipped { reason: SkipReason::ZoneAssignment(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_report_is_ordered_by_slot() {
        let rig = Rig::new();
        rig.probe.mark_down(rig.address(9).to_string());
        rig.probe.drop_neighbor(rig.address(1));

        let report = rig.discover().await;

        let slots: Vec<u8> = report.outcomes.iter().map(SlotOutcome::slot).collect();
        assert_eq!(slots, (1..=10).collect::<Vec<u8>>());
        assert_eq!(report.outcomes[0].hostname(), "node01ob8");
    }

    #[tokio::test]
    async fn test_inventory_read_once_before_fan_out() {
        let rig = Rig::new();
        rig.client.add_machine(enlisted_machine("abc123", "node02ob8"));

        let snapshot = DiscoverySnapshot::fetch(&rig.client, &rig.config.baseline)
            .await
            .unwrap();
        assert_eq!(rig.client.read_count("list_machines"), 1);
        assert_eq!(rig.client.read_count("get_zone"), 2);
        assert_eq!(rig.client.read_count("get_tag"), 2);

        rig.client.clear_reads();
        let discovery = NodeDiscovery::new(
            Arc::new(rig.client.clone()),
            rig.probe.clone(),
            rig.config.layout,
            DiscoverySettings::from_config(&rig.config),
        );
        let report = discovery.run(snapshot).await;

        assert_eq!(report.succeeded(), 10);
        for op in ["list_machines", "get_zone", "get_tag", "list_zones", "list_tags"] {
            assert_eq!(rig.client.read_count(op), 0, "{} read during fan-out", op);
        }
    }

    #[tokio::test]
    async fn test_snapshot_requires_baseline_zones() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);

        assert!(DiscoverySnapshot::fetch(&client, &config.baseline).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_slots_yields_empty_report() {
        let rig = Rig::new();
        let mut settings = DiscoverySettings::from_config(&rig.config);
        settings.slots = 0;

        let discovery = NodeDiscovery::new(
            Arc::new(rig.client.clone()),
            rig.probe.clone(),
            rig.config.layout,
            settings,
        );
        let report = discovery.run(DiscoverySnapshot::default()).await;

        assert!(report.outcomes.is_empty());
        assert!(rig.client.calls().is_empty());
    }
}
