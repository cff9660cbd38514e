//! Main bootstrap sequence.
//!
//! `Bootstrap` runs the stages in order and stops at the first fatal error:
//! - readiness: outbound network, then DNS
//! - credentials: the API key must be accepted by the region
//! - baseline: IP range, DHCP, region settings, SSH keys, images, zones, tags
//! - import: boot images, polled until MAAS reports the import finished
//! - discovery: every slot enlisted, powered, tagged and placed

use crate::config::BootstrapConfig;
use crate::discovery::{DiscoveryReport, DiscoverySettings, DiscoverySnapshot, NodeDiscovery};
use crate::error::BootstrapError;
use crate::readiness::wait_until;
use crate::reconciler::Reconciler;
use maas_client::MaasClientTrait;
use net_probe::ProbeService;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives one bootstrap run of a rack.
pub struct Bootstrap {
    config: BootstrapConfig,
    client: Arc<dyn MaasClientTrait>,
    probe: Arc<dyn ProbeService>,
}

impl Bootstrap {
    pub fn new(config: BootstrapConfig, client: Arc<dyn MaasClientTrait>, probe: Arc<dyn ProbeService>) -> Self {
        Self { config, client, probe }
    }

    /// Run every enabled stage
    ///
    /// Returns the discovery report, or `None` when discovery was skipped.
    /// Skipped slots are not an error.
    pub async fn run(&self) -> Result<Option<DiscoveryReport>, BootstrapError> {
        if self.config.skip_network_wait {
            info!("Skipping network readiness checks");
        } else {
            self.wait_for_network().await?;
        }

        info!("Validating MAAS credentials against {}", self.client.base_url());
        self.client.validate_credentials().await.map_err(|e| {
            error!("MAAS rejected the API key or is unreachable: {}", e);
            BootstrapError::Maas(e)
        })?;
        info!("✅ MAAS credentials validated");

        if self.config.skip_baseline {
            info!("Skipping baseline reconciliation and image import");
        } else {
            let reconciler = Reconciler::new(Arc::clone(&self.client), &self.config);
            reconciler.reconcile_baseline().await?;
            reconciler.import_images(self.config.import_poll).await?;
        }

        if self.config.skip_discovery {
            info!("Skipping node discovery");
            return Ok(None);
        }

        let snapshot = DiscoverySnapshot::fetch(&*self.client, &self.config.baseline).await?;
        let discovery = NodeDiscovery::new(
            Arc::clone(&self.client),
            Arc::clone(&self.probe),
            self.config.layout,
            DiscoverySettings::from_config(&self.config),
        );
        let report = discovery.run(snapshot).await;
        report.log_summary();
        if report.succeeded() == 0 && !report.outcomes.is_empty() {
            warn!("No slot in rack {} could be enlisted", self.config.layout.rack_id());
        }
        Ok(Some(report))
    }

    /// Block until the configured network and DNS probe targets answer
    pub async fn wait_for_network(&self) -> Result<(), BootstrapError> {
        let probe = &*self.probe;

        let network = self.config.network_probe.as_str();
        info!("Waiting for network ({})", network);
        wait_until(&format!("network ({})", network), self.config.readiness, move || async move {
            ping_ok(probe, network).await
        })
        .await
        .inspect_err(|_| error!("{} is unreachable. Please fix the network.", network))?;

        let dns = self.config.dns_probe.as_str();
        info!("Waiting for DNS ({})", dns);
        wait_until(&format!("DNS ({})", dns), self.config.readiness, move || async move {
            ping_ok(probe, dns).await
        })
        .await
        .inspect_err(|_| error!("{} does not resolve or answer. Please fix the DNS.", dns))?;

        info!("✅ Network and DNS ready");
        Ok(())
    }
}

async fn ping_ok(probe: &dyn ProbeService, target: &str) -> bool {
    match probe.ping(target).await {
        Ok(alive) => alive,
        Err(e) => {
            warn!("Probe of {} failed: {}", target, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SlotOutcome;
    use crate::test_utils::*;
    use maas_client::MockMaasClient;
    use tracing_test::traced_test;

    fn bootstrap(extra: &[&str], client: &MockMaasClient, probe: &Arc<MockProbe>) -> Bootstrap {
        let config = test_config(extra);
        Bootstrap::new(config, Arc::new(client.clone()), probe.clone())
    }

    #[tokio::test]
    async fn test_full_run_on_fresh_region() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        client.set_import_duration(2);
        let probe = Arc::new(MockProbe::new());
        probe.up_after("8.8.8.8", 2);

        let report = bootstrap(&[], &client, &probe).run().await.unwrap().unwrap();

        assert_eq!(probe.ping_count("8.8.8.8"), 3);
        assert_eq!(probe.ping_count("launchpad.net"), 1);
        assert_eq!(report.succeeded(), 10);
        assert_eq!(client.call_count("start_import"), 1);
        assert!(client.machine_by_hostname("node10ob8").is_some());
    }

    #[tokio::test]
    async fn test_network_timeout_aborts_before_maas() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        let probe = Arc::new(MockProbe::new());
        probe.mark_down("8.8.8.8");

        let err = bootstrap(&["--readiness-attempts", "5"], &client, &probe)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::ReadinessTimeout { attempts: 5, .. }));
        assert_eq!(probe.ping_count("8.8.8.8"), 5);
        assert_eq!(probe.ping_count("launchpad.net"), 0);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_network_timeout_logs_guidance() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        let probe = Arc::new(MockProbe::new());
        probe.mark_down("8.8.8.8");

        let result = bootstrap(&["--readiness-attempts", "2"], &client, &probe).run().await;

        assert!(result.is_err());
        assert!(logs_contain("8.8.8.8 is unreachable. Please fix the network."));
        assert!(!logs_contain("Please fix the DNS."));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_dns_timeout_logs_guidance() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        let probe = Arc::new(MockProbe::new());
        probe.mark_down("launchpad.net");

        let result = bootstrap(&["--readiness-attempts", "2"], &client, &probe).run().await;

        assert!(result.is_err());
        assert!(logs_contain("Please fix the DNS."));
    }

    #[tokio::test]
    async fn test_dns_timeout_after_network_ready() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        let probe = Arc::new(MockProbe::new());
        probe.mark_down("launchpad.net");

        let err = bootstrap(&["--readiness-attempts", "3"], &client, &probe)
            .run()
            .await
            .unwrap_err();

        match err {
            BootstrapError::ReadinessTimeout { what, attempts } => {
                assert_eq!(what, "DNS (launchpad.net)");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_credentials_abort() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        client.fail_on("validate_credentials");
        let probe = Arc::new(MockProbe::new());

        let err = bootstrap(&[], &client, &probe).run().await.unwrap_err();

        assert!(matches!(err, BootstrapError::Maas(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_skip_flags() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        add_placement(&client, &config);
        let probe = Arc::new(MockProbe::new());

        let report = bootstrap(&["--skip-network-wait", "--skip-baseline"], &client, &probe)
            .run()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(probe.ping_count("8.8.8.8"), 0);
        assert_eq!(client.call_count("start_import"), 0);
        assert_eq!(client.call_count("create_zone"), 0);
        assert!(matches!(report.outcome(1), Some(SlotOutcome::Done { .. })));

        let none = bootstrap(&["--skip-network-wait", "--skip-baseline", "--skip-discovery"], &client, &probe)
            .run()
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let config = test_config(&[]);
        let client = seeded_client(&config.layout);
        let probe = Arc::new(MockProbe::new());

        bootstrap(&[], &client, &probe).run().await.unwrap();
        let mutations = client.calls().len();
        let report = bootstrap(&[], &client, &probe).run().await.unwrap().unwrap();

        assert_eq!(report.created(), 0);
        assert_eq!(client.call_count("create_machine"), 10);
        assert_eq!(client.call_count("create_zone"), 2);
        // A rerun only repeats the unconditional steps: region settings,
        // import and per-slot power/tag/zone updates
        let repeated: Vec<_> = client.calls()[mutations..]
            .iter()
            .filter(|c| c.starts_with("create_") || c.starts_with("import_ssh_keys") || c.starts_with("enable_dhcp"))
            .cloned()
            .collect();
        assert!(repeated.is_empty(), "unexpected creations: {repeated:?}");
    }
}
