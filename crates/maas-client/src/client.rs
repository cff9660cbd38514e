//! MAAS API client
//!
//! Implements the MAAS 2.0 REST API client used during rack bootstrap.
//! Requests are form-encoded and authenticated with OAuth 1.0 PLAINTEXT
//! signatures derived from the user's API key.

use crate::common::oauth::ApiKey;
use crate::common::{HttpClient, field};
use crate::error::MaasError;
use crate::maas_trait::MaasClientTrait;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// MAAS API client
///
/// The underlying `reqwest::Client` pools connections and is safe to share,
/// so a single `MaasClient` behind an `Arc` serves every discovery task.
#[derive(Debug)]
pub struct MaasClient {
    http: HttpClient,
}

impl MaasClient {
    /// Create a new MAAS client
    ///
    /// # Arguments
    /// * `base_url` - MAAS region URL (e.g., "http://172.27.8.1:5240/MAAS/")
    /// * `api_key` - API key in `consumer_key:token_key:token_secret` form
    /// * `timeout` - Upper bound for every individual request
    pub fn new(base_url: String, api_key: &str, timeout: Duration) -> Result<Self, MaasError> {
        let api_key = ApiKey::parse(api_key)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http: HttpClient::new(client, base_url, api_key),
        })
    }

    fn machine_path(system_id: &str) -> String {
        format!("/machines/{}/", urlencoding::encode(system_id))
    }
}

#[async_trait::async_trait]
impl MaasClientTrait for MaasClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API key by asking MAAS who we are.
    async fn validate_credentials(&self) -> Result<(), MaasError> {
        debug!("Validating MAAS API key and connectivity");
        let me: serde_json::Value = self.http.get("/users/", Some("whoami")).await?;
        debug!(
            "API key validated for user {}",
            me.get("username").and_then(|u| u.as_str()).unwrap_or("<unknown>")
        );
        Ok(())
    }

    async fn list_machines(&self) -> Result<Vec<Machine>, MaasError> {
        self.http.get("/machines/", None).await
    }

    async fn create_machine(&self, spec: &MachineSpec) -> Result<Machine, MaasError> {
        let mut form = vec![
            field("hostname", &spec.hostname),
            field("architecture", &spec.architecture),
            field("power_type", &spec.power_type),
        ];
        form.extend(spec.mac_addresses.iter().map(|mac| field("mac_addresses", mac)));
        form.extend(spec.power_parameters.form_fields());

        debug!("Creating machine {} in MAAS", spec.hostname);
        self.http.post("/machines/", None, &form).await
    }

    async fn set_power(&self, system_id: &str, power_type: &str, params: &PowerParameters) -> Result<(), MaasError> {
        let mut form = vec![field("power_type", power_type)];
        form.extend(params.form_fields());

        debug!("Setting {} power parameters on machine {}", power_type, system_id);
        self.http.put_discard(&Self::machine_path(system_id), &form).await
    }

    async fn add_tag(&self, tag: &str, system_id: &str) -> Result<(), MaasError> {
        let path = format!("/tags/{}/", urlencoding::encode(tag));
        // update_nodes ignores machines that already carry the tag
        self.http
            .post_discard(&path, Some("update_nodes"), &[field("add", system_id)])
            .await
    }

    async fn save_machine(&self, machine: &Machine) -> Result<Machine, MaasError> {
        let zone = machine.zone_name().ok_or_else(|| {
            MaasError::InvalidRequest(format!("machine {} has no zone to save", machine.hostname))
        })?;
        self.http
            .put(&Self::machine_path(&machine.system_id), &[field("zone", zone)])
            .await
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, MaasError> {
        self.http.get("/zones/", None).await
    }

    async fn get_zone(&self, name: &str) -> Result<Zone, MaasError> {
        self.http
            .get(&format!("/zones/{}/", urlencoding::encode(name)), None)
            .await
    }

    async fn create_zone(&self, spec: &ZoneSpec) -> Result<Zone, MaasError> {
        let form = [field("name", &spec.name), field("description", &spec.description)];
        self.http.post("/zones/", None, &form).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, MaasError> {
        self.http.get("/tags/", None).await
    }

    async fn get_tag(&self, name: &str) -> Result<Tag, MaasError> {
        self.http
            .get(&format!("/tags/{}/", urlencoding::encode(name)), None)
            .await
    }

    async fn create_tag(&self, spec: &TagSpec) -> Result<Tag, MaasError> {
        let mut form = vec![field("name", &spec.name)];
        if let Some(comment) = &spec.comment {
            form.push(field("comment", comment));
        }
        self.http.post("/tags/", None, &form).await
    }

    async fn list_boot_sources(&self) -> Result<Vec<BootSource>, MaasError> {
        self.http.get("/boot-sources/", None).await
    }

    async fn list_boot_source_selections(&self, boot_source_id: u64) -> Result<Vec<BootSourceSelection>, MaasError> {
        self.http
            .get(&format!("/boot-sources/{}/selections/", boot_source_id), None)
            .await
    }

    async fn create_boot_source_selection(&self, spec: &BootSourceSelectionSpec) -> Result<BootSourceSelection, MaasError> {
        let mut form = vec![field("os", &spec.os), field("release", &spec.release)];
        form.extend(spec.arches.iter().map(|a| field("arches", a)));
        form.extend(spec.subarches.iter().map(|s| field("subarches", s)));
        form.extend(spec.labels.iter().map(|l| field("labels", l)));

        self.http
            .post(&format!("/boot-sources/{}/selections/", spec.boot_source_id), None, &form)
            .await
    }

    async fn start_import(&self) -> Result<(), MaasError> {
        self.http.post_discard("/boot-resources/", Some("import"), &[]).await
    }

    async fn is_importing(&self) -> Result<bool, MaasError> {
        self.http.get("/boot-resources/", Some("is_importing")).await
    }

    async fn list_ssh_keys(&self) -> Result<Vec<SshKey>, MaasError> {
        self.http.get("/account/prefs/sshkeys/", None).await
    }

    async fn create_ssh_key(&self, spec: &SshKeySpec) -> Result<SshKey, MaasError> {
        self.http
            .post("/account/prefs/sshkeys/", None, &[field("key", &spec.key)])
            .await
    }

    async fn import_ssh_keys(&self, keysource: &str) -> Result<Vec<SshKey>, MaasError> {
        self.http
            .post("/account/prefs/sshkeys/", Some("import"), &[field("keysource", keysource)])
            .await
    }

    async fn list_ip_ranges(&self) -> Result<Vec<IpRange>, MaasError> {
        self.http.get("/ipranges/", None).await
    }

    async fn create_ip_range(&self, spec: &IpRangeSpec) -> Result<IpRange, MaasError> {
        let mut form = vec![
            field("type", spec.range_type.as_str()),
            field("start_ip", &spec.start_ip),
            field("end_ip", &spec.end_ip),
        ];
        if let Some(comment) = &spec.comment {
            form.push(field("comment", comment));
        }
        self.http.post("/ipranges/", None, &form).await
    }

    async fn list_rack_controllers(&self) -> Result<Vec<RackController>, MaasError> {
        self.http.get("/rackcontrollers/", None).await
    }

    async fn list_subnets(&self) -> Result<Vec<Subnet>, MaasError> {
        self.http.get("/subnets/", None).await
    }

    async fn enable_dhcp(&self, vlan: &Vlan, primary_rack: &str) -> Result<Vlan, MaasError> {
        let path = format!("/fabrics/{}/vlans/{}/", vlan.fabric_id, vlan.vid);
        let form = [field("dhcp_on", "True"), field("primary_rack", primary_rack)];
        self.http.put(&path, &form).await
    }

    async fn set_config(&self, name: &str, value: &str) -> Result<(), MaasError> {
        debug!("Setting MAAS config {} = {}", name, value);
        self.http
            .post_discard("/maas/", Some("set_config"), &[field("name", name), field("value", value)])
            .await
    }
}
