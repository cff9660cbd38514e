//! Baseline operations for MockMaasClient
//!
//! Handles zones, tags, boot sources, SSH keys, IP ranges and region config

use super::MockMaasClient;
use crate::error::MaasError;
use crate::models::*;

pub async fn list_zones(client: &MockMaasClient) -> Result<Vec<Zone>, MaasError> {
        client.check_read("list_zones")?;
        Ok(client.zones.lock().unwrap().values().cloned().collect())
}

pub async fn get_zone(client: &MockMaasClient, name: &str) -> Result<Zone, MaasError> {
        client.check_read("get_zone")?;
        client.zones
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| MaasError::NotFound(format!("Zone {} not found", name)))
}

pub async fn create_zone(client: &MockMaasClient, spec: &ZoneSpec) -> Result<Zone, MaasError> {
        client.record("create_zone", &spec.name)?;

        let mut zones = client.zones.lock().unwrap();
        if zones.contains_key(&spec.name) {
            return Err(MaasError::InvalidRequest(format!("Zone {} already exists", spec.name)));
        }
        let zone = Zone {
            id: client.next_id(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            resource_uri: format!("/MAAS/api/2.0/zones/{}/", spec.name),
        };
        zones.insert(zone.name.clone(), zone.clone());
        Ok(zone)
}

pub async fn list_tags(client: &MockMaasClient) -> Result<Vec<Tag>, MaasError> {
        client.check_read("list_tags")?;
        Ok(client.tags.lock().unwrap().values().cloned().collect())
}

pub async fn get_tag(client: &MockMaasClient, name: &str) -> Result<Tag, MaasError> {
        client.check_read("get_tag")?;
        client.tags
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| MaasError::NotFound(format!("Tag {} not found", name)))
}

pub async fn create_tag(client: &MockMaasClient, spec: &TagSpec) -> Result<Tag, MaasError> {
        client.record("create_tag", &spec.name)?;

        let mut tags = client.tags.lock().unwrap();
        if tags.contains_key(&spec.name) {
            return Err(MaasError::InvalidRequest(format!("Tag {} already exists", spec.name)));
        }
        let tag = Tag {
            name: spec.name.clone(),
            definition: String::new(),
            comment: spec.comment.clone().unwrap_or_default(),
            kernel_opts: String::new(),
            resource_uri: format!("/MAAS/api/2.0/tags/{}/", spec.name),
        };
        tags.insert(tag.name.clone(), tag.clone());
        Ok(tag)
}

pub async fn list_boot_sources(client: &MockMaasClient) -> Result<Vec<BootSource>, MaasError> {
        client.check_read("list_boot_sources")?;
        Ok(client.boot_sources.lock().unwrap().clone())
}

pub async fn list_boot_source_selections(client: &MockMaasClient, boot_source_id: u64) -> Result<Vec<BootSourceSelection>, MaasError> {
        client.check_read("list_boot_source_selections")?;
        Ok(client.selections
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.boot_source_id == boot_source_id)
            .cloned()
            .collect())
}

pub async fn create_boot_source_selection(client: &MockMaasClient, spec: &BootSourceSelectionSpec) -> Result<BootSourceSelection, MaasError> {
        client.record("create_boot_source_selection", &format!("{}/{}", spec.os, spec.release))?;

        if !client.boot_sources.lock().unwrap().iter().any(|b| b.id == spec.boot_source_id) {
            return Err(MaasError::NotFound(format!("Boot source {} not found", spec.boot_source_id)));
        }
        let mut selections = client.selections.lock().unwrap();
        if selections.iter().any(|s| {
            s.boot_source_id == spec.boot_source_id && s.os == spec.os && s.release == spec.release
        }) {
            return Err(MaasError::InvalidRequest(format!(
                "Boot source selection {}/{} already exists",
                spec.os, spec.release
            )));
        }
        let selection = BootSourceSelection {
            id: client.next_id(),
            os: spec.os.clone(),
            release: spec.release.clone(),
            arches: spec.arches.clone(),
            subarches: spec.subarches.clone(),
            labels: spec.labels.clone(),
            boot_source_id: spec.boot_source_id,
        };
        selections.push(selection.clone());
        Ok(selection)
}

pub async fn start_import(client: &MockMaasClient) -> Result<(), MaasError> {
        client.record("start_import", "boot-resources")?;
        *client.importing.lock().unwrap() = true;
        Ok(())
}

pub async fn is_importing(client: &MockMaasClient) -> Result<bool, MaasError> {
        client.check_read("is_importing")?;
        let mut importing = client.importing.lock().unwrap();
        if !*importing {
            return Ok(false);
        }
        let mut remaining = client.import_polls.lock().unwrap();
        if *remaining == 0 {
            *importing = false;
            return Ok(false);
        }
        *remaining -= 1;
        Ok(true)
}

pub async fn list_ssh_keys(client: &MockMaasClient) -> Result<Vec<SshKey>, MaasError> {
        client.check_read("list_ssh_keys")?;
        Ok(client.ssh_keys.lock().unwrap().clone())
}

pub async fn create_ssh_key(client: &MockMaasClient, spec: &SshKeySpec) -> Result<SshKey, MaasError> {
        client.record("create_ssh_key", &spec.key)?;

        let mut keys = client.ssh_keys.lock().unwrap();
        if keys.iter().any(|k| k.key == spec.key) {
            return Err(MaasError::InvalidRequest("This key has already been added for this user.".to_string()));
        }
        let key = SshKey {
            id: client.next_id(),
            key: spec.key.clone(),
            keysource: None,
        };
        keys.push(key.clone());
        Ok(key)
}

pub async fn import_ssh_keys(client: &MockMaasClient, keysource: &str) -> Result<Vec<SshKey>, MaasError> {
        client.record("import_ssh_keys", keysource)?;

        let mut keys = client.ssh_keys.lock().unwrap();
        if let Some(existing) = keys.iter().find(|k| k.keysource.as_deref() == Some(keysource)) {
            return Ok(vec![existing.clone()]);
        }
        let key = SshKey {
            id: client.next_id(),
            key: format!("ssh-ed25519 AAAAC3Nza{} {}", keys.len(), keysource),
            keysource: Some(keysource.to_string()),
        };
        keys.push(key.clone());
        Ok(vec![key])
}

pub async fn list_ip_ranges(client: &MockMaasClient) -> Result<Vec<IpRange>, MaasError> {
        client.check_read("list_ip_ranges")?;
        Ok(client.ip_ranges.lock().unwrap().clone())
}

pub async fn create_ip_range(client: &MockMaasClient, spec: &IpRangeSpec) -> Result<IpRange, MaasError> {
        client.record("create_ip_range", &format!("{}-{}", spec.start_ip, spec.end_ip))?;

        let range = IpRange {
            id: client.next_id(),
            range_type: spec.range_type,
            start_ip: spec.start_ip.clone(),
            end_ip: spec.end_ip.clone(),
            comment: spec.comment.clone().unwrap_or_default(),
        };
        client.ip_ranges.lock().unwrap().push(range.clone());
        Ok(range)
}

pub async fn list_rack_controllers(client: &MockMaasClient) -> Result<Vec<RackController>, MaasError> {
        client.check_read("list_rack_controllers")?;
        Ok(client.rack_controllers.lock().unwrap().clone())
}

pub async fn list_subnets(client: &MockMaasClient) -> Result<Vec<Subnet>, MaasError> {
        client.check_read("list_subnets")?;
        Ok(client.subnets.lock().unwrap().clone())
}

pub async fn enable_dhcp(client: &MockMaasClient, vlan: &Vlan, primary_rack: &str) -> Result<Vlan, MaasError> {
        client.record("enable_dhcp", &format!("{}/{}", vlan.fabric_id, vlan.vid))?;

        let mut subnets = client.subnets.lock().unwrap();
        let mut updated = None;
        for subnet in subnets.iter_mut().filter(|s| s.vlan.id == vlan.id) {
            subnet.vlan.dhcp_on = true;
            subnet.vlan.primary_rack = Some(primary_rack.to_string());
            updated = Some(subnet.vlan.clone());
        }
        updated.ok_or_else(|| MaasError::NotFound(format!("VLAN {} not found", vlan.id)))
}

pub async fn set_config(client: &MockMaasClient, name: &str, value: &str) -> Result<(), MaasError> {
        client.record("set_config", name)?;
        client.config.lock().unwrap().insert(name.to_string(), value.to_string());
        Ok(())
}
