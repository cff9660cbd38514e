//! Machine operations for MockMaasClient

use super::MockMaasClient;
use crate::error::MaasError;
use crate::models::*;

pub async fn list_machines(client: &MockMaasClient) -> Result<Vec<Machine>, MaasError> {
        client.check_read("list_machines")?;
        Ok(client.machines.lock().unwrap().values().cloned().collect())
}

pub async fn create_machine(client: &MockMaasClient, spec: &MachineSpec) -> Result<Machine, MaasError> {
        client.record("create_machine", &spec.hostname)?;

        let mut machines = client.machines.lock().unwrap();
        if machines.values().any(|m| m.hostname == spec.hostname) {
            return Err(MaasError::InvalidRequest(format!(
                "hostname {} is already in use",
                spec.hostname
            )));
        }

        let id = client.next_id();
        let system_id = format!("sys{:04}", id);
        let machine = Machine {
            system_id: system_id.clone(),
            hostname: spec.hostname.clone(),
            architecture: spec.architecture.clone(),
            power_type: spec.power_type.clone(),
            status_name: "New".to_string(),
            zone: Some(ZoneRef {
                id: 0,
                name: "default".to_string(),
                description: String::new(),
            }),
            tag_names: Default::default(),
            interface_set: spec
                .mac_addresses
                .iter()
                .enumerate()
                .map(|(i, mac)| InterfaceRef {
                    id: id * 100 + i as u64,
                    name: format!("eth{}", i),
                    mac_address: Some(mac.clone()),
                })
                .collect(),
            resource_uri: format!("/MAAS/api/2.0/machines/{}/", system_id),
        };

        machines.insert(system_id.clone(), machine.clone());
        client
            .power
            .lock()
            .unwrap()
            .insert(system_id, (spec.power_type.clone(), spec.power_parameters.clone()));
        Ok(machine)
}

pub async fn set_power(client: &MockMaasClient, system_id: &str, power_type: &str, params: &PowerParameters) -> Result<(), MaasError> {
        client.record("set_power", system_id)?;

        let mut machines = client.machines.lock().unwrap();
        let machine = machines
            .get_mut(system_id)
            .ok_or_else(|| MaasError::NotFound(format!("Machine {} not found", system_id)))?;
        machine.power_type = power_type.to_string();
        client
            .power
            .lock()
            .unwrap()
            .insert(system_id.to_string(), (power_type.to_string(), params.clone()));
        Ok(())
}

pub async fn add_tag(client: &MockMaasClient, tag: &str, system_id: &str) -> Result<(), MaasError> {
        client.record("add_tag", system_id)?;

        if !client.tags.lock().unwrap().contains_key(tag) {
            return Err(MaasError::NotFound(format!("Tag {} not found", tag)));
        }
        let mut machines = client.machines.lock().unwrap();
        let machine = machines
            .get_mut(system_id)
            .ok_or_else(|| MaasError::NotFound(format!("Machine {} not found", system_id)))?;
        // Re-adding an existing tag is a no-op, as in MAAS
        machine.tag_names.insert(tag.to_string());
        Ok(())
}

pub async fn save_machine(client: &MockMaasClient, machine: &Machine) -> Result<Machine, MaasError> {
        client.record("save_machine", &machine.system_id)?;

        let zone_name = machine.zone_name().ok_or_else(|| {
            MaasError::InvalidRequest(format!("machine {} has no zone to save", machine.hostname))
        })?;
        let zone = client
            .zones
            .lock()
            .unwrap()
            .get(zone_name)
            .cloned()
            .ok_or_else(|| MaasError::InvalidRequest(format!("zone {} does not exist", zone_name)))?;

        let mut machines = client.machines.lock().unwrap();
        let stored = machines
            .get_mut(&machine.system_id)
            .ok_or_else(|| MaasError::NotFound(format!("Machine {} not found", machine.system_id)))?;
        stored.zone = Some(zone.to_ref());
        Ok(stored.clone())
}
