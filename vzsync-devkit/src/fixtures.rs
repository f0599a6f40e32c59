/*!
Builders d'inventaires de test

Construit un export VCenter et un parc Zabbix cohérents, sous forme
d'enregistrements bruts, de JSON (format des snapshots) ou de stubs prêts à
l'emploi.
*/

use serde_json::Value;
use vzsync_core::{RawVmRecord, RawZabbixRecord};

use crate::mock_inventory::{MockVCenter, MockZabbix};

#[derive(Debug, Clone)]
struct HostFixture {
    record: RawZabbixRecord,
    group_ids: Vec<String>,
}

/// Helper pour créer des inventaires au format des snapshots
#[derive(Debug, Clone, Default)]
pub struct InventoryBuilder {
    vms: Vec<RawVmRecord>,
    hosts: Vec<HostFixture>,
}

impl InventoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// VM brute, champs optionnels compris
    pub fn vm(mut self, name: Option<&str>, status: Option<&str>, ip: Option<&str>) -> Self {
        self.vms.push(RawVmRecord {
            host: name.map(str::to_string),
            status: status.map(str::to_string),
            ip: ip.map(str::to_string),
        });
        self
    }

    pub fn vm_on(self, name: &str, ip: Option<&str>) -> Self {
        self.vm(Some(name), Some("poweredOn"), ip)
    }

    pub fn vm_off(self, name: &str, ip: Option<&str>) -> Self {
        self.vm(Some(name), Some("poweredOff"), ip)
    }

    /// Hôte Zabbix brut (statut `enabled`, `disabled` ou valeur arbitraire)
    pub fn zabbix(mut self, name: &str, status: &str, ip: Option<&str>, group_ids: &[&str]) -> Self {
        self.hosts.push(HostFixture {
            record: RawZabbixRecord {
                host: Some(name.to_string()),
                status: Some(status.to_string()),
                ip: ip.map(str::to_string),
                interfaces: ip.iter().map(|s| s.to_string()).collect(),
            },
            group_ids: group_ids.iter().map(|g| g.to_string()).collect(),
        });
        self
    }

    pub fn zabbix_enabled(self, name: &str, ip: Option<&str>) -> Self {
        self.zabbix(name, "enabled", ip, &[])
    }

    pub fn zabbix_disabled(self, name: &str, ip: Option<&str>) -> Self {
        self.zabbix(name, "disabled", ip, &[])
    }

    pub fn vcenter_records(&self) -> Vec<RawVmRecord> {
        self.vms.clone()
    }

    pub fn zabbix_records(&self) -> Vec<RawZabbixRecord> {
        self.hosts.iter().map(|h| h.record.clone()).collect()
    }

    /// Export VCenter tel qu'écrit dans `vcenter_vms.json`
    pub fn vcenter_json(&self) -> Value {
        serde_json::to_value(&self.vms).unwrap_or(Value::Null)
    }

    pub fn zabbix_json(&self) -> Value {
        serde_json::to_value(self.zabbix_records()).unwrap_or(Value::Null)
    }

    pub fn mock_vcenter(&self) -> MockVCenter {
        MockVCenter::new(self.vcenter_records())
    }

    /// Stub Zabbix peuplé, avec le groupe cible déjà créé
    pub fn mock_zabbix(&self, group_name: &str, group_id: &str) -> MockZabbix {
        let zabbix = MockZabbix::new().with_group(group_name, group_id);
        for fixture in &self.hosts {
            let groups: Vec<&str> = fixture.group_ids.iter().map(String::as_str).collect();
            zabbix.add_host(
                fixture.record.host.as_deref().unwrap_or_default(),
                fixture.record.status.as_deref().unwrap_or_default(),
                fixture.record.ip.as_deref(),
                &groups,
            );
        }
        zabbix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_json_matches_snapshot_format() {
        let builder = InventoryBuilder::new()
            .vm_on("VW-SWX002-a.miller", Some("10.0.0.5"))
            .vm(Some("broken"), None, None)
            .zabbix_enabled("APP01", Some("10.0.0.7"));

        let vms = builder.vcenter_json();
        assert_eq!(vms[0]["host"], "VW-SWX002-a.miller");
        assert_eq!(vms[0]["status"], "poweredOn");
        assert!(vms[1].get("status").is_none());
        assert!(vms[1]["ip"].is_null());

        let hosts = builder.zabbix_json();
        assert_eq!(hosts[0]["interfaces"][0], "10.0.0.7");
    }

    #[test]
    fn test_mock_zabbix_is_seeded() {
        let zabbix = InventoryBuilder::new()
            .zabbix("WEB01", "enabled", None, &["7"])
            .mock_zabbix("vcenter_hosts", "42");
        let host = zabbix.host("WEB01").unwrap();
        assert_eq!(host.host_id, "10001");
        assert_eq!(host.group_ids, vec!["7"]);
    }
}
