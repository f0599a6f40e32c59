/**
 * ZABBIX INDEX - Index des hôtes Zabbix construit une fois par exécution
 *
 * RÔLE :
 * Arena des hôtes Zabbix + deux tables de correspondance (nom → slot, IP → slot)
 * pour des recherches O(1) pendant la réconciliation.
 *
 * FONCTIONNEMENT :
 * - Construit depuis le snapshot complet, en lecture seule ensuite
 * - Clé dupliquée : le premier hôte gagne, le doublon est journalisé
 * - Hôte sans IP : indexé par nom uniquement
 */

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::InvalidRecord;
use crate::models::{RawZabbixRecord, ZabbixHost};

#[derive(Debug, Clone, Default)]
pub struct ZabbixIndex {
    hosts: Vec<ZabbixHost>,
    by_name: HashMap<String, usize>,
    by_ip: HashMap<String, usize>,
}

impl ZabbixIndex {
    pub fn build(hosts: Vec<ZabbixHost>) -> Self {
        let mut index = Self {
            hosts: Vec::with_capacity(hosts.len()),
            by_name: HashMap::with_capacity(hosts.len()),
            by_ip: HashMap::new(),
        };

        for host in hosts {
            if index.by_name.contains_key(&host.name) {
                warn!("Duplicate Zabbix host name '{}', keeping first entry", host.name);
                continue;
            }
            let slot = index.hosts.len();
            index.by_name.insert(host.name.clone(), slot);
            for ip in host.ips() {
                if let Some(&owner) = index.by_ip.get(ip) {
                    debug!("IP {} of '{}' already owned by '{}'", ip, host.name, index.hosts[owner].name);
                    continue;
                }
                index.by_ip.insert(ip.to_string(), slot);
            }
            index.hosts.push(host);
        }

        debug!("Zabbix index built: {} hosts, {} IPs", index.by_name.len(), index.by_ip.len());
        index
    }

    /// Validates raw snapshot records, indexing the valid ones
    pub fn from_raw(records: &[RawZabbixRecord]) -> (Self, Vec<InvalidRecord>) {
        let mut valid = Vec::with_capacity(records.len());
        let mut invalid = Vec::new();
        for record in records {
            match record.validate() {
                Ok(host) => valid.push(host),
                Err(e) => {
                    warn!("Skipping Zabbix record: {}", e);
                    invalid.push(e);
                }
            }
        }
        (Self::build(valid), invalid)
    }

    pub fn by_name(&self, name: &str) -> Option<&ZabbixHost> {
        self.by_name.get(name).map(|&slot| &self.hosts[slot])
    }

    pub fn by_ip(&self, ip: &str) -> Option<&ZabbixHost> {
        self.by_ip.get(ip.trim()).map(|&slot| &self.hosts[slot])
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn contains_ip(&self, ip: &str) -> bool {
        self.by_ip.contains_key(ip.trim())
    }

    pub fn hosts(&self) -> &[ZabbixHost] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
