/*!
Stubs VCenter et Zabbix pour tests sans serveur

Implémentent les ports de `vzsync-core`. Le stub Zabbix enregistre tous les
appels et applique les mutations à son état, de sorte qu'un second run voit
le résultat du premier.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use vzsync_core::ports::{HostMembership, HostState, VCenterSource, ZabbixMutator, ZabbixSource};
use vzsync_core::{RawVmRecord, RawZabbixRecord, SyncError, SyncResult, ZabbixStatus};

/// Appel reçu par le stub Zabbix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    FetchHosts,
    GroupLookup { name: String },
    MembershipLookup { host: String },
    StateLookup { host: String },
    UpdateGroups { host_id: String, group_ids: Vec<String> },
    SetStatus { host_id: String, status: ZabbixStatus },
}

impl MockCall {
    pub fn is_write(&self) -> bool {
        matches!(self, MockCall::UpdateGroups { .. } | MockCall::SetStatus { .. })
    }
}

/// Hôte Zabbix simulé
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHost {
    pub host_id: String,
    pub name: String,
    /// Statut brut, pour pouvoir simuler des valeurs inconnues
    pub status: String,
    pub ip: Option<String>,
    pub group_ids: Vec<String>,
}

impl MockHost {
    fn record(&self) -> RawZabbixRecord {
        RawZabbixRecord {
            host: Some(self.name.clone()),
            status: Some(self.status.clone()),
            ip: self.ip.clone(),
            interfaces: self.ip.iter().cloned().collect(),
        }
    }
}

#[derive(Default)]
struct ZabbixState {
    hosts: Vec<MockHost>,
    groups: HashMap<String, String>,
    calls: Vec<MockCall>,
    failing_hosts: HashSet<String>,
    fail_fetch: bool,
    fail_reads: bool,
    fail_state_reads: bool,
}

/// Mock Zabbix qui simule le client JSON-RPC
#[derive(Clone, Default)]
pub struct MockZabbix {
    state: Arc<Mutex<ZabbixState>>,
}

impl MockZabbix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Déclare un groupe d'hôtes existant
    pub fn with_group(self, name: &str, group_id: &str) -> Self {
        self.state.lock().groups.insert(name.to_string(), group_id.to_string());
        self
    }

    /// Ajoute un hôte; l'id est attribué séquentiellement (10001, 10002, ...)
    pub fn add_host(&self, name: &str, status: &str, ip: Option<&str>, group_ids: &[&str]) -> String {
        let mut state = self.state.lock();
        let host_id = (10001 + state.hosts.len()).to_string();
        state.hosts.push(MockHost {
            host_id: host_id.clone(),
            name: name.to_string(),
            status: status.to_string(),
            ip: ip.map(str::to_string),
            group_ids: group_ids.iter().map(|g| g.to_string()).collect(),
        });
        host_id
    }

    /// Les écritures sur cet hôte échoueront
    pub fn fail_writes_for(&self, host_name: &str) {
        self.state.lock().failing_hosts.insert(host_name.to_string());
    }

    /// `fetch_hosts` échouera
    pub fn fail_fetch(&self) {
        self.state.lock().fail_fetch = true;
    }

    /// Les lectures avant écriture (membership / state) échoueront
    pub fn fail_reads(&self) {
        self.state.lock().fail_reads = true;
    }

    /// Seule la lecture du statut (`host_state`) échouera
    pub fn fail_state_reads(&self) {
        self.state.lock().fail_state_reads = true;
    }

    /// Récupère tous les appels reçus (pour assertions de tests)
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Seulement les mutations
    pub fn get_writes(&self) -> Vec<MockCall> {
        self.state.lock().calls.iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn host(&self, name: &str) -> Option<MockHost> {
        self.state.lock().hosts.iter().find(|h| h.name == name).cloned()
    }

    /// Reset des appels enregistrés (l'état des hôtes est conservé)
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: MockCall) {
        log::debug!("[MOCK] Zabbix call: {:?}", call);
        self.state.lock().calls.push(call);
    }

    fn check_reads(&self, method: &str) -> SyncResult<()> {
        if self.state.lock().fail_reads {
            return Err(SyncError::api("Zabbix", method, "simulated read failure"));
        }
        Ok(())
    }

    fn mutate<F>(&self, host_id: &str, method: &str, apply: F) -> SyncResult<()>
    where
        F: FnOnce(&mut MockHost),
    {
        let mut state = self.state.lock();
        let failing = state.failing_hosts.clone();
        let host = state
            .hosts
            .iter_mut()
            .find(|h| h.host_id == host_id)
            .ok_or_else(|| SyncError::api("Zabbix", method, format!("no host with id {host_id}")))?;
        if failing.contains(&host.name) {
            return Err(SyncError::api("Zabbix", method, format!("simulated failure for {}", host.name)));
        }
        apply(host);
        Ok(())
    }
}

#[async_trait]
impl ZabbixSource for MockZabbix {
    async fn fetch_hosts(&self) -> SyncResult<Vec<RawZabbixRecord>> {
        self.record(MockCall::FetchHosts);
        let state = self.state.lock();
        if state.fail_fetch {
            return Err(SyncError::fetch("Zabbix", "simulated outage"));
        }
        Ok(state.hosts.iter().map(MockHost::record).collect())
    }
}

#[async_trait]
impl ZabbixMutator for MockZabbix {
    async fn group_id(&self, group_name: &str) -> SyncResult<Option<String>> {
        self.record(MockCall::GroupLookup {
            name: group_name.to_string(),
        });
        self.check_reads("hostgroup.get")?;
        Ok(self.state.lock().groups.get(group_name).cloned())
    }

    async fn host_membership(&self, host: &str) -> SyncResult<Option<HostMembership>> {
        self.record(MockCall::MembershipLookup { host: host.to_string() });
        self.check_reads("host.get")?;
        Ok(self.host(host).map(|h| HostMembership {
            host_id: h.host_id,
            group_ids: h.group_ids,
        }))
    }

    async fn host_state(&self, host: &str) -> SyncResult<Option<HostState>> {
        self.record(MockCall::StateLookup { host: host.to_string() });
        self.check_reads("host.get")?;
        if self.state.lock().fail_state_reads {
            return Err(SyncError::api("Zabbix", "host.get", "simulated status read failure"));
        }
        let Some(found) = self.host(host) else {
            return Ok(None);
        };
        let status = ZabbixStatus::parse(&found.status)
            .ok_or_else(|| SyncError::api("Zabbix", "host.get", format!("unexpected status '{}'", found.status)))?;
        Ok(Some(HostState {
            host_id: found.host_id,
            status,
        }))
    }

    async fn update_host_groups(&self, host_id: &str, group_ids: &[String]) -> SyncResult<()> {
        self.record(MockCall::UpdateGroups {
            host_id: host_id.to_string(),
            group_ids: group_ids.to_vec(),
        });
        self.mutate(host_id, "host.update", |host| host.group_ids = group_ids.to_vec())
    }

    async fn set_host_status(&self, host_id: &str, status: ZabbixStatus) -> SyncResult<()> {
        self.record(MockCall::SetStatus {
            host_id: host_id.to_string(),
            status,
        });
        self.mutate(host_id, "host.update", |host| host.status = status.as_str().to_string())
    }
}

/// Mock VCenter: renvoie un export figé
#[derive(Clone, Default)]
pub struct MockVCenter {
    vms: Arc<Mutex<Vec<RawVmRecord>>>,
    fail: Arc<Mutex<bool>>,
    fetches: Arc<Mutex<usize>>,
}

impl MockVCenter {
    pub fn new(vms: Vec<RawVmRecord>) -> Self {
        Self {
            vms: Arc::new(Mutex::new(vms)),
            ..Self::default()
        }
    }

    pub fn fail_fetch(&self) {
        *self.fail.lock() = true;
    }

    pub fn set_vms(&self, vms: Vec<RawVmRecord>) {
        *self.vms.lock() = vms;
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }
}

#[async_trait]
impl VCenterSource for MockVCenter {
    async fn fetch_vms(&self) -> SyncResult<Vec<RawVmRecord>> {
        *self.fetches.lock() += 1;
        if *self.fail.lock() {
            return Err(SyncError::fetch("VCenter", "simulated outage"));
        }
        Ok(self.vms.lock().clone())
    }
}
