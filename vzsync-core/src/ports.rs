//! Collaborator ports: the vendor-facing side of a run
//!
//! The core never talks to VCenter or Zabbix directly. The agent binary plugs
//! HTTP clients into these traits; the devkit plugs in-memory stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::models::{RawVmRecord, RawZabbixRecord, ZabbixStatus};

/// Source of the VCenter VM inventory
#[async_trait]
pub trait VCenterSource: Send + Sync {
    async fn fetch_vms(&self) -> SyncResult<Vec<RawVmRecord>>;
}

/// Source of the Zabbix host inventory
#[async_trait]
pub trait ZabbixSource: Send + Sync {
    async fn fetch_hosts(&self) -> SyncResult<Vec<RawZabbixRecord>>;
}

/// Current group membership of one Zabbix host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMembership {
    pub host_id: String,
    pub group_ids: Vec<String>,
}

/// Current monitoring status of one Zabbix host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    pub host_id: String,
    pub status: ZabbixStatus,
}

/// Host group every VCenter VM should belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub name: String,
    pub id: String,
}

/// Read-before-write access to Zabbix host state plus the two mutations
#[async_trait]
pub trait ZabbixMutator: Send + Sync {
    /// Group id by name, `None` when the group does not exist
    async fn group_id(&self, group_name: &str) -> SyncResult<Option<String>>;

    /// `None` when no host carries this technical name
    async fn host_membership(&self, host: &str) -> SyncResult<Option<HostMembership>>;

    async fn host_state(&self, host: &str) -> SyncResult<Option<HostState>>;

    /// Replaces the host's group list with `group_ids`
    async fn update_host_groups(&self, host_id: &str, group_ids: &[String]) -> SyncResult<()>;

    async fn set_host_status(&self, host_id: &str, status: ZabbixStatus) -> SyncResult<()>;
}
