/**
 * ACTION PLANNER - Traduction des écarts en intentions de remédiation
 *
 * RÔLE :
 * Transforme la sortie du réconciliateur en intentions idempotentes
 * (statut d'un hôte Zabbix, appartenance au groupe `vcenter_hosts`).
 *
 * FONCTIONNEMENT :
 * - Fonctions pures : l'état courant Zabbix est lu AVANT par l'exécuteur
 * - Une intention n'est émise que si l'état courant diffère de la cible
 * - Hôte absent de Zabbix : ignoré avec avertissement, jamais une erreur
 */

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::error::{InvalidRecord, RecordIssue};
use crate::filter::FilterEngine;
use crate::models::{MismatchRecord, RawMismatchRecord, VCenterHost, ZabbixStatus};
use crate::normalize::normalize;
use crate::ports::{HostMembership, HostState, TargetGroup};

/// Planned mutation of Zabbix state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    SetStatus {
        host: String,
        host_id: String,
        target_status: ZabbixStatus,
    },
    AddToGroup {
        host: String,
        host_id: String,
        group_name: String,
        group_id: String,
        /// Full group list after the update (current groups + target)
        groups: Vec<String>,
    },
}

impl Intent {
    pub fn host(&self) -> &str {
        match self {
            Intent::SetStatus { host, .. } | Intent::AddToGroup { host, .. } => host,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyMember,
    AlreadyInStatus { status: ZabbixStatus },
    UnrecognizedStatus { status: String },
    NotFoundInTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub host: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl Skipped {
    /// Per-record anomaly behind this skip, if it is one
    pub fn issue(&self) -> Option<RecordIssue> {
        match &self.reason {
            SkipReason::UnrecognizedStatus { status } => Some(RecordIssue::UnrecognizedStatus {
                host: self.host.clone(),
                status: status.clone(),
            }),
            SkipReason::NotFoundInTarget => Some(RecordIssue::NotFoundInTarget {
                host: self.host.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub intents: Vec<Intent>,
    pub skipped: Vec<Skipped>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn issues(&self) -> Vec<RecordIssue> {
        self.skipped.iter().filter_map(Skipped::issue).collect()
    }

    fn skip(&mut self, host: &str, reason: SkipReason) {
        self.skipped.push(Skipped {
            host: host.to_string(),
            reason,
        });
    }
}

/// Identities eligible for the group: powered-on, not excluded, first-seen order
pub fn group_candidates(vms: &[VCenterHost], filter: &FilterEngine) -> Vec<String> {
    let mut seen = HashSet::new();
    vms.iter()
        .filter(|vm| filter.exclusion_for_presence(vm).is_none())
        .map(|vm| normalize(&vm.name))
        .filter(|identity| seen.insert(identity.clone()))
        .collect()
}

pub fn plan_group_memberships(
    candidates: &[String],
    memberships: &HashMap<String, HostMembership>,
    group: &TargetGroup,
) -> Plan {
    let mut plan = Plan::default();

    for host in candidates {
        let Some(membership) = memberships.get(host) else {
            warn!("Host '{}' not found in Zabbix, skipping", host);
            plan.skip(host, SkipReason::NotFoundInTarget);
            continue;
        };

        if membership.group_ids.iter().any(|id| id == &group.id) {
            info!("Host '{}' already in group '{}', skipping", host, group.name);
            plan.skip(host, SkipReason::AlreadyMember);
            continue;
        }

        let mut groups: Vec<String> = Vec::with_capacity(membership.group_ids.len() + 1);
        for id in membership.group_ids.iter().chain(std::iter::once(&group.id)) {
            if !groups.contains(id) {
                groups.push(id.clone());
            }
        }

        plan.intents.push(Intent::AddToGroup {
            host: host.clone(),
            host_id: membership.host_id.clone(),
            group_name: group.name.clone(),
            group_id: group.id.clone(),
            groups,
        });
    }

    plan
}

/// Status-file entries: malformed ones are warned about and returned apart
pub fn validate_status_records(raw: &[RawMismatchRecord]) -> (Vec<MismatchRecord>, Vec<InvalidRecord>) {
    let mut records = Vec::with_capacity(raw.len());
    let mut invalid = Vec::new();
    for entry in raw {
        match entry.validate() {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping status record: {}", e);
                invalid.push(e);
            }
        }
    }
    (records, invalid)
}

/// Hosts whose current Zabbix state must be read before planning status corrections
pub fn status_targets(records: &[MismatchRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| r.vmware_status.target_zabbix_status().is_some())
        .map(|r| r.host.clone())
        .filter(|host| seen.insert(host.clone()))
        .collect()
}

pub fn plan_status_corrections(records: &[MismatchRecord], states: &HashMap<String, HostState>) -> Plan {
    let mut plan = Plan::default();
    let mut planned = HashSet::new();

    for record in records {
        let Some(target) = record.vmware_status.target_zabbix_status() else {
            warn!("Unrecognized VMware status '{}' for host '{}'", record.vmware_status, record.host);
            plan.skip(
                &record.host,
                SkipReason::UnrecognizedStatus {
                    status: record.vmware_status.to_string(),
                },
            );
            continue;
        };

        if !planned.insert(record.host.clone()) {
            continue;
        }

        let Some(state) = states.get(&record.host) else {
            warn!("Host '{}' not found in Zabbix, skipping", record.host);
            plan.skip(&record.host, SkipReason::NotFoundInTarget);
            continue;
        };

        if state.status == target {
            info!("Host '{}' already {}, skipping", record.host, target);
            plan.skip(&record.host, SkipReason::AlreadyInStatus { status: target });
            continue;
        }

        plan.intents.push(Intent::SetStatus {
            host: record.host.clone(),
            host_id: state.host_id.clone(),
            target_status: target,
        });
    }

    plan
}
