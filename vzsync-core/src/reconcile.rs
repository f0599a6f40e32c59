//! Reconciliation passes over one VCenter snapshot and one Zabbix index
//!
//! Three independent passes, each applying the filter engine first:
//! - missing hosts: powered-on VMs unknown to Zabbix by name and by IP
//! - status mismatches: `(poweredOff, enabled)` and `(poweredOn, disabled)`
//! - powered-off-but-enabled: the `(poweredOff, enabled)` half, which drives remediation
//!
//! `classify` assigns each record exactly one [`ReconciliationOutcome`],
//! consistent with the three passes.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::InvalidRecord;
use crate::filter::{ExclusionReason, FilterEngine};
use crate::index::ZabbixIndex;
use crate::models::{
    MismatchRecord, MissingHost, PowerState, RawVmRecord, VCenterHost, ZabbixStatus, IP_PLACEHOLDER,
};
use crate::normalize::normalize;
use crate::summary::RunSummary;

/// Validated VCenter snapshot
#[derive(Debug, Clone, Default)]
pub struct VCenterInventory {
    pub vms: Vec<VCenterHost>,
    pub invalid: Vec<(RawVmRecord, InvalidRecord)>,
}

impl VCenterInventory {
    pub fn from_raw(records: &[RawVmRecord]) -> Self {
        let mut inventory = Self::default();
        for record in records {
            match record.validate() {
                Ok(vm) => inventory.vms.push(vm),
                Err(e) => {
                    warn!("Skipping VCenter record: {}", e);
                    inventory.invalid.push((record.clone(), e));
                }
            }
        }
        inventory
    }

    pub fn from_hosts(vms: Vec<VCenterHost>) -> Self {
        Self {
            vms,
            invalid: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Name,
    Ip,
}

/// Classification of one VCenter record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// Powered on, unknown to Zabbix by name and by IP
    Missing { vm: VCenterHost, identity: String },
    /// Powered on in VCenter, disabled in Zabbix (reported, not remediated)
    StatusMismatch {
        vm: VCenterHost,
        identity: String,
        zabbix_status: ZabbixStatus,
    },
    /// Powered off in VCenter, still enabled in Zabbix
    PoweredOffButEnabled {
        vm: VCenterHost,
        identity: String,
        zabbix_status: ZabbixStatus,
    },
    Matched {
        vm: VCenterHost,
        identity: String,
        matched_by: MatchKind,
        zabbix_status: ZabbixStatus,
    },
    Excluded {
        vm: VCenterHost,
        identity: String,
        #[serde(flatten)]
        reason: ExclusionReason,
    },
    InvalidRecord { record: RawVmRecord, error: String },
}

impl ReconciliationOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            ReconciliationOutcome::Missing { .. } => "missing",
            ReconciliationOutcome::StatusMismatch { .. } => "status_mismatch",
            ReconciliationOutcome::PoweredOffButEnabled { .. } => "powered_off_but_enabled",
            ReconciliationOutcome::Matched { .. } => "matched",
            ReconciliationOutcome::Excluded { .. } => "excluded",
            ReconciliationOutcome::InvalidRecord { .. } => "invalid_record",
        }
    }

    pub fn identity(&self) -> Option<&str> {
        match self {
            ReconciliationOutcome::Missing { identity, .. }
            | ReconciliationOutcome::StatusMismatch { identity, .. }
            | ReconciliationOutcome::PoweredOffButEnabled { identity, .. }
            | ReconciliationOutcome::Matched { identity, .. }
            | ReconciliationOutcome::Excluded { identity, .. } => Some(identity),
            ReconciliationOutcome::InvalidRecord { .. } => None,
        }
    }
}

/// Every artifact of one reconciliation, computed from the same snapshot
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    pub missing: Vec<MissingHost>,
    pub mismatches: Vec<MismatchRecord>,
    pub powered_off_enabled: Vec<MismatchRecord>,
    pub outcomes: Vec<ReconciliationOutcome>,
    pub summary: RunSummary,
}

pub struct Reconciler<'a> {
    index: &'a ZabbixIndex,
    filter: &'a FilterEngine,
}

impl<'a> Reconciler<'a> {
    pub fn new(index: &'a ZabbixIndex, filter: &'a FilterEngine) -> Self {
        Self { index, filter }
    }

    /// Pass 1: powered-on VMs known to Zabbix neither by identity nor by IP
    pub fn missing_hosts(&self, vms: &[VCenterHost]) -> Vec<MissingHost> {
        vms.iter()
            .filter(|vm| self.filter.exclusion_for_presence(vm).is_none())
            .filter(|vm| self.lookup_presence(vm, &normalize(&vm.name)).is_none())
            .map(|vm| MissingHost {
                host: vm.name.clone(),
                ip: vm.ip.clone(),
            })
            .collect()
    }

    /// Pass 2: power state and Zabbix status disagree, in either direction
    pub fn status_mismatches(&self, vms: &[VCenterHost]) -> Vec<MismatchRecord> {
        self.mismatches_where(vms, |power, status| {
            matches!(
                (power, status),
                (PowerState::PoweredOff, ZabbixStatus::Enabled) | (PowerState::PoweredOn, ZabbixStatus::Disabled)
            )
        })
    }

    /// Pass 3: powered off in VCenter but still monitored
    pub fn powered_off_but_enabled(&self, vms: &[VCenterHost]) -> Vec<MismatchRecord> {
        self.mismatches_where(vms, |power, status| {
            matches!((power, status), (PowerState::PoweredOff, ZabbixStatus::Enabled))
        })
    }

    fn mismatches_where<F>(&self, vms: &[VCenterHost], predicate: F) -> Vec<MismatchRecord>
    where
        F: Fn(&PowerState, ZabbixStatus) -> bool,
    {
        let mut out = Vec::new();
        for vm in vms {
            if self.filter.exclusion_for_status(vm).is_some() {
                continue;
            }
            let identity = normalize(&vm.name);
            let Some(zabbix) = self.index.by_name(&identity) else {
                continue;
            };
            if predicate(&vm.power_state, zabbix.status) {
                out.push(MismatchRecord {
                    host: identity,
                    ip: vm.ip.clone().unwrap_or_else(|| IP_PLACEHOLDER.to_string()),
                    vmware_status: vm.power_state.clone(),
                    zabbix_status: zabbix.status,
                });
            }
        }
        out
    }

    /// Name first, IP only when the name lookup fails
    fn lookup_presence(&self, vm: &VCenterHost, identity: &str) -> Option<(MatchKind, ZabbixStatus)> {
        if let Some(host) = self.index.by_name(identity) {
            return Some((MatchKind::Name, host.status));
        }
        let ip = vm.ip.as_deref()?;
        self.index.by_ip(ip).map(|host| (MatchKind::Ip, host.status))
    }

    pub fn classify(&self, vm: &VCenterHost) -> ReconciliationOutcome {
        let identity = normalize(&vm.name);

        if let Some(reason) = self.filter.exclusion_for_status(vm) {
            return ReconciliationOutcome::Excluded {
                vm: vm.clone(),
                identity,
                reason,
            };
        }
        if let PowerState::Unrecognized(status) = &vm.power_state {
            return ReconciliationOutcome::Excluded {
                vm: vm.clone(),
                identity,
                reason: ExclusionReason::UnrecognizedPowerState { status: status.clone() },
            };
        }

        if let Some(zabbix) = self.index.by_name(&identity) {
            let zabbix_status = zabbix.status;
            return match (&vm.power_state, zabbix_status) {
                (PowerState::PoweredOff, ZabbixStatus::Enabled) => ReconciliationOutcome::PoweredOffButEnabled {
                    vm: vm.clone(),
                    identity,
                    zabbix_status,
                },
                (PowerState::PoweredOn, ZabbixStatus::Disabled) => ReconciliationOutcome::StatusMismatch {
                    vm: vm.clone(),
                    identity,
                    zabbix_status,
                },
                _ => ReconciliationOutcome::Matched {
                    vm: vm.clone(),
                    identity,
                    matched_by: MatchKind::Name,
                    zabbix_status,
                },
            };
        }

        if let Some(reason) = self.filter.exclusion_for_presence(vm) {
            return ReconciliationOutcome::Excluded {
                vm: vm.clone(),
                identity,
                reason,
            };
        }

        match self.lookup_presence(vm, &identity) {
            Some((matched_by, zabbix_status)) => ReconciliationOutcome::Matched {
                vm: vm.clone(),
                identity,
                matched_by,
                zabbix_status,
            },
            None => ReconciliationOutcome::Missing { vm: vm.clone(), identity },
        }
    }

    pub fn classify_all(&self, inventory: &VCenterInventory) -> Vec<ReconciliationOutcome> {
        let mut outcomes: Vec<ReconciliationOutcome> = inventory.vms.iter().map(|vm| self.classify(vm)).collect();
        outcomes.extend(inventory.invalid.iter().map(|(record, error)| ReconciliationOutcome::InvalidRecord {
            record: record.clone(),
            error: error.to_string(),
        }));
        outcomes
    }

    /// Runs every pass against the same snapshot
    pub fn reconcile(&self, inventory: &VCenterInventory) -> ReconciliationReport {
        let missing = self.missing_hosts(&inventory.vms);
        let mismatches = self.status_mismatches(&inventory.vms);
        let powered_off_enabled = self.powered_off_but_enabled(&inventory.vms);
        let outcomes = self.classify_all(inventory);

        let mut summary = RunSummary::default();
        summary.record_outcomes(&outcomes);

        for outcome in &outcomes {
            if let ReconciliationOutcome::Excluded { vm, reason, .. } = outcome {
                debug!("Excluded '{}': {:?}", vm.name, reason);
            }
        }
        info!(
            "Reconciliation: {} VMs, {} missing, {} mismatches ({} powered off but enabled), {} invalid",
            outcomes.len(),
            missing.len(),
            mismatches.len(),
            powered_off_enabled.len(),
            inventory.invalid.len()
        );

        ReconciliationReport {
            missing,
            mismatches,
            powered_off_enabled,
            outcomes,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZabbixHost;

    fn vm(name: &str, state: PowerState, ip: Option<&str>) -> VCenterHost {
        VCenterHost::new(name, state, ip.map(String::from))
    }

    fn zbx(name: &str, status: ZabbixStatus, ip: Option<&str>) -> ZabbixHost {
        ZabbixHost::new(name, status, ip.map(String::from))
    }

    #[test]
    fn test_missing_host_reported_with_raw_name() {
        let index = ZabbixIndex::build(vec![zbx("OTHER", ZabbixStatus::Enabled, Some("10.0.0.9"))]);
        let filter = FilterEngine::default();
        let reconciler = Reconciler::new(&index, &filter);

        let vms = vec![vm("VW-SWX002-a.miller", PowerState::PoweredOn, Some("10.0.0.5"))];
        assert_eq!(
            reconciler.missing_hosts(&vms),
            vec![MissingHost {
                host: "VW-SWX002-a.miller".into(),
                ip: Some("10.0.0.5".into())
            }]
        );
    }

    #[test]
    fn test_name_or_ip_match_means_present() {
        let index = ZabbixIndex::build(vec![
            zbx("SWX002", ZabbixStatus::Enabled, None),
            zbx("renamed", ZabbixStatus::Enabled, Some("10.0.0.7")),
        ]);
        let filter = FilterEngine::default();
        let reconciler = Reconciler::new(&index, &filter);

        let vms = vec![
            vm("VW-SWX002-a.miller", PowerState::PoweredOn, Some("192.168.1.1")),
            vm("VW-NEW01-b", PowerState::PoweredOn, Some("10.0.0.7")),
            vm("VW-NEW02-b", PowerState::PoweredOn, Some("10.0.0.8")),
            vm("VW-NEW03-b", PowerState::PoweredOn, None),
        ];
        let missing: Vec<String> = reconciler.missing_hosts(&vms).into_iter().map(|m| m.host).collect();
        assert_eq!(missing, vec!["VW-NEW02-b".to_string(), "VW-NEW03-b".to_string()]);

        assert!(matches!(
            reconciler.classify(&vms[1]),
            ReconciliationOutcome::Matched { matched_by: MatchKind::Ip, .. }
        ));
    }

    #[test]
    fn test_powered_off_vm_never_missing() {
        let index = ZabbixIndex::default();
        let filter = FilterEngine::default();
        let reconciler = Reconciler::new(&index, &filter);
        let vms = vec![vm("VW-OFF01-x", PowerState::PoweredOff, Some("10.0.0.1"))];
        assert!(reconciler.missing_hosts(&vms).is_empty());
        assert!(matches!(
            reconciler.classify(&vms[0]),
            ReconciliationOutcome::Excluded { reason: ExclusionReason::PoweredOff, .. }
        ));
    }

    #[test]
    fn test_mismatch_passes() {
        let index = ZabbixIndex::build(vec![
            zbx("APP01", ZabbixStatus::Enabled, None),
            zbx("APP02", ZabbixStatus::Disabled, None),
            zbx("APP03", ZabbixStatus::Enabled, None),
        ]);
        let filter = FilterEngine::default();
        let reconciler = Reconciler::new(&index, &filter);
        let vms = vec![
            vm("VW-APP01-x", PowerState::PoweredOff, None),
            vm("VW-APP02-x", PowerState::PoweredOn, Some("10.1.1.2")),
            vm("VW-APP03-x", PowerState::PoweredOn, None),
            vm("VW-GHOST-x", PowerState::PoweredOff, None),
        ];

        let mismatches = reconciler.status_mismatches(&vms);
        assert_eq!(mismatches.len(), 2);
        assert!(mismatches.contains(&MismatchRecord {
            host: "APP01".into(),
            ip: IP_PLACEHOLDER.into(),
            vmware_status: PowerState::PoweredOff,
            zabbix_status: ZabbixStatus::Enabled,
        }));
        assert!(mismatches.contains(&MismatchRecord {
            host: "APP02".into(),
            ip: "10.1.1.2".into(),
            vmware_status: PowerState::PoweredOn,
            zabbix_status: ZabbixStatus::Disabled,
        }));

        let off_enabled = reconciler.powered_off_but_enabled(&vms);
        assert_eq!(off_enabled.len(), 1);
        assert_eq!(off_enabled[0].host, "APP01");
    }

    #[test]
    fn test_excluded_names_appear_in_no_pass() {
        let index = ZabbixIndex::build(vec![zbx("VW-WEB01_REP", ZabbixStatus::Enabled, None)]);
        let filter = FilterEngine::default();
        let reconciler = Reconciler::new(&index, &filter);
        let vms = vec![
            vm("VW-WEB01_REP", PowerState::PoweredOff, None),
            vm("temp-db01", PowerState::PoweredOn, None),
        ];
        let report = reconciler.reconcile(&VCenterInventory::from_hosts(vms));
        assert!(report.missing.is_empty());
        assert!(report.mismatches.is_empty());
        assert!(report.powered_off_enabled.is_empty());
        assert!(report.outcomes.iter().all(|o| o.kind() == "excluded"));
    }

    #[test]
    fn test_every_record_gets_one_outcome() {
        let index = ZabbixIndex::build(vec![zbx("APP01", ZabbixStatus::Enabled, None)]);
        let filter = FilterEngine::default();
        let reconciler = Reconciler::new(&index, &filter);
        let raw = vec![
            RawVmRecord {
                host: Some("VW-APP01-x".into()),
                status: Some("poweredOn".into()),
                ip: None,
            },
            RawVmRecord {
                host: Some("VW-APP02-x".into()),
                status: None,
                ip: None,
            },
            RawVmRecord {
                host: Some("VW-APP03-x".into()),
                status: Some("suspended".into()),
                ip: None,
            },
        ];
        let inventory = VCenterInventory::from_raw(&raw);
        let report = reconciler.reconcile(&inventory);
        assert_eq!(report.outcomes.len(), 3);
        let kinds: Vec<&str> = report.outcomes.iter().map(|o| o.kind()).collect();
        assert_eq!(kinds, vec!["matched", "excluded", "invalid_record"]);
        assert_eq!(report.summary.invalid_records, 1);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = ReconciliationOutcome::Excluded {
            vm: vm("VW-OFF-x", PowerState::PoweredOff, None),
            identity: "OFF".into(),
            reason: ExclusionReason::PoweredOff,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "excluded");
        assert_eq!(json["reason"], "powered_off");
        assert_eq!(json["vm"]["status"], "poweredOff");
    }
}
