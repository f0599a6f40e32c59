//! Counters for one reconciliation run, persisted as `run_summary.json`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::executor::ExecutionReport;
use crate::planner::Plan;
use crate::reconcile::ReconciliationOutcome;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub vcenter_records: u32,
    pub zabbix_hosts: u32,
    pub missing: u32,
    pub status_mismatch: u32,
    pub powered_off_but_enabled: u32,
    pub matched: u32,
    pub excluded: u32,
    pub invalid_records: u32,
    pub intents_planned: u32,
    pub intents_skipped: u32,
    pub intents_applied: u32,
    pub intents_failed: u32,
    #[serde(default)]
    pub dry_run: bool,
}

impl RunSummary {
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(now),
            ..Self::default()
        }
    }

    pub fn record_outcomes(&mut self, outcomes: &[ReconciliationOutcome]) {
        for outcome in outcomes {
            self.vcenter_records += 1;
            match outcome {
                ReconciliationOutcome::Missing { .. } => self.missing += 1,
                ReconciliationOutcome::StatusMismatch { .. } => self.status_mismatch += 1,
                ReconciliationOutcome::PoweredOffButEnabled { .. } => self.powered_off_but_enabled += 1,
                ReconciliationOutcome::Matched { .. } => self.matched += 1,
                ReconciliationOutcome::Excluded { .. } => self.excluded += 1,
                ReconciliationOutcome::InvalidRecord { .. } => self.invalid_records += 1,
            }
        }
    }

    pub fn record_plan(&mut self, plan: &Plan) {
        self.intents_planned += plan.intents.len() as u32;
        self.intents_skipped += plan.skipped.len() as u32;
    }

    pub fn record_execution(&mut self, report: &ExecutionReport) {
        self.intents_applied += report.applied;
        self.intents_failed += report.failed;
        self.dry_run |= report.dry_run;
    }

    /// Adds counters of a partial summary (e.g. the reconciler's) to this one
    pub fn merge(&mut self, other: &RunSummary) {
        self.vcenter_records += other.vcenter_records;
        self.zabbix_hosts += other.zabbix_hosts;
        self.missing += other.missing;
        self.status_mismatch += other.status_mismatch;
        self.powered_off_but_enabled += other.powered_off_but_enabled;
        self.matched += other.matched;
        self.excluded += other.excluded;
        self.invalid_records += other.invalid_records;
        self.intents_planned += other.intents_planned;
        self.intents_skipped += other.intents_skipped;
        self.intents_applied += other.intents_applied;
        self.intents_failed += other.intents_failed;
        self.dry_run |= other.dry_run;
    }

    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.finished_at = Some(now);
    }
}
