//! vzsync core - VCenter ↔ Zabbix host-identity reconciliation
//!
//! Pure decision logic over two already-fetched inventories:
//! - Name normalization (`VW-<host>-<owner>` → `<host>`)
//! - Exclusion rules and the Zabbix host index
//! - Missing / mismatch classification
//! - Idempotent remediation intents and their thin executor
//!
//! Vendor APIs stay behind the traits in [`ports`].

pub mod error;
pub mod executor;
pub mod filter;
pub mod index;
pub mod models;
pub mod normalize;
pub mod planner;
pub mod ports;
pub mod reconcile;
pub mod run;
pub mod summary;

pub use error::{InvalidRecord, RecordIssue, SyncError, SyncResult};
pub use filter::{ExclusionReason, ExclusionRule, FilterEngine, RuleKind};
pub use index::ZabbixIndex;
pub use models::{
    MismatchRecord, MissingHost, PowerState, RawMismatchRecord, RawVmRecord, RawZabbixRecord, VCenterHost, ZabbixHost,
    ZabbixStatus,
};
pub use normalize::normalize;
pub use planner::{Intent, Plan, SkipReason};
pub use reconcile::{MatchKind, Reconciler, ReconciliationOutcome, ReconciliationReport, VCenterInventory};
pub use run::{RunContext, RunOutput};
pub use summary::RunSummary;
