//! One full reconciliation run: fetch both inventories once, classify, remediate

use chrono::Utc;
use tracing::info;

use crate::error::{SyncError, SyncResult};
use crate::executor::{self, ExecutionReport};
use crate::filter::FilterEngine;
use crate::index::ZabbixIndex;
use crate::models::{RawVmRecord, RawZabbixRecord};
use crate::planner::Plan;
use crate::ports::{VCenterSource, ZabbixMutator, ZabbixSource};
use crate::reconcile::{Reconciler, ReconciliationReport, VCenterInventory};
use crate::summary::RunSummary;

pub const DEFAULT_GROUP: &str = "vcenter_hosts";

/// Everything a run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct RunContext {
    pub filter: FilterEngine,
    pub group_name: String,
    /// Also enable hosts that are powered on but disabled in Zabbix
    pub remediate_powered_on_disabled: bool,
    pub dry_run: bool,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            filter: FilterEngine::default(),
            group_name: DEFAULT_GROUP.to_string(),
            remediate_powered_on_disabled: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub vcenter_snapshot: Vec<RawVmRecord>,
    pub zabbix_snapshot: Vec<RawZabbixRecord>,
    pub report: ReconciliationReport,
    pub group_plan: Plan,
    pub group_execution: ExecutionReport,
    pub status_plan: Plan,
    pub status_execution: ExecutionReport,
    pub summary: RunSummary,
}

/// Fetches both inventories; any failure aborts before classification
pub async fn fetch_snapshots<V, Z>(vcenter: &V, zabbix: &Z) -> SyncResult<(Vec<RawVmRecord>, Vec<RawZabbixRecord>)>
where
    V: VCenterSource + ?Sized,
    Z: ZabbixSource + ?Sized,
{
    let vms = vcenter.fetch_vms().await.map_err(|e| into_fetch_failure("VCenter", e))?;
    info!("Fetched {} VMs from VCenter", vms.len());
    let hosts = zabbix.fetch_hosts().await.map_err(|e| into_fetch_failure("Zabbix", e))?;
    info!("Fetched {} hosts from Zabbix", hosts.len());
    Ok((vms, hosts))
}

fn into_fetch_failure(system: &'static str, error: SyncError) -> SyncError {
    match error {
        SyncError::FetchFailure { .. } => error,
        other => SyncError::fetch(system, other),
    }
}

/// Classification only, on snapshots already in memory
pub fn reconcile_snapshots(
    ctx: &RunContext,
    vcenter_snapshot: &[RawVmRecord],
    zabbix_snapshot: &[RawZabbixRecord],
) -> (VCenterInventory, ReconciliationReport) {
    let inventory = VCenterInventory::from_raw(vcenter_snapshot);
    let (index, invalid_zabbix) = ZabbixIndex::from_raw(zabbix_snapshot);
    let mut report = Reconciler::new(&index, &ctx.filter).reconcile(&inventory);
    report.summary.zabbix_hosts = index.len() as u32;
    report.summary.invalid_records += invalid_zabbix.len() as u32;
    (inventory, report)
}

pub async fn run_once<V, Z, M>(ctx: &RunContext, vcenter: &V, zabbix: &Z, mutator: &M) -> SyncResult<RunOutput>
where
    V: VCenterSource + ?Sized,
    Z: ZabbixSource + ?Sized,
    M: ZabbixMutator + ?Sized,
{
    let mut summary = RunSummary::started(Utc::now());

    let (vcenter_snapshot, zabbix_snapshot) = fetch_snapshots(vcenter, zabbix).await?;
    let (inventory, report) = reconcile_snapshots(ctx, &vcenter_snapshot, &zabbix_snapshot);
    summary.merge(&report.summary);

    let status_input = if ctx.remediate_powered_on_disabled {
        &report.mismatches
    } else {
        &report.powered_off_enabled
    };

    // All reads first: a read failure must leave Zabbix untouched
    let group_plan = executor::plan_group_flow(&inventory.vms, &ctx.filter, &ctx.group_name, mutator).await?;
    let status_plan = executor::plan_status_flow(status_input, mutator).await?;

    let group_execution = executor::apply_plan(&group_plan, mutator, ctx.dry_run).await;
    let status_execution = executor::apply_plan(&status_plan, mutator, ctx.dry_run).await;
    for (plan, execution) in [(&group_plan, &group_execution), (&status_plan, &status_execution)] {
        summary.record_plan(plan);
        summary.record_execution(execution);
    }

    summary.finish(Utc::now());
    info!(
        "Run complete: {} intents planned, {} applied, {} failed",
        summary.intents_planned, summary.intents_applied, summary.intents_failed
    );

    Ok(RunOutput {
        vcenter_snapshot,
        zabbix_snapshot,
        report,
        group_plan,
        group_execution,
        status_plan,
        status_execution,
        summary,
    })
}
