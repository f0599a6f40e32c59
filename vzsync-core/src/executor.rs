//! Thin executor: reads current Zabbix state, plans, applies intents
//!
//! Each flow is split into a read+plan step and an apply step. Callers run
//! every plan step before the first apply, so a failed read aborts with
//! nothing applied. A failed write is logged and counted; the remaining
//! intents are still applied.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info};

use crate::error::{SyncError, SyncResult};
use crate::filter::FilterEngine;
use crate::models::{MismatchRecord, VCenterHost};
use crate::planner::{self, Intent, Plan};
use crate::ports::{HostMembership, HostState, TargetGroup, ZabbixMutator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub applied: u32,
    pub failed: u32,
    pub dry_run: bool,
    pub failures: Vec<IntentFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentFailure {
    pub host: String,
    pub error: String,
}

pub async fn resolve_group<M>(mutator: &M, group_name: &str) -> SyncResult<TargetGroup>
where
    M: ZabbixMutator + ?Sized,
{
    match mutator.group_id(group_name).await? {
        Some(id) => Ok(TargetGroup {
            name: group_name.to_string(),
            id,
        }),
        None => {
            error!("Host group '{}' not found in Zabbix", group_name);
            Err(SyncError::GroupNotFound(group_name.to_string()))
        }
    }
}

pub async fn read_memberships<M>(mutator: &M, hosts: &[String]) -> SyncResult<HashMap<String, HostMembership>>
where
    M: ZabbixMutator + ?Sized,
{
    let mut out = HashMap::with_capacity(hosts.len());
    for host in hosts {
        if let Some(membership) = mutator.host_membership(host).await? {
            out.insert(host.clone(), membership);
        }
    }
    Ok(out)
}

pub async fn read_states<M>(mutator: &M, hosts: &[String]) -> SyncResult<HashMap<String, HostState>>
where
    M: ZabbixMutator + ?Sized,
{
    let mut out = HashMap::with_capacity(hosts.len());
    for host in hosts {
        if let Some(state) = mutator.host_state(host).await? {
            out.insert(host.clone(), state);
        }
    }
    Ok(out)
}

pub async fn apply_plan<M>(plan: &Plan, mutator: &M, dry_run: bool) -> ExecutionReport
where
    M: ZabbixMutator + ?Sized,
{
    let mut report = ExecutionReport {
        dry_run,
        ..ExecutionReport::default()
    };

    for intent in &plan.intents {
        if dry_run {
            info!("[dry-run] {}", describe(intent));
            continue;
        }

        let result = match intent {
            Intent::SetStatus {
                host_id, target_status, ..
            } => mutator.set_host_status(host_id, *target_status).await,
            Intent::AddToGroup { host_id, groups, .. } => mutator.update_host_groups(host_id, groups).await,
        };

        match result {
            Ok(()) => {
                info!("{}", describe(intent));
                report.applied += 1;
            }
            Err(e) => {
                error!("Failed to apply intent for host '{}': {}", intent.host(), e);
                report.failed += 1;
                report.failures.push(IntentFailure {
                    host: intent.host().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    debug!(
        "Plan executed: {} applied, {} failed, {} skipped (dry_run={})",
        report.applied,
        report.failed,
        plan.skipped.len(),
        dry_run
    );
    report
}

fn describe(intent: &Intent) -> String {
    match intent {
        Intent::SetStatus {
            host, target_status, ..
        } => format!("Host '{host}' status set to {target_status}"),
        Intent::AddToGroup { host, group_name, .. } => format!("Host '{host}' added to group '{group_name}'"),
    }
}

/// Group-membership reads and planning: candidates → current memberships → plan
pub async fn plan_group_flow<M>(
    vms: &[VCenterHost],
    filter: &FilterEngine,
    group_name: &str,
    mutator: &M,
) -> SyncResult<Plan>
where
    M: ZabbixMutator + ?Sized,
{
    let group = resolve_group(mutator, group_name).await?;
    let candidates = planner::group_candidates(vms, filter);
    let memberships = read_memberships(mutator, &candidates).await?;
    let plan = planner::plan_group_memberships(&candidates, &memberships, &group);
    info!(
        "Group '{}': {} candidates, {} to add, {} skipped",
        group.name,
        candidates.len(),
        plan.intents.len(),
        plan.skipped.len()
    );
    Ok(plan)
}

/// Status-correction reads and planning: mismatch records → current states → plan
pub async fn plan_status_flow<M>(records: &[MismatchRecord], mutator: &M) -> SyncResult<Plan>
where
    M: ZabbixMutator + ?Sized,
{
    let hosts = planner::status_targets(records);
    let states = read_states(mutator, &hosts).await?;
    let plan = planner::plan_status_corrections(records, &states);
    info!(
        "Status correction: {} records, {} to change, {} skipped",
        records.len(),
        plan.intents.len(),
        plan.skipped.len()
    );
    Ok(plan)
}

/// Group-membership flow on its own: plan, then apply
pub async fn sync_group_membership<M>(
    vms: &[VCenterHost],
    filter: &FilterEngine,
    group_name: &str,
    mutator: &M,
    dry_run: bool,
) -> SyncResult<(Plan, ExecutionReport)>
where
    M: ZabbixMutator + ?Sized,
{
    let plan = plan_group_flow(vms, filter, group_name, mutator).await?;
    let report = apply_plan(&plan, mutator, dry_run).await;
    Ok((plan, report))
}

/// Status-correction flow on its own: plan, then apply
pub async fn correct_statuses<M>(
    records: &[MismatchRecord],
    mutator: &M,
    dry_run: bool,
) -> SyncResult<(Plan, ExecutionReport)>
where
    M: ZabbixMutator + ?Sized,
{
    let plan = plan_status_flow(records, mutator).await?;
    let report = apply_plan(&plan, mutator, dry_run).await;
    Ok((plan, report))
}
