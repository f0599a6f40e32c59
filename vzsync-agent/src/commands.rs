//! Command handlers behind the CLI subcommands
//!
//! Snapshot commands (`compare`, `status`) never touch the network; the others
//! open a vendor session, act, and close it even when the action failed.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};
use vzsync_core::executor::{self, ExecutionReport};
use vzsync_core::ports::{VCenterSource, ZabbixSource};
use vzsync_core::run::{self, RunContext};
use vzsync_core::planner;
use vzsync_core::{
    MismatchRecord, MissingHost, Plan, RawMismatchRecord, RawVmRecord, RawZabbixRecord, RunSummary, VCenterInventory,
};

use crate::config::AgentConfig;
use crate::snapshot::{
    SnapshotStore, MISMATCHED_HOSTS, MISSING_HOSTS, POWERED_OFF_ENABLED, RUN_SUMMARY, VCENTER_VMS, ZABBIX_HOSTS,
};
use crate::vcenter::VCenterClient;
use crate::zabbix::ZabbixClient;

pub async fn export_vcenter(config: &AgentConfig, store: &SnapshotStore) -> Result<()> {
    config.validate_vcenter()?;
    let client = VCenterClient::new(&config.vcenter).context("Failed to build VCenter client")?;
    let vms = client.fetch_vms().await?;
    store.save(VCENTER_VMS, &vms)?;
    println!("Exported {} VMs to {}", vms.len(), store.path(VCENTER_VMS).display());
    Ok(())
}

pub async fn export_zabbix(config: &AgentConfig, store: &SnapshotStore) -> Result<()> {
    config.validate_zabbix()?;
    let client = ZabbixClient::connect(&config.zabbix)
        .await
        .context("Failed to connect to Zabbix")?;
    let result = client.fetch_hosts().await;
    client.logout().await;

    let hosts = result?;
    store.save(ZABBIX_HOSTS, &hosts)?;
    println!("Exported {} hosts to {}", hosts.len(), store.path(ZABBIX_HOSTS).display());
    Ok(())
}

fn load_snapshots(store: &SnapshotStore) -> Result<(Vec<RawVmRecord>, Vec<RawZabbixRecord>)> {
    let vms: Vec<RawVmRecord> = store.load(VCENTER_VMS)?;
    let hosts: Vec<RawZabbixRecord> = store.load(ZABBIX_HOSTS)?;
    Ok((vms, hosts))
}

pub fn compare(config: &AgentConfig, store: &SnapshotStore) -> Result<()> {
    let (vms, hosts) = load_snapshots(store)?;
    let (_, report) = run::reconcile_snapshots(&config.run_context(false), &vms, &hosts);

    print_missing(&report.missing);
    store.save(MISSING_HOSTS, &report.missing)?;
    Ok(())
}

pub fn status(config: &AgentConfig, store: &SnapshotStore) -> Result<()> {
    let (vms, hosts) = load_snapshots(store)?;
    let (_, report) = run::reconcile_snapshots(&config.run_context(false), &vms, &hosts);

    print_mismatches("Status mismatches", &report.mismatches);
    print_mismatches("Powered off in VMware but enabled in Zabbix", &report.powered_off_enabled);
    store.save(MISMATCHED_HOSTS, &report.mismatches)?;
    store.save(POWERED_OFF_ENABLED, &report.powered_off_enabled)?;
    Ok(())
}

pub async fn add_to_group(config: &AgentConfig, store: &SnapshotStore, dry_run: bool) -> Result<()> {
    config.validate_zabbix()?;
    let ctx = config.run_context(dry_run);
    let records: Vec<RawVmRecord> = store.load(VCENTER_VMS)?;
    let inventory = VCenterInventory::from_raw(&records);

    let client = ZabbixClient::connect(&config.zabbix)
        .await
        .context("Failed to connect to Zabbix")?;
    let result =
        executor::sync_group_membership(&inventory.vms, &ctx.filter, &ctx.group_name, &client, ctx.dry_run).await;
    client.logout().await;

    let (plan, execution) = result?;
    print_plan(&plan, &execution)?;
    Ok(())
}

pub async fn apply_status(config: &AgentConfig, store: &SnapshotStore, input: &Path, dry_run: bool) -> Result<()> {
    config.validate_zabbix()?;
    let raw: Vec<RawMismatchRecord> = store.load(input)?;
    let (records, invalid) = planner::validate_status_records(&raw);
    if !invalid.is_empty() {
        println!("{} malformed entries skipped in {}", invalid.len(), store.path(input).display());
    }
    if records.is_empty() {
        println!("No host status to correct in {}", store.path(input).display());
        return Ok(());
    }

    let client = ZabbixClient::connect(&config.zabbix)
        .await
        .context("Failed to connect to Zabbix")?;
    let result = executor::correct_statuses(&records, &client, dry_run).await;
    client.logout().await;

    let (plan, execution) = result?;
    print_plan(&plan, &execution)?;
    Ok(())
}

/// Full pipeline on one fresh fetch of both inventories
pub async fn run(config: &AgentConfig, store: &SnapshotStore, dry_run: bool) -> Result<()> {
    config.validate_vcenter()?;
    config.validate_zabbix()?;
    let ctx: RunContext = config.run_context(dry_run);

    let vcenter = VCenterClient::new(&config.vcenter).context("Failed to build VCenter client")?;
    let zabbix = ZabbixClient::connect(&config.zabbix)
        .await
        .context("Failed to connect to Zabbix")?;
    let result = run::run_once(&ctx, &vcenter, &zabbix, &zabbix).await;
    zabbix.logout().await;

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            let mut summary = RunSummary::started(Utc::now());
            summary.dry_run = dry_run;
            summary.finish(Utc::now());
            if let Err(save_err) = store.save(RUN_SUMMARY, &summary) {
                warn!("Could not record failed run: {}", save_err);
            }
            return Err(e).context("Reconciliation run aborted");
        }
    };

    store.save(VCENTER_VMS, &output.vcenter_snapshot)?;
    store.save(ZABBIX_HOSTS, &output.zabbix_snapshot)?;
    store.save(MISSING_HOSTS, &output.report.missing)?;
    store.save(MISMATCHED_HOSTS, &output.report.mismatches)?;
    store.save(POWERED_OFF_ENABLED, &output.report.powered_off_enabled)?;

    let summary = &output.summary;
    store.save(RUN_SUMMARY, summary)?;

    print_missing(&output.report.missing);
    print_plan(&output.group_plan, &output.group_execution)?;
    print_plan(&output.status_plan, &output.status_execution)?;
    info!(
        "Run finished: {} missing, {} mismatched, {} powered off but enabled",
        summary.missing, summary.status_mismatch, summary.powered_off_but_enabled
    );
    Ok(())
}

fn print_missing(missing: &[MissingHost]) {
    if missing.is_empty() {
        println!("All powered-on VMs are known to Zabbix");
        return;
    }
    println!("{} VMs missing from Zabbix:", missing.len());
    for host in missing {
        println!("  {:<40} {}", host.host, host.ip.as_deref().unwrap_or("-"));
    }
}

fn print_mismatches(title: &str, records: &[MismatchRecord]) {
    println!("{} ({}):", title, records.len());
    for record in records {
        println!(
            "  {:<40} {:<16} vmware={} zabbix={}",
            record.host, record.ip, record.vmware_status, record.zabbix_status
        );
    }
}

fn print_plan(plan: &Plan, execution: &ExecutionReport) -> Result<()> {
    if execution.dry_run {
        println!("{}", serde_json::to_string_pretty(&plan.intents)?);
    }
    println!(
        "{} intents: {} applied, {} failed, {} skipped{}",
        plan.intents.len(),
        execution.applied,
        execution.failed,
        plan.skipped.len(),
        if execution.dry_run { " (dry run)" } else { "" }
    );
    for failure in &execution.failures {
        println!("  failed: {} ({})", failure.host, failure.error);
    }
    Ok(())
}
