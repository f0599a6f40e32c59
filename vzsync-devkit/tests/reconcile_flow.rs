use vzsync_core::executor;
use vzsync_core::planner::{self, SkipReason};
use vzsync_core::{
    ExclusionReason, Intent, MismatchRecord, MissingHost, PowerState, RawMismatchRecord, RecordIssue,
    ReconciliationOutcome, SyncError, ZabbixStatus,
};
use vzsync_devkit::{InventoryBuilder, MockCall, MockZabbix, TestHarness};

#[test]
fn missing_vm_is_reported_with_its_raw_name() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-SWX002-a.miller", Some("10.0.0.5"))
            .zabbix_enabled("OTHER01", Some("10.0.0.99")),
    );
    let report = harness.reconcile();

    assert_eq!(
        report.missing,
        vec![MissingHost {
            host: "VW-SWX002-a.miller".into(),
            ip: Some("10.0.0.5".into()),
        }]
    );
    TestHarness::assert_missing(&report, &["VW-SWX002-a.miller"]).unwrap();
}

#[test]
fn missing_hosts_compare_regardless_of_order() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-AAA01-x", None)
            .vm_on("VW-ZZZ01-x", None),
    );
    let report = harness.reconcile();

    TestHarness::assert_missing(&report, &["VW-ZZZ01-x", "VW-AAA01-x"]).unwrap();
    TestHarness::assert_missing(&report, &["VW-AAA01-x", "VW-ZZZ01-x"]).unwrap();
    assert!(TestHarness::assert_missing(&report, &["VW-AAA01-x"]).is_err());
}

#[test]
fn temp_prefixed_vm_is_excluded_everywhere() {
    let harness = TestHarness::new(InventoryBuilder::new().vm_on("temp-db01", None).vm_on("TEMP-db02", None));
    let report = harness.reconcile();

    assert!(report.missing.is_empty());
    assert!(report.mismatches.is_empty());
    assert!(report.powered_off_enabled.is_empty());
    assert!(report.outcomes.iter().all(|o| matches!(
        o,
        ReconciliationOutcome::Excluded {
            reason: ExclusionReason::Pattern { .. },
            ..
        }
    )));
}

#[tokio::test]
async fn powered_off_vm_enabled_in_zabbix_gets_disabled() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_off("VW-APP01-x", None)
            .zabbix_enabled("APP01", None),
    );
    let output = harness.run().await.unwrap();

    let expected = MismatchRecord {
        host: "APP01".into(),
        ip: "N/A".into(),
        vmware_status: PowerState::PoweredOff,
        zabbix_status: ZabbixStatus::Enabled,
    };
    assert_eq!(output.report.mismatches, vec![expected.clone()]);
    assert_eq!(output.report.powered_off_enabled, vec![expected]);
    assert_eq!(
        output.status_plan.intents,
        vec![Intent::SetStatus {
            host: "APP01".into(),
            host_id: "10001".into(),
            target_status: ZabbixStatus::Disabled,
        }]
    );
    harness
        .assert_call_sent(&MockCall::SetStatus {
            host_id: "10001".into(),
            status: ZabbixStatus::Disabled,
        })
        .unwrap();
    assert_eq!(harness.zabbix.host("APP01").unwrap().status, "disabled");
    assert_eq!(output.summary.intents_applied, 1);

    // Already disabled: nothing left to do
    harness.zabbix.clear_calls();
    let second = harness.run().await.unwrap();
    assert!(second.report.powered_off_enabled.is_empty());
    harness.assert_no_writes().unwrap();
}

#[test]
fn replica_vm_is_never_classified() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-WEB01_REP", None)
            .zabbix_disabled("WEB01_REP", None),
    );
    let report = harness.reconcile();

    assert!(report.missing.is_empty());
    assert!(report.mismatches.is_empty());
    assert_eq!(report.summary.excluded, 1);
}

#[test]
fn record_without_status_is_invalid() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm(Some("VW-APP02-x"), None, Some("10.0.0.8"))
            .vm(None, Some("poweredOn"), None),
    );
    let report = harness.reconcile();

    assert!(report.missing.is_empty());
    assert!(report.mismatches.is_empty());
    assert_eq!(report.summary.invalid_records, 2);
    assert!(report
        .outcomes
        .iter()
        .all(|o| matches!(o, ReconciliationOutcome::InvalidRecord { .. })));
}

#[test]
fn ip_match_suppresses_missing_report() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-SRV09-ops", Some("10.0.0.9"))
            .zabbix_enabled("srv09.lab.local", Some("10.0.0.9")),
    );
    let report = harness.reconcile();

    assert!(report.missing.is_empty());
    assert_eq!(report.summary.matched, 1);
}

#[test]
fn powered_on_but_disabled_is_symmetric_mismatch_only() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-DB03-x", Some("10.0.0.3"))
            .zabbix_disabled("DB03", Some("10.0.0.3")),
    );
    let report = harness.reconcile();

    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].vmware_status, PowerState::PoweredOn);
    assert!(report.powered_off_enabled.is_empty());
    assert_eq!(report.summary.status_mismatch, 1);
}

#[tokio::test]
async fn powered_on_but_disabled_is_enabled_only_when_asked() {
    let builder = InventoryBuilder::new()
        .vm_on("VW-DB03-x", Some("10.0.0.3"))
        .zabbix("DB03", "disabled", Some("10.0.0.3"), &["42"]);

    let report_only = TestHarness::new(builder.clone());
    let output = report_only.run().await.unwrap();
    assert!(output.status_plan.intents.is_empty());
    report_only.assert_no_writes().unwrap();

    let remediating = TestHarness::new(builder).remediate_powered_on_disabled();
    remediating.run().await.unwrap();
    assert_eq!(remediating.zabbix.get_writes(), vec![MockCall::SetStatus {
        host_id: "10001".into(),
        status: ZabbixStatus::Enabled,
    }]);
}

#[tokio::test]
async fn group_membership_is_idempotent() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-WEB01-ops", Some("10.0.0.1"))
            .vm_off("VW-WEB02-ops", None)
            .zabbix("WEB01", "enabled", Some("10.0.0.1"), &["7"])
            .zabbix("WEB02", "disabled", None, &["7"]),
    );

    let first = harness.run().await.unwrap();
    assert_eq!(first.group_plan.intents.len(), 1);
    assert_eq!(
        harness.zabbix.get_writes(),
        vec![MockCall::UpdateGroups {
            host_id: "10001".into(),
            group_ids: vec!["7".into(), "42".into()],
        }]
    );

    harness.zabbix.clear_calls();
    let second = harness.run().await.unwrap();
    assert!(second.group_plan.intents.is_empty());
    assert_eq!(second.group_plan.skipped[0].reason, SkipReason::AlreadyMember);
    harness.assert_no_writes().unwrap();
}

#[tokio::test]
async fn vm_unknown_to_zabbix_is_skipped_by_group_flow() {
    let harness = TestHarness::new(InventoryBuilder::new().vm_on("VW-NEW01-x", None));
    let output = harness.run().await.unwrap();

    assert_eq!(output.report.missing.len(), 1);
    assert_eq!(output.group_plan.skipped[0].reason, SkipReason::NotFoundInTarget);
    assert_eq!(
        output.group_plan.issues(),
        vec![RecordIssue::NotFoundInTarget { host: "NEW01".into() }]
    );
    harness.assert_no_writes().unwrap();
}

#[tokio::test]
async fn dry_run_plans_without_writing() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-WEB01-ops", None)
            .vm_off("VW-APP01-x", None)
            .zabbix_enabled("WEB01", None)
            .zabbix_enabled("APP01", None),
    )
    .dry_run();
    let output = harness.run().await.unwrap();

    assert_eq!(output.group_plan.intents.len(), 1);
    assert_eq!(output.status_plan.intents.len(), 1);
    assert_eq!(output.summary.intents_planned, 2);
    assert_eq!(output.summary.intents_applied, 0);
    assert!(output.summary.dry_run);
    harness.assert_no_writes().unwrap();

    let json = serde_json::to_value(&output.status_plan.intents).unwrap();
    assert_eq!(json[0]["kind"], "set_status");
    assert_eq!(json[0]["target_status"], "disabled");
}

#[tokio::test]
async fn write_failure_does_not_stop_the_run() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_off("VW-APP01-x", None)
            .vm_off("VW-APP02-x", None)
            .zabbix_enabled("APP01", None)
            .zabbix_enabled("APP02", None),
    );
    harness.zabbix.fail_writes_for("APP01");

    let output = harness.run().await.unwrap();
    assert_eq!(output.status_execution.applied, 1);
    assert_eq!(output.status_execution.failed, 1);
    assert_eq!(output.status_execution.failures[0].host, "APP01");
    assert_eq!(harness.zabbix.host("APP01").unwrap().status, "enabled");
    assert_eq!(harness.zabbix.host("APP02").unwrap().status, "disabled");
    assert_eq!(output.summary.intents_failed, 1);
}

#[tokio::test]
async fn vcenter_fetch_failure_aborts_before_any_zabbix_call() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_off("VW-APP01-x", None)
            .zabbix_enabled("APP01", None),
    );
    harness.vcenter.fail_fetch();

    let err = harness.run().await.unwrap_err();
    assert!(matches!(err, SyncError::FetchFailure { system: "VCenter", .. }));
    assert!(harness.zabbix.get_calls().is_empty());
}

#[tokio::test]
async fn zabbix_fetch_failure_applies_nothing() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_off("VW-APP01-x", None)
            .zabbix_enabled("APP01", None),
    );
    harness.zabbix.fail_fetch();

    let err = harness.run().await.unwrap_err();
    assert!(matches!(err, SyncError::FetchFailure { system: "Zabbix", .. }));
    harness.assert_no_writes().unwrap();
    assert_eq!(harness.vcenter.fetch_count(), 1);
}

#[tokio::test]
async fn read_failure_aborts_before_first_write() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-WEB01-ops", None)
            .zabbix_enabled("WEB01", None),
    );
    harness.zabbix.fail_reads();

    let err = harness.run().await.unwrap_err();
    assert!(matches!(err, SyncError::Api { .. }));
    harness.assert_no_writes().unwrap();
}

#[tokio::test]
async fn missing_target_group_is_fatal() {
    let harness = TestHarness::without_group(
        InventoryBuilder::new()
            .vm_on("VW-WEB01-ops", None)
            .zabbix_enabled("WEB01", None),
    );

    let err = harness.run().await.unwrap_err();
    match err {
        SyncError::GroupNotFound(name) => assert_eq!(name, "does_not_exist"),
        other => panic!("unexpected error {other:?}"),
    }
    harness.assert_no_writes().unwrap();
}

#[tokio::test]
async fn suspended_vm_is_left_alone() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm(Some("VW-SUS01-x"), Some("suspended"), Some("10.0.0.4"))
            .zabbix_enabled("SUS01", Some("10.0.0.4")),
    );
    let output = harness.run().await.unwrap();

    assert!(output.report.missing.is_empty());
    assert!(output.report.mismatches.is_empty());
    assert!(matches!(
        &output.report.outcomes[0],
        ReconciliationOutcome::Excluded {
            reason: ExclusionReason::UnrecognizedPowerState { status },
            ..
        } if status == "suspended"
    ));
    harness.assert_no_writes().unwrap();
}

#[tokio::test]
async fn status_file_with_unrecognized_state_is_skipped() {
    let zabbix = MockZabbix::new();
    zabbix.add_host("APP01", "enabled", None, &[]);
    zabbix.add_host("APP02", "enabled", None, &[]);
    let records = vec![
        MismatchRecord {
            host: "APP01".into(),
            ip: "N/A".into(),
            vmware_status: PowerState::Unrecognized("suspended".into()),
            zabbix_status: ZabbixStatus::Enabled,
        },
        MismatchRecord {
            host: "APP02".into(),
            ip: "10.0.0.12".into(),
            vmware_status: PowerState::PoweredOff,
            zabbix_status: ZabbixStatus::Enabled,
        },
    ];

    let (plan, report) = executor::correct_statuses(&records, &zabbix, false).await.unwrap();
    assert_eq!(plan.intents.len(), 1);
    assert_eq!(
        plan.issues(),
        vec![RecordIssue::UnrecognizedStatus {
            host: "APP01".into(),
            status: "suspended".into(),
        }]
    );
    assert_eq!(report.applied, 1);
    assert_eq!(zabbix.host("APP01").unwrap().status, "enabled");
    assert!(!zabbix.get_calls().contains(&MockCall::StateLookup { host: "APP01".into() }));
}

#[tokio::test]
async fn status_read_failure_leaves_group_untouched() {
    let harness = TestHarness::new(
        InventoryBuilder::new()
            .vm_on("VW-WEB01-ops", Some("10.0.0.1"))
            .vm_off("VW-APP01-x", None)
            .zabbix("WEB01", "enabled", Some("10.0.0.1"), &["7"])
            .zabbix_enabled("APP01", None),
    );
    harness.zabbix.fail_state_reads();

    let err = harness.run().await.unwrap_err();
    assert!(matches!(err, SyncError::Api { .. }));
    harness.assert_no_writes().unwrap();
    assert_eq!(harness.zabbix.host("WEB01").unwrap().group_ids, vec!["7"]);
}

#[tokio::test]
async fn malformed_status_entries_do_not_block_the_rest() {
    let zabbix = MockZabbix::new();
    zabbix.add_host("APP01", "enabled", None, &[]);
    zabbix.add_host("APP02", "enabled", None, &[]);
    zabbix.add_host("APP03", "enabled", None, &[]);

    let raw: Vec<RawMismatchRecord> = serde_json::from_str(
        r#"[
            {"host": "APP01", "vmware_status": "poweredOff"},
            {"host": "APP02", "ip": null, "zabbix_status": "enabled"},
            {"ip": "10.0.0.9", "vmware_status": "poweredOff", "zabbix_status": "enabled"},
            {"host": "APP03", "ip": "10.0.0.13", "vmware_status": "poweredOff", "zabbix_status": "enabled"}
        ]"#,
    )
    .unwrap();
    let (records, invalid) = planner::validate_status_records(&raw);
    assert_eq!(records.len(), 2);
    assert_eq!(invalid.len(), 2);

    let (plan, report) = executor::correct_statuses(&records, &zabbix, false).await.unwrap();
    let mut hosts: Vec<&str> = plan.intents.iter().map(Intent::host).collect();
    hosts.sort_unstable();
    assert_eq!(hosts, vec!["APP01", "APP03"]);
    assert_eq!(report.applied, 2);
    assert_eq!(zabbix.host("APP02").unwrap().status, "enabled");
}
