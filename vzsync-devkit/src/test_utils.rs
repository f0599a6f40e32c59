/*!
Test Harness pour la réconciliation VCenter ↔ Zabbix

Facilite l'écriture de tests avec:
- Setup automatique des stubs VCenter / Zabbix
- Exécution d'un run complet ou d'une simple classification
- Assertions sur les rapports et les écritures envoyées à Zabbix
*/

use anyhow::Result;
use vzsync_core::run::{self, RunContext, RunOutput, DEFAULT_GROUP};
use vzsync_core::{ReconciliationReport, SyncResult};

use crate::fixtures::InventoryBuilder;
use crate::mock_inventory::{MockCall, MockVCenter, MockZabbix};

pub const TARGET_GROUP_ID: &str = "42";

/// Harness de test complet pour un run de synchronisation
pub struct TestHarness {
    pub ctx: RunContext,
    pub vcenter: MockVCenter,
    pub zabbix: MockZabbix,
    builder: InventoryBuilder,
}

impl TestHarness {
    /// Crée un harness à partir d'un inventaire; le groupe cible existe avec l'id 42
    pub fn new(builder: InventoryBuilder) -> Self {
        env_logger::builder().is_test(true).try_init().ok(); // Init logging pour tests

        Self {
            ctx: RunContext::default(),
            vcenter: builder.mock_vcenter(),
            zabbix: builder.mock_zabbix(DEFAULT_GROUP, TARGET_GROUP_ID),
            builder,
        }
    }

    /// Harness dont le parc Zabbix n'a pas le groupe cible
    pub fn without_group(builder: InventoryBuilder) -> Self {
        let mut harness = Self::new(builder);
        harness.ctx.group_name = "does_not_exist".to_string();
        harness
    }

    pub fn dry_run(mut self) -> Self {
        self.ctx.dry_run = true;
        self
    }

    pub fn remediate_powered_on_disabled(mut self) -> Self {
        self.ctx.remediate_powered_on_disabled = true;
        self
    }

    /// Classification seule, sur les snapshots du builder
    pub fn reconcile(&self) -> ReconciliationReport {
        let (_, report) = run::reconcile_snapshots(
            &self.ctx,
            &self.builder.vcenter_records(),
            &self.builder.zabbix_records(),
        );
        report
    }

    /// Run complet contre les stubs
    pub async fn run(&self) -> SyncResult<RunOutput> {
        log::info!("Running reconciliation against mocks (dry_run={})", self.ctx.dry_run);
        run::run_once(&self.ctx, &self.vcenter, &self.zabbix, &self.zabbix).await
    }

    /// Assert qu'aucune mutation n'a été envoyée à Zabbix
    pub fn assert_no_writes(&self) -> Result<()> {
        let writes = self.zabbix.get_writes();
        if !writes.is_empty() {
            anyhow::bail!("Expected no Zabbix writes, got {:?}", writes);
        }
        Ok(())
    }

    /// Assert qu'un appel spécifique a été envoyé
    pub fn assert_call_sent(&self, expected: &MockCall) -> Result<()> {
        let calls = self.zabbix.get_calls();
        if !calls.contains(expected) {
            anyhow::bail!("Call {:?} not found among {} recorded calls", expected, calls.len());
        }
        Ok(())
    }

    /// Assert que le rapport des hôtes manquants contient ces noms, sans tenir compte de l'ordre
    pub fn assert_missing(report: &ReconciliationReport, expected: &[&str]) -> Result<()> {
        let mut actual: Vec<&str> = report.missing.iter().map(|m| m.host.as_str()).collect();
        let mut expected = expected.to_vec();
        actual.sort_unstable();
        expected.sort_unstable();
        if actual != expected {
            anyhow::bail!("Missing hosts mismatch: expected {:?}, got {:?}", expected, actual);
        }
        Ok(())
    }
}
