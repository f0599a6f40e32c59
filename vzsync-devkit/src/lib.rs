/*!
# vzsync DevKit - Stubs et utilitaires de test

Bibliothèque facilitant les tests de réconciliation sans VCenter ni Zabbix:
- Stubs en mémoire des ports VCenter / Zabbix
- Builders d'inventaires de test
- Harness exécutant une réconciliation complète
*/

pub mod fixtures;
pub mod mock_inventory;
pub mod test_utils;

pub use fixtures::InventoryBuilder;
pub use mock_inventory::{MockCall, MockHost, MockVCenter, MockZabbix};
pub use test_utils::TestHarness;
