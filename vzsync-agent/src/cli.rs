//! CLI command definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::snapshot::POWERED_OFF_ENABLED;

/// vzsync - keeps Zabbix monitoring in line with the VCenter VM inventory
#[derive(Parser, Debug)]
#[command(name = "vzsync")]
#[command(version)]
#[command(about = "Reconcile VCenter virtual machines with Zabbix hosts")]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "VZSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the VCenter VM inventory to vcenter_vms.json
    ExportVcenter,

    /// Export the Zabbix host inventory to zabbix_hosts.json
    ExportZabbix,

    /// List powered-on VMs missing from Zabbix (snapshots only)
    Compare,

    /// Report power/monitoring status mismatches (snapshots only)
    Status,

    /// Add every eligible VM to the VCenter host group in Zabbix
    AddToGroup {
        /// Plan only, send nothing to Zabbix
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Align Zabbix host status with VMware power state
    ApplyStatus {
        /// Plan only, send nothing to Zabbix
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Mismatch file to act on
        #[arg(short, long, default_value = POWERED_OFF_ENABLED)]
        input: PathBuf,
    },

    /// Fetch both inventories and run every pass end to end
    Run {
        /// Plan only, send nothing to Zabbix
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_status_defaults() {
        let cli = Cli::try_parse_from(["vzsync", "apply-status"]).unwrap();
        match cli.command {
            Commands::ApplyStatus { dry_run, input } => {
                assert!(!dry_run);
                assert_eq!(input, PathBuf::from("vmware_hosts_disabled.json"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["vzsync", "run", "--dry-run", "--config", "/etc/vzsync.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/vzsync.yaml")));
        assert!(matches!(cli.command, Commands::Run { dry_run: true }));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["vzsync", "sync-everything"]).is_err());
    }
}
