//! JSON snapshot files in the data directory
//!
//! Every file is rewritten wholesale; the last writer wins.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const VCENTER_VMS: &str = "vcenter_vms.json";
pub const ZABBIX_HOSTS: &str = "zabbix_hosts.json";
pub const MISSING_HOSTS: &str = "missing_hosts.json";
pub const MISMATCHED_HOSTS: &str = "mismatched_hosts.json";
pub const POWERED_OFF_ENABLED: &str = "vmware_hosts_disabled.json";
pub const RUN_SUMMARY: &str = "run_summary.json";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Relative names land in the data directory, anything else is used as given
    pub fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.is_absolute() || name.components().count() > 1 {
            name.to_path_buf()
        } else {
            self.dir.join(name)
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, name: impl AsRef<Path>, value: &T) -> Result<PathBuf> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    pub fn load<T: DeserializeOwned>(&self, name: impl AsRef<Path>) -> Result<T> {
        let path = self.path(name);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {} (run the matching export first?)", path.display()))?;
        let value = serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))?;
        debug!("Loaded {}", path.display());
        Ok(value)
    }
}
