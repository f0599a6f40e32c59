//! Agent configuration
//!
//! Loaded once at startup from a YAML file, then overridden by environment
//! variables (a `.env` file is honoured). Credentials usually come from the
//! environment:
//! - VCENTER_HOST / VCENTER_USER / VCENTER_PASSWORD
//! - ZABBIX_URL / ZABBIX_USER / ZABBIX_PASSWORD

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use vzsync_core::run::{RunContext, DEFAULT_GROUP};
use vzsync_core::{ExclusionRule, FilterEngine};

pub const CONFIG_ENV: &str = "VZSYNC_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "vzsync.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub vcenter: VCenterConfig,
    #[serde(default)]
    pub zabbix: ZabbixConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VCenterConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Accept self-signed certificates (the usual VCenter setup)
    #[serde(default = "default_true")]
    pub insecure_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZabbixConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub insecure_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_group")]
    pub group_name: String,
    #[serde(default = "FilterEngine::default_rules")]
    pub exclusions: Vec<ExclusionRule>,
    #[serde(default)]
    pub remediate_powered_on_disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Also append log lines to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for VCenterConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            password: String::new(),
            insecure_tls: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ZabbixConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            insecure_tls: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            group_name: default_group(),
            exclusions: FilterEngine::default_rules(),
            remediate_powered_on_disabled: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

impl AgentConfig {
    /// Resolves the config path: explicit flag, then `VZSYNC_CONFIG`, then `vzsync.yaml`
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Reads the YAML file (if any) and applies environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_yaml(&text).with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Environment wins over the file for every connection setting
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };
        set(&mut self.vcenter.host, "VCENTER_HOST");
        set(&mut self.vcenter.user, "VCENTER_USER");
        set(&mut self.vcenter.password, "VCENTER_PASSWORD");
        set(&mut self.zabbix.url, "ZABBIX_URL");
        set(&mut self.zabbix.user, "ZABBIX_USER");
        set(&mut self.zabbix.password, "ZABBIX_PASSWORD");
    }

    pub fn validate_vcenter(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.vcenter.host.is_empty() {
            missing.push("vcenter.host / VCENTER_HOST");
        }
        if self.vcenter.user.is_empty() {
            missing.push("vcenter.user / VCENTER_USER");
        }
        if self.vcenter.password.is_empty() {
            missing.push("VCENTER_PASSWORD");
        }
        if !missing.is_empty() {
            bail!("Missing VCenter settings: {}", missing.join(", "));
        }
        Ok(())
    }

    pub fn validate_zabbix(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.zabbix.url.is_empty() {
            missing.push("zabbix.url / ZABBIX_URL");
        }
        if self.zabbix.user.is_empty() {
            missing.push("zabbix.user / ZABBIX_USER");
        }
        if self.zabbix.password.is_empty() {
            missing.push("ZABBIX_PASSWORD");
        }
        if !missing.is_empty() {
            bail!("Missing Zabbix settings: {}", missing.join(", "));
        }
        Ok(())
    }

    pub fn run_context(&self, dry_run: bool) -> RunContext {
        RunContext {
            filter: FilterEngine::new(self.sync.exclusions.clone()),
            group_name: self.sync.group_name.clone(),
            remediate_powered_on_disabled: self.sync.remediate_powered_on_disabled,
            dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.sync.group_name, "vcenter_hosts");
        assert_eq!(config.sync.exclusions.len(), 3);
        assert!(config.vcenter.insecure_tls);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_yaml_sections_and_rules() {
        let yaml = r#"
vcenter:
  host: vcenter.lab.local
  user: svc-zabbix
zabbix:
  url: https://zabbix.lab.local/
  user: api
sync:
  data_dir: /var/lib/vzsync
  group_name: vmware
  exclusions:
    - kind: suffix
      literal: _REP
    - kind: prefix
      literal: lab-
      case_sensitive: false
logging:
  level: debug
  file: /var/log/zabbix/vzsync.log
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.vcenter.host, "vcenter.lab.local");
        assert_eq!(config.vcenter.timeout_secs, 30);
        assert_eq!(config.sync.group_name, "vmware");
        assert_eq!(config.sync.exclusions.len(), 2);
        assert!(config.sync.exclusions[0].case_sensitive);
        assert_eq!(config.logging.file, Some(PathBuf::from("/var/log/zabbix/vzsync.log")));
        assert!(config.run_context(true).filter.is_excluded("LAB-web"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = AgentConfig::from_yaml("  \n").unwrap();
        assert_eq!(config.sync.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AgentConfig::from_yaml("zabbix:\n  url: http://old\n  user: file-user\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("ZABBIX_URL", "http://new"),
            ("ZABBIX_PASSWORD", "secret"),
            ("VCENTER_USER", ""),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.zabbix.url, "http://new");
        assert_eq!(config.zabbix.user, "file-user");
        assert_eq!(config.zabbix.password, "secret");
        assert!(config.validate_zabbix().is_ok());
        assert!(config.validate_vcenter().is_err());
    }

    #[test]
    fn test_passwords_never_serialized() {
        let mut config = AgentConfig::default();
        config.vcenter.password = "hunter2".into();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("hunter2"));
    }
}
