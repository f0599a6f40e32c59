//! Inventory records exchanged with the VCenter and Zabbix collaborators
//!
//! Raw records come straight out of the JSON snapshots (every field optional);
//! `validate()` turns them into typed hosts or an [`InvalidRecord`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::InvalidRecord;

/// Placeholder written in place of a missing VCenter IP in mismatch reports
pub const IP_PLACEHOLDER: &str = "N/A";

/// VM power state as reported by VCenter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    /// Anything else VCenter reports (suspended, ...)
    Unrecognized(String),
}

impl PowerState {
    pub fn as_str(&self) -> &str {
        match self {
            PowerState::PoweredOn => "poweredOn",
            PowerState::PoweredOff => "poweredOff",
            PowerState::Unrecognized(other) => other,
        }
    }

    pub fn is_powered_on(&self) -> bool {
        matches!(self, PowerState::PoweredOn)
    }

    /// Zabbix status a host should carry for this power state
    pub fn target_zabbix_status(&self) -> Option<ZabbixStatus> {
        match self {
            PowerState::PoweredOn => Some(ZabbixStatus::Enabled),
            PowerState::PoweredOff => Some(ZabbixStatus::Disabled),
            PowerState::Unrecognized(_) => None,
        }
    }
}

impl From<&str> for PowerState {
    fn from(value: &str) -> Self {
        match value {
            "poweredOn" => PowerState::PoweredOn,
            "poweredOff" => PowerState::PoweredOff,
            other => PowerState::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PowerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PowerState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PowerState::from(raw.as_str()))
    }
}

/// Monitoring state of a Zabbix host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZabbixStatus {
    Enabled,
    Disabled,
}

impl ZabbixStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZabbixStatus::Enabled => "enabled",
            ZabbixStatus::Disabled => "disabled",
        }
    }

    /// Numeric code used by the Zabbix API (`0` monitored, `1` unmonitored)
    pub fn api_code(&self) -> u8 {
        match self {
            ZabbixStatus::Enabled => 0,
            ZabbixStatus::Disabled => 1,
        }
    }

    pub fn from_api_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(ZabbixStatus::Enabled),
            "1" => Some(ZabbixStatus::Disabled),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "enabled" => Some(ZabbixStatus::Enabled),
            "disabled" => Some(ZabbixStatus::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for ZabbixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One VM exported from VCenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VCenterHost {
    #[serde(rename = "host", alias = "name")]
    pub name: String,
    #[serde(rename = "status")]
    pub power_state: PowerState,
    #[serde(default)]
    pub ip: Option<String>,
}

impl VCenterHost {
    pub fn new(name: impl Into<String>, power_state: PowerState, ip: Option<String>) -> Self {
        Self {
            name: name.into(),
            power_state,
            ip,
        }
    }
}

/// One host exported from Zabbix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZabbixHost {
    #[serde(rename = "host", alias = "name")]
    pub name: String,
    pub status: ZabbixStatus,
    #[serde(default)]
    pub ip: Option<String>,
    /// Every interface IP, `ip` included when known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
}

impl ZabbixHost {
    pub fn new(name: impl Into<String>, status: ZabbixStatus, ip: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            ip,
            interfaces: Vec::new(),
        }
    }

    /// Host built from its full interface list; the first IP becomes `ip`
    pub fn with_interfaces(name: impl Into<String>, status: ZabbixStatus, interfaces: Vec<String>) -> Self {
        Self {
            name: name.into(),
            status,
            ip: interfaces.first().cloned(),
            interfaces,
        }
    }

    /// All known IPs of the host, without duplicates or empty strings
    pub fn ips(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for ip in self.ip.iter().chain(self.interfaces.iter()) {
            let ip = ip.trim();
            if !ip.is_empty() && !out.contains(&ip) {
                out.push(ip);
            }
        }
        out
    }
}

/// VCenter snapshot entry before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawVmRecord {
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

impl RawVmRecord {
    pub fn validate(&self) -> Result<VCenterHost, InvalidRecord> {
        let name = non_empty(&self.host).ok_or_else(|| InvalidRecord::missing_field(self.label(), "host"))?;
        let status = non_empty(&self.status).ok_or_else(|| InvalidRecord::missing_field(self.label(), "status"))?;
        Ok(VCenterHost {
            name: name.to_string(),
            power_state: PowerState::from(status),
            ip: non_empty(&self.ip).map(str::to_string),
        })
    }

    /// Best-effort name used in warnings about this record
    pub fn label(&self) -> String {
        non_empty(&self.host).unwrap_or("<unnamed>").to_string()
    }
}

impl From<&VCenterHost> for RawVmRecord {
    fn from(host: &VCenterHost) -> Self {
        Self {
            host: Some(host.name.clone()),
            status: Some(host.power_state.as_str().to_string()),
            ip: host.ip.clone(),
        }
    }
}

/// Zabbix snapshot entry before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawZabbixRecord {
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
}

impl RawZabbixRecord {
    pub fn validate(&self) -> Result<ZabbixHost, InvalidRecord> {
        let label = non_empty(&self.host).unwrap_or("<unnamed>").to_string();
        let name = non_empty(&self.host).ok_or_else(|| InvalidRecord::missing_field(label.clone(), "host"))?;
        let status = non_empty(&self.status).ok_or_else(|| InvalidRecord::missing_field(label.clone(), "status"))?;
        let status = ZabbixStatus::parse(status)
            .ok_or_else(|| InvalidRecord::bad_value(label.clone(), "status", status))?;
        Ok(ZabbixHost {
            name: name.to_string(),
            status,
            ip: non_empty(&self.ip).map(str::to_string),
            interfaces: self.interfaces.clone(),
        })
    }
}

impl From<&ZabbixHost> for RawZabbixRecord {
    fn from(host: &ZabbixHost) -> Self {
        Self {
            host: Some(host.name.clone()),
            status: Some(host.status.as_str().to_string()),
            ip: host.ip.clone(),
            interfaces: host.interfaces.clone(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Entry of the missing-hosts report (raw VCenter name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissingHost {
    pub host: String,
    pub ip: Option<String>,
}

/// Entry of the status-mismatch reports (normalized name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MismatchRecord {
    pub host: String,
    pub ip: String,
    pub vmware_status: PowerState,
    pub zabbix_status: ZabbixStatus,
}

/// Status-file entry before validation: only `host` and `vmware_status` are required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMismatchRecord {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub vmware_status: Option<String>,
    #[serde(default)]
    pub zabbix_status: Option<String>,
}

impl RawMismatchRecord {
    /// A missing or unknown `zabbix_status` falls back to the status the mismatch implies
    pub fn validate(&self) -> Result<MismatchRecord, InvalidRecord> {
        let label = non_empty(&self.host).unwrap_or("<unnamed>").to_string();
        let host = non_empty(&self.host).ok_or_else(|| InvalidRecord::missing_field(label.clone(), "host"))?;
        let vmware_status = non_empty(&self.vmware_status)
            .map(PowerState::from)
            .ok_or_else(|| InvalidRecord::missing_field(label.clone(), "vmware_status"))?;
        let zabbix_status = non_empty(&self.zabbix_status)
            .and_then(ZabbixStatus::parse)
            .unwrap_or(match vmware_status {
                PowerState::PoweredOn => ZabbixStatus::Disabled,
                _ => ZabbixStatus::Enabled,
            });
        Ok(MismatchRecord {
            host: host.to_string(),
            ip: non_empty(&self.ip).unwrap_or(IP_PLACEHOLDER).to_string(),
            vmware_status,
            zabbix_status,
        })
    }
}
