//! VCenter inventory export over the vSphere Automation REST API
//!
//! One session per fetch: login, list VMs, resolve each guest IP, logout.
//! Guest identity is only available on powered-on VMs with VMware Tools, so a
//! failed identity lookup just leaves the IP empty.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use vzsync_core::ports::VCenterSource;
use vzsync_core::{RawVmRecord, SyncError, SyncResult};

use crate::config::VCenterConfig;

const SESSION_HEADER: &str = "vmware-api-session-id";
const SYSTEM: &str = "VCenter";

#[derive(Debug, Deserialize)]
struct VmSummary {
    vm: String,
    name: String,
    power_state: String,
}

#[derive(Debug, Deserialize)]
struct GuestIdentity {
    #[serde(default)]
    ip_address: Option<String>,
}

/// Maps REST power states onto the names used in snapshots
fn power_state_label(api_state: &str) -> String {
    match api_state {
        "POWERED_ON" => "poweredOn".to_string(),
        "POWERED_OFF" => "poweredOff".to_string(),
        "SUSPENDED" => "suspended".to_string(),
        other => other.to_string(),
    }
}

pub struct VCenterClient {
    http: Client,
    base_url: String,
    user: String,
    password: String,
}

impl VCenterClient {
    pub fn new(config: &VCenterConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(config.insecure_tls)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url(&config.host),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    async fn login(&self) -> SyncResult<String> {
        let response = self
            .http
            .post(format!("{}/api/session", self.base_url))
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(|e| SyncError::api(SYSTEM, "session.create", e))?;

        if !response.status().is_success() {
            return Err(SyncError::api(SYSTEM, "session.create", response.status()));
        }
        let token: String = response
            .json()
            .await
            .map_err(|e| SyncError::api(SYSTEM, "session.create", e))?;
        debug!("VCenter session opened on {}", self.base_url);
        Ok(token)
    }

    async fn logout(&self, token: &str) {
        let result = self
            .http
            .delete(format!("{}/api/session", self.base_url))
            .header(SESSION_HEADER, token)
            .send()
            .await;
        if let Err(e) = result {
            warn!("VCenter logout failed: {}", e);
        }
    }

    async fn list_vms(&self, token: &str) -> SyncResult<Vec<VmSummary>> {
        let response = self
            .http
            .get(format!("{}/api/vcenter/vm", self.base_url))
            .header(SESSION_HEADER, token)
            .send()
            .await
            .map_err(|e| SyncError::api(SYSTEM, "vm.list", e))?;

        if !response.status().is_success() {
            return Err(SyncError::api(SYSTEM, "vm.list", response.status()));
        }
        response.json().await.map_err(|e| SyncError::api(SYSTEM, "vm.list", e))
    }

    async fn guest_ip(&self, token: &str, vm_id: &str) -> Option<String> {
        let response = self
            .http
            .get(format!("{}/api/vcenter/vm/{}/guest/identity", self.base_url, vm_id))
            .header(SESSION_HEADER, token)
            .send()
            .await
            .ok()?;

        match response.status() {
            status if status.is_success() => {
                let identity: GuestIdentity = response.json().await.ok()?;
                identity.ip_address.filter(|ip| !ip.is_empty())
            }
            // Tools not running or VM powered off
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::NOT_FOUND => None,
            status => {
                debug!("Guest identity for {} returned {}", vm_id, status);
                None
            }
        }
    }

    async fn collect(&self, token: &str) -> SyncResult<Vec<RawVmRecord>> {
        let vms = self.list_vms(token).await?;
        let mut records = Vec::with_capacity(vms.len());
        for vm in vms {
            let ip = if vm.power_state == "POWERED_ON" {
                self.guest_ip(token, &vm.vm).await
            } else {
                None
            };
            records.push(RawVmRecord {
                host: Some(vm.name),
                status: Some(power_state_label(&vm.power_state)),
                ip,
            });
        }
        Ok(records)
    }
}

fn base_url(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[async_trait]
impl VCenterSource for VCenterClient {
    async fn fetch_vms(&self) -> SyncResult<Vec<RawVmRecord>> {
        let token = self.login().await.map_err(|e| SyncError::fetch(SYSTEM, e))?;
        let result = self.collect(&token).await;
        self.logout(&token).await;

        let records = result.map_err(|e| SyncError::fetch(SYSTEM, e))?;
        info!("Exported {} VMs from {}", records.len(), self.base_url);
        Ok(records)
    }
}
