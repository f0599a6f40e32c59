//! Zabbix JSON-RPC client
//!
//! Implements both the inventory source and the mutator port. A client is
//! authenticated once with `connect()`, every call carries the session token
//! in the `auth` field, and `logout()` closes the session.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use vzsync_core::ports::{HostMembership, HostState, ZabbixMutator, ZabbixSource};
use vzsync_core::{RawZabbixRecord, SyncError, SyncResult, ZabbixStatus};

use crate::config::ZabbixConfig;

const SYSTEM: &str = "Zabbix";
const RPC_PATH: &str = "api_jsonrpc.php";

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{} ({}): {}", self.message, self.code, data),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiInterface {
    #[serde(default)]
    ip: String,
}

#[derive(Debug, Deserialize)]
struct ApiGroupRef {
    groupid: String,
}

#[derive(Debug, Deserialize)]
struct ApiHost {
    hostid: String,
    host: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    interfaces: Vec<ApiInterface>,
    #[serde(default)]
    groups: Vec<ApiGroupRef>,
}

#[derive(Debug, Deserialize)]
struct ApiHostGroup {
    groupid: String,
}

/// Snapshot view of a Zabbix host: status code mapped to its name, interface IPs kept
fn to_raw_record(host: ApiHost) -> RawZabbixRecord {
    let status = ZabbixStatus::from_api_code(&host.status)
        .map(|s| s.as_str().to_string())
        .unwrap_or(host.status);
    let interfaces: Vec<String> = host
        .interfaces
        .into_iter()
        .map(|i| i.ip)
        .filter(|ip| !ip.is_empty())
        .collect();
    RawZabbixRecord {
        host: Some(host.host),
        status: Some(status),
        ip: interfaces.first().cloned(),
        interfaces,
    }
}

fn rpc_endpoint(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with(RPC_PATH) {
        trimmed.to_string()
    } else {
        format!("{}/{}", trimmed, RPC_PATH)
    }
}

pub struct ZabbixClient {
    http: Client,
    endpoint: String,
    token: String,
    next_id: AtomicU64,
}

impl ZabbixClient {
    /// Opens an authenticated session
    pub async fn connect(config: &ZabbixConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(config.insecure_tls)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let mut client = Self {
            http,
            endpoint: rpc_endpoint(&config.url),
            token: String::new(),
            next_id: AtomicU64::new(1),
        };
        let token: String = client
            .call(
                "user.login",
                json!({ "username": config.user, "password": config.password }),
            )
            .await?;
        client.token = token;
        info!("Connected to Zabbix API at {}", client.endpoint);
        Ok(client)
    }

    pub async fn logout(self) {
        if let Err(e) = self.call::<Value>("user.logout", json!([])).await {
            warn!("Zabbix logout failed: {}", e);
        }
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> SyncResult<R> {
        let auth = match method {
            "user.login" | "apiinfo.version" => None,
            _ => Some(self.token.as_str()),
        };
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            auth,
        };
        debug!("Zabbix call {} (id {})", method, request.id);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SyncError::api(SYSTEM, method, e))?;
        if !response.status().is_success() {
            return Err(SyncError::api(SYSTEM, method, response.status()));
        }

        let body: RpcResponse = response.json().await.map_err(|e| SyncError::api(SYSTEM, method, e))?;
        if let Some(error) = body.error {
            return Err(SyncError::api(SYSTEM, method, error));
        }
        let result = body
            .result
            .ok_or_else(|| SyncError::api(SYSTEM, method, "response has neither result nor error"))?;
        serde_json::from_value(result).map_err(|e| SyncError::api(SYSTEM, method, e))
    }

    async fn find_host(&self, host: &str, extra: Value) -> SyncResult<Option<ApiHost>> {
        let mut params = json!({
            "output": ["hostid", "host", "status"],
            "filter": { "host": [host] },
        });
        if let (Some(target), Value::Object(fields)) = (params.as_object_mut(), extra) {
            target.extend(fields);
        }
        let hosts: Vec<ApiHost> = self.call("host.get", params).await?;
        Ok(hosts.into_iter().next())
    }

    async fn update_host(&self, params: Value) -> SyncResult<()> {
        let _: Value = self.call("host.update", params).await?;
        Ok(())
    }
}

#[async_trait]
impl ZabbixSource for ZabbixClient {
    async fn fetch_hosts(&self) -> SyncResult<Vec<RawZabbixRecord>> {
        let hosts: Vec<ApiHost> = self
            .call(
                "host.get",
                json!({
                    "output": ["hostid", "host", "status"],
                    "selectInterfaces": ["ip"],
                }),
            )
            .await
            .map_err(|e| SyncError::fetch(SYSTEM, e))?;
        info!("Exported {} hosts from Zabbix", hosts.len());
        Ok(hosts.into_iter().map(to_raw_record).collect())
    }
}

#[async_trait]
impl ZabbixMutator for ZabbixClient {
    async fn group_id(&self, group_name: &str) -> SyncResult<Option<String>> {
        let groups: Vec<ApiHostGroup> = self
            .call(
                "hostgroup.get",
                json!({ "output": ["groupid"], "filter": { "name": [group_name] } }),
            )
            .await?;
        Ok(groups.into_iter().next().map(|g| g.groupid))
    }

    async fn host_membership(&self, host: &str) -> SyncResult<Option<HostMembership>> {
        let found = self.find_host(host, json!({ "selectGroups": ["groupid"] })).await?;
        Ok(found.map(|h| HostMembership {
            host_id: h.hostid,
            group_ids: h.groups.into_iter().map(|g| g.groupid).collect(),
        }))
    }

    async fn host_state(&self, host: &str) -> SyncResult<Option<HostState>> {
        let Some(found) = self.find_host(host, json!({})).await? else {
            return Ok(None);
        };
        let status = ZabbixStatus::from_api_code(&found.status).ok_or_else(|| {
            SyncError::api(SYSTEM, "host.get", format!("unexpected status '{}' for {}", found.status, host))
        })?;
        Ok(Some(HostState {
            host_id: found.hostid,
            status,
        }))
    }

    async fn update_host_groups(&self, host_id: &str, group_ids: &[String]) -> SyncResult<()> {
        let groups: Vec<Value> = group_ids.iter().map(|id| json!({ "groupid": id })).collect();
        self.update_host(json!({ "hostid": host_id, "groups": groups })).await
    }

    async fn set_host_status(&self, host_id: &str, status: ZabbixStatus) -> SyncResult<()> {
        self.update_host(json!({ "hostid": host_id, "status": status.api_code() })).await
    }
}
