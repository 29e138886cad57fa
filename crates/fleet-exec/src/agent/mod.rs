//! HTTP client for the per-instance configuration agent.
//!
//! Endpoints: `PUT|DELETE /manifest/<id>`, `POST /apply/<id>`,
//! `GET /fact/<name>`.
use std::time::Duration;

use async_trait::async_trait;
use fleet_core::{agent::ConfigAgent, error::CoreError, error::CoreResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::ExecError,
    http::{Body, HttpClient, HttpResponse, TcpConnector},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            port: 8010,
            timeout_ms: 20_000,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.port == 0 {
            return Err(ExecError::InvalidConfig("agent port must be non-zero".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ExecError::InvalidConfig("agent timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AgentClient {
    port: u16,
    timeout: Duration,
}

impl AgentClient {
    pub fn new(config: &AgentConfig) -> Result<Self, ExecError> {
        config.validate()?;
        Ok(Self {
            port: config.port,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn client(&self, target: &str) -> HttpClient<TcpConnector> {
        HttpClient::new(TcpConnector::new(target, self.port), self.timeout)
    }
}

fn expect(resp: HttpResponse, endpoint: String, ok: &[u16]) -> CoreResult<HttpResponse> {
    if ok.contains(&resp.status) {
        Ok(resp)
    } else {
        Err(CoreError::protocol(endpoint, resp.status, resp.text().trim()))
    }
}

#[async_trait]
impl ConfigAgent for AgentClient {
    async fn apply_manifest(&self, target: &str, manifest_id: &str) -> CoreResult<()> {
        let path = format!("/apply/{manifest_id}");
        debug!(agent = target, manifest = manifest_id, "apply manifest");
        let http = self.client(target);
        let resp = http.post(&path, None).await?;
        // Unlike manifest writes, apply never answers 201.
        expect(resp, format!("{}{path}", http.endpoint()), &[200, 204]).map(drop)
    }

    async fn put_manifest(&self, target: &str, manifest_id: &str, contents: &str) -> CoreResult<()> {
        let path = format!("/manifest/{manifest_id}");
        debug!(agent = target, manifest = manifest_id, "put manifest");
        let http = self.client(target);
        let endpoint = format!("{}{path}", http.endpoint());

        // Replace, never merge: drop any previous version first.
        let resp = http.delete(&path).await?;
        expect(resp, endpoint.clone(), &[200, 201, 204, 404])?;

        let resp = http.put(&path, Body::text(contents)).await?;
        expect(resp, endpoint, &[200, 201, 204]).map(drop)
    }

    async fn get_fact(&self, target: &str, fact: &str) -> CoreResult<String> {
        let path = format!("/fact/{fact}");
        let http = self.client(target);
        let resp = http.get(&path).await?;
        let resp = expect(resp, format!("{}{path}", http.endpoint()), &[200])?;
        let value = resp.text().trim_end().to_string();
        debug!(agent = target, fact, value = %value, "fact");
        Ok(value)
    }
}
