//! 安装脚本下载
//!
//! 通过 HTTPS 从上游获取 Docker 官方安装脚本

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use crate::config::constants::FETCH_TIMEOUT_SECS;
use crate::error::{DeployError, DeployResult};

/// 安装脚本来源
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn fetch(&self, url: &str) -> DeployResult<String>;
}

/// 基于 reqwest 的 HTTP 来源
#[derive(Clone)]
pub struct HttpScriptSource {
    client: Client,
}

impl HttpScriptSource {
    pub fn new() -> DeployResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(concat!("fbdeploy/", env!("CARGO_PKG_VERSION")))
            .https_only(true)
            .build()
            .map_err(|e| DeployError::Fetch(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ScriptSource for HttpScriptSource {
    async fn fetch(&self, url: &str) -> DeployResult<String> {
        info!(url, "Downloading install script");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DeployError::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeployError::Fetch(format!("{} returned HTTP {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DeployError::Fetch(format!("{}: {}", url, e)))?;

        if body.trim().is_empty() {
            return Err(DeployError::Fetch(format!("{} returned an empty script", url)));
        }
        Ok(body)
    }
}
