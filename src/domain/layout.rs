//! 目录布局领域模型

use serde::Serialize;
use std::path::PathBuf;

/// 单个条目的置备结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedEntry {
    pub path: PathBuf,
    pub outcome: ProvisionOutcome,
}

/// 一次置备的全部结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutReport {
    pub directories: Vec<ProvisionedEntry>,
    pub proxy_config: Option<ProvisionedEntry>,
}

impl LayoutReport {
    /// 本次新建的条目数量
    pub fn created_count(&self) -> usize {
        self.directories
            .iter()
            .chain(self.proxy_config.iter())
            .filter(|e| e.outcome == ProvisionOutcome::Created)
            .count()
    }
}
