//! 部署阶段领域模型

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 阶段状态
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StageStatus {
    /// 摘要中使用的图标
    pub fn icon(&self) -> &'static str {
        match self {
            StageStatus::Success => "✓",
            StageStatus::Failed => "✗",
            StageStatus::Skipped => "⊘",
            StageStatus::Running => "⟳",
            StageStatus::Pending => "○",
        }
    }
}

/// 部署阶段信息
#[derive(Clone, Debug, Serialize)]
pub struct DeployStage {
    /// 阶段标识 (e.g., "privilege_check", "stack_launch")
    pub name: String,
    /// 显示名称 (e.g., "Privilege Check", "Stack Launch")
    pub display_name: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// 持续时间（毫秒）
    pub duration_ms: Option<i64>,
    pub status: StageStatus,
    /// 附加信息
    pub message: Option<String>,
}

impl DeployStage {
    /// 创建新的待执行阶段
    pub fn new(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            started_at: None,
            finished_at: None,
            duration_ms: None,
            status: StageStatus::Pending,
            message: None,
        }
    }

    /// 开始执行阶段
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
        self.status = StageStatus::Running;
    }

    /// 完成阶段
    pub fn finish(&mut self, success: bool, message: Option<String>) {
        let now = Utc::now();
        self.finished_at = Some(now);
        self.status = if success {
            StageStatus::Success
        } else {
            StageStatus::Failed
        };
        self.message = message;
        if let Some(started) = self.started_at {
            self.duration_ms = Some((now - started).num_milliseconds());
        }
    }

    /// 跳过阶段
    pub fn skip(&mut self, reason: Option<String>) {
        self.status = StageStatus::Skipped;
        self.message = reason;
    }

    /// 摘要行，如 "✓ Stack Launch (1520ms)"
    pub fn summary_line(&self) -> String {
        let duration = self
            .duration_ms
            .map(|d| format!("{}ms", d))
            .unwrap_or_else(|| "-".to_string());
        match self.message {
            Some(ref msg) => format!(
                "{} {} ({}) {}",
                self.status.icon(),
                self.display_name,
                duration,
                msg
            ),
            None => format!("{} {} ({})", self.status.icon(), self.display_name, duration),
        }
    }
}

/// 全流程阶段，按执行顺序
pub fn pipeline_stages() -> Vec<DeployStage> {
    vec![
        DeployStage::new("privilege_check", "Privilege Check"),
        DeployStage::new("manifest_check", "Manifest Check"),
        DeployStage::new("environment_probe", "Environment Probe"),
        DeployStage::new("dependency_install", "Dependency Install"),
        DeployStage::new("layout_provision", "Layout Provision"),
        DeployStage::new("stack_launch", "Stack Launch"),
        DeployStage::new("health_check", "Health Check"),
    ]
}
