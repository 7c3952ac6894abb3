//! 统一错误处理
//!
//! 每个致命失败对应一个 `DeployError` 变体；进程退出码由 `exit_code` 统一映射

use std::path::PathBuf;
use thiserror::Error;

use crate::infra::command::CommandError;

/// 部署流程错误
#[derive(Debug, Error)]
pub enum DeployError {
    /// 非 root 运行
    #[error("must be run as root (try: sudo fbdeploy)")]
    NotRoot,

    /// compose 清单不存在
    #[error("compose manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    /// compose 清单语法无效
    #[error("compose manifest is invalid: {0}")]
    ManifestInvalid(String),

    /// 容器运行时安装失败
    #[error("container runtime installation failed: {0}")]
    InstallFailed(String),

    /// 外部命令返回非零
    #[error("{step} failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        step: String,
        code: Option<i32>,
        stderr: String,
    },

    /// 启动后健康检查失败
    #[error("stack is not healthy: {ready} of {total} containers ready")]
    Unhealthy { ready: usize, total: usize },

    /// 目录布局冲突
    #[error("cannot provision {}: {reason}", .path.display())]
    Layout { path: PathBuf, reason: String },

    /// 下载安装脚本失败
    #[error("failed to fetch install script: {0}")]
    Fetch(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// 构造命令失败错误
    pub fn command_failed(step: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            step: step.into(),
            code,
            stderr: stderr.into().trim().to_string(),
        }
    }

    pub fn layout(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Layout {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// 进程退出码
    ///
    /// 所有致命失败统一退出 1
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// 便捷类型别名
pub type DeployResult<T> = Result<T, DeployError>;
