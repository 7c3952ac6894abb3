//! 命令执行器
//!
//! 提供统一的命令执行接口，支持：
//! - 超时控制
//! - 实时回显 stdout/stderr（长时间运行的 pull/up/安装脚本）
//! - 通过 `Runner` trait 替换为测试桩

use async_trait::async_trait;
use colored::Colorize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error};

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败（通常是程序不存在）
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },
    /// 命令超时
    Timeout { command: String, after: Duration },
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl CommandError {
    /// 程序是否不存在
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CommandError::SpawnFailed { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed { program, source } => {
                write!(f, "Failed to spawn {}: {}", program, source)
            }
            CommandError::Timeout { command, after } => {
                write!(f, "`{}` timed out after {:?}", command, after)
            }
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed { source, .. } => Some(source),
            CommandError::WaitFailed(e) => Some(e),
            CommandError::Timeout { .. } => None,
        }
    }
}

/// 待执行的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// 工作目录
    pub work_dir: Option<PathBuf>,
    /// 超时时间，None 表示不限
    pub timeout: Option<Duration>,
    /// 是否实时回显输出
    pub echo: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            work_dir: None,
            timeout: None,
            echo: false,
        }
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// 完整命令行（用于日志与测试匹配）
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// 退出码（被信号终止时为 None）
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// 命令执行接口
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// 基于 tokio::process 的真实执行器
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn build(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).kill_on_drop(true);
        if let Some(ref dir) = spec.work_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// 执行简单命令（无回显）
    async fn run_captured(spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut cmd = Self::build(spec);
        cmd.stdin(Stdio::null());
        let child = cmd.output();

        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| CommandError::Timeout {
                    command: spec.command_line(),
                    after: limit,
                })?,
            None => child.await,
        }
        .map_err(|source| CommandError::SpawnFailed {
            program: spec.program.clone(),
            source,
        })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// 执行命令并实时回显输出
    async fn run_echoed(spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut child = Self::build(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::SpawnFailed {
                program: spec.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // stdout 读取任务
        let stdout_task = tokio::spawn(async move {
            let mut collected = String::new();
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    println!("    {}", line.dimmed());
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            collected
        });

        // stderr 读取任务（compose 的进度信息走 stderr）
        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    println!("    {}", line.dimmed());
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            collected
        });

        let status = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status.map_err(CommandError::WaitFailed)?,
                Err(_) => {
                    error!(command = %spec.command_line(), "Command timed out after {:?}", limit);
                    let _ = child.kill().await;
                    return Err(CommandError::Timeout {
                        command: spec.command_line(),
                        after: limit,
                    });
                }
            },
            None => child.wait().await.map_err(CommandError::WaitFailed)?,
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

#[async_trait]
impl Runner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        debug!(command = %spec.command_line(), "Running command");
        let output = if spec.echo {
            Self::run_echoed(spec).await?
        } else {
            Self::run_captured(spec).await?
        };
        debug!(command = %spec.command_line(), code = ?output.code, "Command finished");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_rendering() {
        let spec = CommandSpec::new("docker", ["compose", "-f", "stack.yml", "up", "-d"]);
        assert_eq!(spec.command_line(), "docker compose -f stack.yml up -d");
        assert_eq!(CommandSpec::new("docker", Vec::<String>::new()).command_line(), "docker");
    }

    #[tokio::test]
    async fn test_run_simple_success() {
        let spec = CommandSpec::new("echo", ["hello"])
            .work_dir("/tmp")
            .timeout(Duration::from_secs(5));
        let output = SystemRunner::new().run(&spec).await.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_run_echoed_collects_output() {
        let spec = CommandSpec::new("sh", ["-c", "echo out; echo err 1>&2; exit 3"]).echo();
        let output = SystemRunner::new().run(&spec).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert!(output.stdout.contains("out"));
        assert!(output.stderr.contains("err"));
    }

    #[tokio::test]
    async fn test_run_simple_not_found() {
        let spec = CommandSpec::new("nonexistent_command_12345", Vec::<String>::new());
        let err = SystemRunner::new().run(&spec).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let spec = CommandSpec::new("sleep", ["5"]).timeout(Duration::from_millis(100));
        let err = SystemRunner::new().run(&spec).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }
}
