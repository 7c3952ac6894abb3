//! Docker Compose CLI wrapper
//!
//! Every compose call goes through here so the flavor (plugin vs standalone)
//! and the `-f <manifest>` argument are applied consistently.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::constants::MIN_COMPOSE_MAJOR;
use crate::domain::container::{parse_ps_output, ContainerStatus};
use crate::error::{DeployError, DeployResult};

use super::command::{CommandOutput, CommandSpec, Runner};

/// Which compose binary is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `docker compose` (v2 plugin)
    Plugin,
    /// `docker-compose` (standalone binary)
    Standalone,
}

impl ComposeFlavor {
    fn program(&self) -> &'static str {
        match self {
            ComposeFlavor::Plugin => "docker",
            ComposeFlavor::Standalone => "docker-compose",
        }
    }

    fn base_args(&self) -> &'static [&'static str] {
        match self {
            ComposeFlavor::Plugin => &["compose"],
            ComposeFlavor::Standalone => &[],
        }
    }

    /// Shell form used in operator hints
    pub fn display(&self) -> &'static str {
        match self {
            ComposeFlavor::Plugin => "docker compose",
            ComposeFlavor::Standalone => "docker-compose",
        }
    }

    /// Detect which compose command to use (prefer the plugin)
    pub async fn detect(runner: &dyn Runner, timeout: Duration) -> Option<ComposeFlavor> {
        for flavor in [ComposeFlavor::Plugin, ComposeFlavor::Standalone] {
            let mut args: Vec<&str> = flavor.base_args().to_vec();
            args.push("version");
            let spec = CommandSpec::new(flavor.program(), args).timeout(timeout);
            match runner.run(&spec).await {
                Ok(output) if output.success() => match parse_compose_major(&output.stdout) {
                    Some(major) if major >= MIN_COMPOSE_MAJOR => {
                        info!(flavor = flavor.display(), major, "Compose tool detected");
                        return Some(flavor);
                    }
                    // v1 has no `ps --format json`
                    found => warn!(
                        flavor = flavor.display(),
                        major = ?found,
                        output = %output.stdout.trim(),
                        "Compose tool too old, ignoring"
                    ),
                },
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(error = %e, flavor = flavor.display(), "Compose probe failed"),
            }
        }
        None
    }
}

/// Major version from `docker compose version` / `docker-compose version`
///
/// Accepts `Docker Compose version v2.21.0` and
/// `docker-compose version 1.29.2, build 5becea4c`.
pub fn parse_compose_major(raw: &str) -> Option<u32> {
    let line = raw.lines().next()?;
    let (_, rest) = line.split_once("version")?;
    let token = rest
        .trim_start()
        .split(|c: char| c == ',' || c.is_whitespace())
        .next()?;
    token.trim_start_matches('v').split('.').next()?.parse().ok()
}

/// Compose commands bound to one manifest
#[derive(Debug, Clone)]
pub struct ComposeCli {
    flavor: ComposeFlavor,
    manifest: PathBuf,
    work_dir: PathBuf,
}

impl ComposeCli {
    pub fn new(flavor: ComposeFlavor, manifest: &Path) -> Self {
        let work_dir = manifest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            flavor,
            manifest: manifest.to_path_buf(),
            work_dir,
        }
    }

    /// Build a compose command with `-f <manifest>` applied
    pub fn spec(&self, args: &[&str]) -> CommandSpec {
        let mut full: Vec<String> = self
            .flavor
            .base_args()
            .iter()
            .map(|s| s.to_string())
            .collect();
        full.push("-f".to_string());
        full.push(self.manifest.to_string_lossy().to_string());
        full.extend(args.iter().map(|s| s.to_string()));
        CommandSpec::new(self.flavor.program(), full).work_dir(&self.work_dir)
    }

    /// Operator-facing command line, e.g. `docker compose -f /srv/docker-compose.yml logs -f`
    pub fn hint(&self, args: &str) -> String {
        format!(
            "{} -f {} {}",
            self.flavor.display(),
            self.manifest.display(),
            args
        )
    }

    async fn run_checked(
        &self,
        runner: &dyn Runner,
        step: &str,
        spec: CommandSpec,
    ) -> DeployResult<CommandOutput> {
        let output = runner.run(&spec).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(DeployError::command_failed(step, output.code, output.stderr))
        }
    }

    /// `config -q`: syntax check by the compose tool itself
    pub async fn validate(&self, runner: &dyn Runner, timeout: Duration) -> DeployResult<()> {
        let output = runner.run(&self.spec(&["config", "-q"]).timeout(timeout)).await?;
        if output.success() {
            Ok(())
        } else {
            let details = if output.stderr.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                output.stderr.trim().to_string()
            };
            Err(DeployError::ManifestInvalid(details))
        }
    }

    pub async fn pull(&self, runner: &dyn Runner) -> DeployResult<()> {
        self.run_checked(runner, "compose pull", self.spec(&["pull"]).echo())
            .await
            .map(|_| ())
    }

    pub async fn up_detached(&self, runner: &dyn Runner) -> DeployResult<()> {
        self.run_checked(runner, "compose up", self.spec(&["up", "-d"]).echo())
            .await
            .map(|_| ())
    }

    /// Container status as reported by the runtime
    pub async fn ps(
        &self,
        runner: &dyn Runner,
        timeout: Duration,
    ) -> DeployResult<Vec<ContainerStatus>> {
        let output = self
            .run_checked(
                runner,
                "compose ps",
                self.spec(&["ps", "--all", "--format", "json"]).timeout(timeout),
            )
            .await?;
        parse_ps_output(&output.stdout).map_err(|e| {
            DeployError::command_failed("compose ps", output.code, format!("unreadable output: {}", e))
        })
    }

    /// Human-readable `ps` table
    pub async fn ps_table(&self, runner: &dyn Runner, timeout: Duration) -> DeployResult<String> {
        self.run_checked(runner, "compose ps", self.spec(&["ps"]).timeout(timeout))
            .await
            .map(|o| o.stdout)
    }

    /// Last `lines` log lines of every service
    pub async fn logs_tail(
        &self,
        runner: &dyn Runner,
        lines: usize,
        timeout: Duration,
    ) -> DeployResult<String> {
        let tail = format!("--tail={}", lines);
        let output = runner
            .run(&self.spec(&["logs", "--no-color", tail.as_str()]).timeout(timeout))
            .await?;
        // docker logs 输出可能同时在 stdout 和 stderr
        let mut combined = output.stdout;
        if !output.stderr.trim().is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&output.stderr);
        }
        Ok(combined)
    }
}
