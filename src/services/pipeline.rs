//! Deployment pipeline.
//!
//! privilege → manifest → probe → install → layout → launch → health.
//! Runs once, strictly forward. The first failure stops the run and leaves
//! whatever was already created in place.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::config::StackConfig;
use crate::domain::container::ContainerStatus;
use crate::domain::layout::LayoutReport;
use crate::domain::stage::{pipeline_stages, DeployStage, StageStatus};
use crate::domain::system::{HostSnapshot, ResourceWarning};
use crate::error::{DeployError, DeployResult};
use crate::infra::command::Runner;
use crate::infra::fetch::ScriptSource;

use super::health;
use super::installer::{self, InstallAction};
use super::launcher::{self, Readiness};
use super::layout;
use super::output::Console;
use super::probe::{self, HostInspector};

/// External collaborators of a run
pub struct Pipeline<'a> {
    pub runner: &'a dyn Runner,
    pub scripts: &'a dyn ScriptSource,
    pub inspector: &'a dyn HostInspector,
    /// effective uid is 0
    pub is_root: bool,
}

/// Everything a successful run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stages: Vec<DeployStage>,
    pub host: HostSnapshot,
    pub warnings: Vec<ResourceWarning>,
    pub install: InstallAction,
    pub install_issues: Vec<String>,
    pub layout: LayoutReport,
    pub readiness: Readiness,
    pub containers: Vec<ContainerStatus>,
    pub access_url: String,
}

impl RunReport {
    /// Write the report as pretty JSON (temp file, then rename)
    pub fn write_json(&self, path: &Path) -> DeployResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;
        info!(path = %path.display(), "Run report written");
        Ok(())
    }
}

/// 阶段进度跟踪，失败时输出阶段摘要
struct StageTracker<'c> {
    stages: Vec<DeployStage>,
    current: usize,
    console: &'c Console,
}

impl<'c> StageTracker<'c> {
    fn new(console: &'c Console) -> Self {
        Self {
            stages: pipeline_stages(),
            current: 0,
            console,
        }
    }

    fn begin(&mut self, name: &str) {
        if let Some(idx) = self.stages.iter().position(|s| s.name == name) {
            self.current = idx;
            self.stages[idx].start();
            self.console.blank();
            self.console
                .step(idx + 1, self.stages.len(), &self.stages[idx].display_name);
        }
    }

    fn succeed(&mut self, message: Option<String>) {
        self.stages[self.current].finish(true, message);
    }

    fn skip(&mut self, reason: &str) {
        self.stages[self.current].skip(Some(reason.to_string()));
    }

    /// Mark the current stage failed on error and print the summary
    fn check<T>(&mut self, result: DeployResult<T>) -> DeployResult<T> {
        if let Err(ref e) = result {
            error!(stage = %self.stages[self.current].name, error = %e, "Stage failed");
            self.stages[self.current].finish(false, Some(e.to_string()));
            self.print_summary();
        }
        result
    }

    fn print_summary(&self) {
        self.console.blank();
        self.console.header("Stage Summary");
        for stage in &self.stages {
            let line = stage.summary_line();
            match stage.status {
                StageStatus::Success => self.console.success(&line),
                StageStatus::Failed => self.console.error(&line),
                _ => self.console.plain(&line),
            }
        }
    }
}

impl<'a> Pipeline<'a> {
    pub async fn run(&self, config: &StackConfig, console: &Console) -> DeployResult<RunReport> {
        let mut tracker = StageTracker::new(console);
        console.header("FileBrowser + Caddy deployment");
        info!(base_dir = %config.base_dir.display(), hostname = %config.hostname, "Deployment started");

        tracker.begin("privilege_check");
        tracker.check(if self.is_root {
            Ok(())
        } else {
            Err(DeployError::NotRoot)
        })?;
        tracker.succeed(None);

        // checked before anything reaches the network
        tracker.begin("manifest_check");
        let manifest = tracker.check(launcher::require_manifest(config))?;
        console.success(&format!("Found {}", manifest.display()));
        tracker.succeed(None);

        tracker.begin("environment_probe");
        let (host, warnings) = probe::probe_environment(self.inspector, config, console);
        tracker.succeed((!warnings.is_empty()).then(|| format!("{} warning(s)", warnings.len())));

        tracker.begin("dependency_install");
        let runtime = tracker.check(
            installer::ensure_runtime(self.runner, self.scripts, config, console).await,
        )?;
        let mut notes: Vec<String> = match runtime.action {
            InstallAction::AlreadyPresent => Vec::new(),
            InstallAction::StartedDaemon => vec!["started docker".to_string()],
            InstallAction::Installed => vec!["installed docker".to_string()],
        };
        notes.extend(runtime.service_issues.iter().cloned());
        if config.skip_install && runtime.action == InstallAction::AlreadyPresent {
            tracker.skip("--skip-install, existing runtime verified");
        } else {
            tracker.succeed((!notes.is_empty()).then(|| notes.join("; ")));
        }

        tracker.begin("layout_provision");
        let layout = tracker.check(layout::provision_layout(config, console))?;
        tracker.succeed(Some(format!("{} created", layout.created_count())));

        tracker.begin("stack_launch");
        let launch = tracker.check(
            launcher::launch_stack(self.runner, runtime.flavor, config, console).await,
        )?;
        tracker.succeed(None);

        tracker.begin("health_check");
        let containers = tracker.check(
            health::check_health(self.runner, &launch.compose, config, console).await,
        )?;
        tracker.succeed(None);

        tracker.print_summary();
        health::print_summary(config, &launch.compose, console);

        info!(containers = containers.len(), "Deployment finished");
        Ok(RunReport {
            stages: tracker.stages,
            host,
            warnings,
            install: runtime.action,
            install_issues: runtime.service_issues,
            layout,
            readiness: launch.readiness,
            containers,
            access_url: config.access_url(),
        })
    }
}
