//! Dependency installer.
//!
//! Makes sure Docker Engine (major >= 20), a compose tool and a running
//! daemon are available. Installs from the upstream convenience script only
//! when something is missing; a healthy installation is left alone.

use std::io::Write;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::constants::MIN_DOCKER_MAJOR;
use crate::config::StackConfig;
use crate::error::{DeployError, DeployResult};
use crate::infra::command::{CommandSpec, Runner};
use crate::infra::compose::ComposeFlavor;
use crate::infra::fetch::ScriptSource;

use super::output::Console;

/// Parsed `docker --version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DockerVersion {
    pub major: u32,
    pub minor: u32,
}

impl DockerVersion {
    /// Parse e.g. `Docker version 24.0.7, build afdd53b`
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix("Docker version ")?;
        let version = rest.split(|c: char| c == ',' || c.is_whitespace()).next()?;
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts
            .next()
            .and_then(|m| m.chars().take_while(char::is_ascii_digit).collect::<String>().parse().ok())
            .unwrap_or(0);
        Some(Self { major, minor })
    }

    pub fn is_supported(&self) -> bool {
        self.major >= MIN_DOCKER_MAJOR
    }
}

impl std::fmt::Display for DockerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What the probes found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatus {
    pub docker: Option<DockerVersion>,
    pub daemon_active: bool,
    pub compose: Option<ComposeFlavor>,
}

impl RuntimeStatus {
    pub fn is_usable(&self) -> bool {
        self.docker.map(|v| v.is_supported()).unwrap_or(false)
            && self.daemon_active
            && self.compose.is_some()
    }

    /// Installed and recent enough, only the daemon is down
    fn needs_daemon_only(&self) -> bool {
        self.docker.map(|v| v.is_supported()).unwrap_or(false)
            && self.compose.is_some()
            && !self.daemon_active
    }

    pub fn describe(&self) -> String {
        let mut problems = Vec::new();
        match self.docker {
            None => problems.push("docker not found".to_string()),
            Some(v) if !v.is_supported() => problems.push(format!(
                "docker {} is older than {}.0",
                v, MIN_DOCKER_MAJOR
            )),
            Some(_) => {}
        }
        if self.docker.is_some() && !self.daemon_active {
            problems.push("docker daemon is not running".to_string());
        }
        if self.compose.is_none() {
            problems.push("compose tool not found".to_string());
        }
        if problems.is_empty() {
            "runtime ready".to_string()
        } else {
            problems.join(", ")
        }
    }
}

/// What `ensure_runtime` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallAction {
    AlreadyPresent,
    StartedDaemon,
    Installed,
}

/// A usable runtime and how it was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeReady {
    pub flavor: ComposeFlavor,
    pub action: InstallAction,
    /// Service steps that failed while the runtime still came up,
    /// e.g. docker will not start at boot
    pub service_issues: Vec<String>,
}

/// Probe docker, the daemon and the compose tool
pub async fn probe_runtime(runner: &dyn Runner, timeout: Duration) -> RuntimeStatus {
    let docker = match runner
        .run(&CommandSpec::new("docker", ["--version"]).timeout(timeout))
        .await
    {
        Ok(output) if output.success() => DockerVersion::parse(&output.stdout),
        Ok(_) => None,
        Err(e) => {
            if !e.is_not_found() {
                warn!(error = %e, "docker --version failed");
            }
            None
        }
    };

    let daemon_active = if docker.is_some() {
        runner
            .run(
                &CommandSpec::new("docker", ["info", "--format", "{{.ServerVersion}}"])
                    .timeout(timeout),
            )
            .await
            .map(|o| o.success())
            .unwrap_or(false)
    } else {
        false
    };

    let compose = if docker.is_some() {
        ComposeFlavor::detect(runner, timeout).await
    } else {
        None
    };

    RuntimeStatus {
        docker,
        daemon_active,
        compose,
    }
}

/// Start the docker service now and at boot; returns the steps that failed
async fn start_service(runner: &dyn Runner, console: &Console, timeout: Duration) -> Vec<String> {
    let mut failed = Vec::new();
    for action in ["start", "enable"] {
        let spec = CommandSpec::new("systemctl", [action, "docker"]).timeout(timeout);
        match runner.run(&spec).await {
            Ok(output) if output.success() => {
                info!(action, "systemctl docker");
            }
            Ok(output) => {
                warn!(action, code = ?output.code, stderr = %output.stderr.trim(), "systemctl docker failed");
                console.warn(&format!("systemctl {} docker failed: {}", action, output.stderr.trim()));
                failed.push(format!("systemctl {} docker failed", action));
            }
            Err(e) => {
                warn!(action, error = %e, "systemctl unavailable");
                console.warn(&format!("systemctl {} docker failed: {}", action, e));
                failed.push(format!("systemctl {} docker failed", action));
            }
        }
    }
    failed
}

/// Download the upstream script and run it with `sh`
async fn install_from_upstream(
    runner: &dyn Runner,
    source: &dyn ScriptSource,
    config: &StackConfig,
    console: &Console,
) -> DeployResult<()> {
    console.info(&format!("Downloading Docker install script from {}", config.install_url));
    let script = source.fetch(&config.install_url).await?;

    let mut file = tempfile::Builder::new()
        .prefix("fbdeploy-install-docker")
        .suffix(".sh")
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;

    console.info("Running Docker install script (this may take a few minutes)");
    let path = file.path().to_string_lossy().to_string();
    let output = runner.run(&CommandSpec::new("sh", [path]).echo()).await?;
    if !output.success() {
        return Err(DeployError::InstallFailed(format!(
            "install script exited with {:?}: {}",
            output.code,
            output.stderr.trim()
        )));
    }
    Ok(())
}

/// Ensure a usable container runtime and pick the compose flavor to use
pub async fn ensure_runtime(
    runner: &dyn Runner,
    source: &dyn ScriptSource,
    config: &StackConfig,
    console: &Console,
) -> DeployResult<RuntimeReady> {
    let status = probe_runtime(runner, config.probe_timeout).await;

    if let (true, Some(version), Some(flavor)) = (status.is_usable(), status.docker, status.compose)
    {
        console.success(&format!(
            "Docker {} and {} already installed",
            version,
            flavor.display()
        ));
        return Ok(RuntimeReady {
            flavor,
            action: InstallAction::AlreadyPresent,
            service_issues: Vec::new(),
        });
    }

    console.warn(&format!("Container runtime not ready: {}", status.describe()));

    if config.skip_install {
        return Err(DeployError::InstallFailed(format!(
            "{} (installation skipped by --skip-install)",
            status.describe()
        )));
    }

    let (action, service_issues) = if status.needs_daemon_only() {
        console.info("Starting the docker service");
        let issues = start_service(runner, console, config.probe_timeout).await;
        (InstallAction::StartedDaemon, issues)
    } else {
        install_from_upstream(runner, source, config, console).await?;
        let issues = start_service(runner, console, config.probe_timeout).await;
        (InstallAction::Installed, issues)
    };

    let after = probe_runtime(runner, config.probe_timeout).await;
    match (after.is_usable(), after.docker, after.compose) {
        (true, Some(version), Some(flavor)) => {
            info!(?action, version = %version, issues = service_issues.len(), "Container runtime ready");
            console.success(&format!(
                "Docker {} and {} ready",
                version,
                flavor.display()
            ));
            Ok(RuntimeReady {
                flavor,
                action,
                service_issues,
            })
        }
        _ => Err(DeployError::InstallFailed(after.describe())),
    }
}
