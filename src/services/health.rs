//! Health reporter.
//!
//! A container counts as ready when it is running and its health is either
//! `healthy` or not declared at all. The stack passes when at least one
//! container is ready; otherwise the recent logs are printed and the run fails.

use tracing::{error, info, warn};

use crate::config::StackConfig;
use crate::domain::container::{ContainerStatus, Health};
use crate::error::{DeployError, DeployResult};
use crate::infra::command::Runner;
use crate::infra::compose::ComposeCli;

use super::output::Console;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    pub ready: usize,
    pub total: usize,
    pub not_ready: Vec<ContainerStatus>,
}

impl HealthVerdict {
    pub fn evaluate(containers: &[ContainerStatus]) -> Self {
        let not_ready: Vec<ContainerStatus> = containers
            .iter()
            .filter(|c| !c.is_ready())
            .cloned()
            .collect();
        Self {
            ready: containers.len() - not_ready.len(),
            total: containers.len(),
            not_ready,
        }
    }

    pub fn passed(&self) -> bool {
        self.ready > 0
    }
}

fn describe(c: &ContainerStatus) -> String {
    let name = if c.service.is_empty() { &c.name } else { &c.service };
    let status = if c.status.is_empty() { &c.state } else { &c.status };
    format!("{}: {}", name, status)
}

/// Query status, print it, and fail with a log tail when nothing is ready
pub async fn check_health(
    runner: &dyn Runner,
    compose: &ComposeCli,
    config: &StackConfig,
    console: &Console,
) -> DeployResult<Vec<ContainerStatus>> {
    let containers = compose.ps(runner, config.probe_timeout).await?;
    let verdict = HealthVerdict::evaluate(&containers);

    for c in &containers {
        if c.is_ready() {
            console.success(&describe(c));
        } else {
            console.warn(&describe(c));
        }
    }

    if !verdict.passed() {
        error!(total = verdict.total, "No container is up");
        console.error("No container reports a healthy/up state");
        console.plain(&format!("Container logs (last {} lines):", config.log_tail));
        match compose
            .logs_tail(runner, config.log_tail, config.probe_timeout)
            .await
        {
            Ok(logs) if logs.trim().is_empty() => console.block("(no log output)"),
            Ok(logs) => console.block(&logs),
            Err(e) => console.warn(&format!("Could not read logs: {}", e)),
        }
        return Err(DeployError::Unhealthy {
            ready: verdict.ready,
            total: verdict.total,
        });
    }

    for c in &verdict.not_ready {
        let reason = match c.health {
            Health::Unhealthy => "reports unhealthy",
            Health::Starting => "healthcheck still starting",
            _ => "is not running",
        };
        warn!(container = %c.name, reason, "Container not ready");
    }

    info!(ready = verdict.ready, total = verdict.total, "Health check passed");
    Ok(containers)
}

/// Operator summary printed after a successful run
pub fn print_summary(config: &StackConfig, compose: &ComposeCli, console: &Console) {
    console.blank();
    console.header("Deployment Complete");
    console.success(&format!("Access URL: {}", config.access_url()));
    for extra in config.hostnames().iter().skip(1) {
        console.plain(&format!("  also served at https://{}", extra));
    }
    console.plain(&format!(
        "  DNS for {} must point at this host; Caddy obtains the certificate on first request.",
        config.hostname
    ));
    console.plain(&format!(
        "  Initial admin credentials are printed by: {}",
        compose.hint(&format!("logs {}", config.app_service))
    ));
    console.blank();
    console.plain("Management:");
    console.plain(&format!("  logs:     {}", compose.hint("logs -f")));
    console.plain(&format!("  status:   {}", compose.hint("ps")));
    console.plain(&format!("  restart:  {}", compose.hint("restart")));
    console.plain(&format!("  stop:     {}", compose.hint("down")));
    console.plain(&format!(
        "  update:   {} && {}",
        compose.hint("pull"),
        compose.hint("up -d")
    ));
    console.plain(&format!(
        "  proxy:    edit {} then {}",
        config.caddyfile_path().display(),
        compose.hint("restart caddy")
    ));
}
