//! Stack launcher.
//!
//! validate -> pull -> up -d -> wait for readiness -> print status.
//! Any failing compose command aborts the run; nothing is retried or rolled back.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::StackConfig;
use crate::domain::container::{ContainerStatus, Health};
use crate::domain::manifest::ManifestSummary;
use crate::error::{DeployError, DeployResult};
use crate::infra::command::Runner;
use crate::infra::compose::{ComposeCli, ComposeFlavor};

use super::output::Console;

/// How the launcher waited for the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// No healthcheck declared: blind delay
    FixedDelay(Duration),
    /// Every healthcheck reached a verdict, or one turned unhealthy
    Settled { waited: Duration, unhealthy: usize },
    /// Some healthchecks were still starting at the deadline
    TimedOut(Duration),
}

/// Result of a successful launch
#[derive(Debug, Clone)]
pub struct Launch {
    pub compose: ComposeCli,
    pub manifest: ManifestSummary,
    pub readiness: Readiness,
}

/// The manifest must exist before anything touches the network
pub fn require_manifest(config: &StackConfig) -> DeployResult<PathBuf> {
    let path = config.manifest_path();
    if path.is_file() {
        Ok(path)
    } else {
        Err(DeployError::ManifestMissing(path))
    }
}

/// Poll `ps` until no healthcheck is still starting or one reports unhealthy,
/// bounded by `ready_timeout`
pub async fn wait_for_healthchecks(
    runner: &dyn Runner,
    compose: &ComposeCli,
    config: &StackConfig,
    console: &Console,
) -> DeployResult<Readiness> {
    let started = Instant::now();
    let mut announced = false;

    loop {
        let containers = compose.ps(runner, config.probe_timeout).await?;
        let starting: Vec<&ContainerStatus> =
            containers.iter().filter(|c| c.is_settling()).collect();
        let unhealthy = containers
            .iter()
            .filter(|c| c.health == Health::Unhealthy)
            .count();

        // one unhealthy container already decides the outcome
        if starting.is_empty() || unhealthy > 0 {
            let waited = started.elapsed();
            info!(?waited, unhealthy, "Healthchecks settled");
            return Ok(Readiness::Settled { waited, unhealthy });
        }

        let waited = started.elapsed();
        if waited >= config.ready_timeout {
            warn!(?waited, starting = starting.len(), "Readiness wait timed out");
            return Ok(Readiness::TimedOut(waited));
        }

        if !announced {
            let names: Vec<&str> = starting.iter().map(|c| c.name.as_str()).collect();
            console.info(&format!(
                "Waiting up to {}s for healthchecks: {}",
                config.ready_timeout.as_secs(),
                names.join(", ")
            ));
            announced = true;
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}

/// Validate, pull, start and wait
pub async fn launch_stack(
    runner: &dyn Runner,
    flavor: ComposeFlavor,
    config: &StackConfig,
    console: &Console,
) -> DeployResult<Launch> {
    let manifest_path = require_manifest(config)?;
    let compose = ComposeCli::new(flavor, &manifest_path);

    console.info(&format!("Validating {}", manifest_path.display()));
    compose.validate(runner, config.probe_timeout).await?;

    let manifest = match ManifestSummary::load(&manifest_path) {
        Ok(summary) => summary,
        Err(e) => {
            // compose accepted it, so only the readiness strategy is affected
            warn!(error = %e, "Could not read manifest services; using fixed wait");
            ManifestSummary::default()
        }
    };
    if !manifest.services.is_empty() {
        console.info(&format!("Services: {}", manifest.service_names().join(", ")));
    }

    console.info("Pulling images");
    compose.pull(runner).await?;

    console.info("Starting services (detached)");
    compose.up_detached(runner).await?;

    let readiness = if manifest.declares_healthchecks() {
        wait_for_healthchecks(runner, &compose, config, console).await?
    } else {
        console.info(&format!(
            "No healthchecks declared; waiting {}s for services to initialize",
            config.settle_wait.as_secs()
        ));
        tokio::time::sleep(config.settle_wait).await;
        Readiness::FixedDelay(config.settle_wait)
    };

    match readiness {
        Readiness::TimedOut(waited) => console.warn(&format!(
            "Healthchecks still starting after {}s",
            waited.as_secs()
        )),
        Readiness::Settled { unhealthy, .. } if unhealthy > 0 => {
            console.warn(&format!("{} container(s) report unhealthy", unhealthy))
        }
        _ => {}
    }

    let table = compose.ps_table(runner, config.probe_timeout).await?;
    console.block(&table);

    info!(?readiness, "Stack launched");
    Ok(Launch {
        compose,
        manifest,
        readiness,
    })
}
