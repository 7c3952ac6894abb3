//! fbdeploy - FileBrowser + Caddy 一键部署
//!
//! Usage:
//! - Default: `sudo fbdeploy` (uses ./docker-compose.yml)
//! - Custom host: `sudo fbdeploy --hostname files.example.org`
//! - Existing Docker only: `sudo fbdeploy --skip-install`
//! - Keep a record: `sudo fbdeploy --report /var/log/fbdeploy.json`

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use fbdeploy::cli::Cli;
use fbdeploy::infra::{privilege, HttpScriptSource, SystemRunner};
use fbdeploy::services::{Console, Pipeline, SysinfoInspector};
use fbdeploy::{DeployError, StackConfig};

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(config: StackConfig, console: &Console) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    rt.block_on(async {
        let runner = SystemRunner::new();
        let scripts = HttpScriptSource::new()?;
        let inspector = SysinfoInspector;
        let pipeline = Pipeline {
            runner: &runner,
            scripts: &scripts,
            inspector: &inspector,
            is_root: privilege::is_root(),
        };
        let report = pipeline.run(&config, console).await?;
        if let Some(ref path) = config.report {
            report
                .write_json(path)
                .with_context(|| format!("failed to write run report {}", path.display()))?;
            console.info(&format!("Run report written to {}", path.display()));
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    let mut config = StackConfig::from_env();
    cli.apply(&mut config);

    let console = Console::terminal();
    match run(config, &console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            console.error(&format!("{:#}", e));
            let code = e
                .downcast_ref::<DeployError>()
                .map(DeployError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
