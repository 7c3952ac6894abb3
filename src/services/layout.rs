//! Layout provisioner.
//!
//! Creates the directory tree the compose stack mounts and writes a default
//! Caddyfile. Both steps are idempotent: existing directories are reported,
//! and an existing Caddyfile is never rewritten.

use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::config::StackConfig;
use crate::domain::layout::{LayoutReport, ProvisionOutcome, ProvisionedEntry};
use crate::error::{DeployError, DeployResult};

use super::output::Console;

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Default Caddyfile: one block per hostname, all routed to the app
pub fn render_caddyfile(hostnames: &[&str], upstream_service: &str, upstream_port: u16) -> String {
    let mut out = String::from("# Generated by fbdeploy. Edits are preserved on later runs.\n");
    for host in hostnames {
        out.push('\n');
        out.push_str(&format!(
            "{} {{\n    reverse_proxy {}:{}\n}}\n",
            host, upstream_service, upstream_port
        ));
    }
    out
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Create one directory unless it already exists
pub fn ensure_dir(path: &Path) -> DeployResult<ProvisionOutcome> {
    if path.is_dir() {
        return Ok(ProvisionOutcome::AlreadyExists);
    }
    if path.exists() {
        return Err(DeployError::layout(path, "exists but is not a directory"));
    }
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    set_mode(path, DIR_MODE)?;
    Ok(ProvisionOutcome::Created)
}

/// Write `content` to `path` unless the file already exists
pub fn ensure_file(path: &Path, content: &str) -> DeployResult<ProvisionOutcome> {
    if path.is_file() {
        return Ok(ProvisionOutcome::AlreadyExists);
    }
    if path.exists() {
        return Err(DeployError::layout(path, "exists but is not a regular file"));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // 先写临时文件再原子落盘，避免留下半截配置
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    #[cfg(unix)]
    set_mode(tmp.path(), FILE_MODE)?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(ProvisionOutcome::Created),
        // someone else created it in the meantime; theirs wins
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Ok(ProvisionOutcome::AlreadyExists)
        }
        Err(e) => Err(DeployError::Io(e.error)),
    }
}

/// Create the directory tree and the default Caddyfile
pub fn provision_layout(config: &StackConfig, console: &Console) -> DeployResult<LayoutReport> {
    let mut report = LayoutReport::default();

    for dir in config.layout_dirs() {
        let outcome = ensure_dir(&dir)?;
        match outcome {
            ProvisionOutcome::Created => console.success(&format!("Created {}", dir.display())),
            ProvisionOutcome::AlreadyExists => {
                console.info(&format!("{} already exists", dir.display()))
            }
        }
        report.directories.push(ProvisionedEntry {
            path: dir,
            outcome,
        });
    }

    let caddyfile = config.caddyfile_path();
    let content = render_caddyfile(&config.hostnames(), &config.app_service, config.app_port);
    let outcome = ensure_file(&caddyfile, &content)?;
    match outcome {
        ProvisionOutcome::Created => console.success(&format!(
            "Wrote {} ({} -> {}:{})",
            caddyfile.display(),
            config.hostnames().join(", "),
            config.app_service,
            config.app_port
        )),
        ProvisionOutcome::AlreadyExists => console.info(&format!(
            "{} already exists, leaving it untouched",
            caddyfile.display()
        )),
    }
    report.proxy_config = Some(ProvisionedEntry {
        path: caddyfile,
        outcome,
    });

    info!(created = report.created_count(), "Layout provisioned");
    Ok(report)
}
