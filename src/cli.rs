use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::StackConfig;

/// Flags override the FBDEPLOY_* environment variables; nothing is required.
#[derive(Parser, Debug)]
#[command(
    name = "fbdeploy",
    version,
    about = "Install Docker and launch FileBrowser behind Caddy (automatic TLS)"
)]
pub struct Cli {
    #[arg(long, help = "Directory holding the compose manifest and the provisioned layout")]
    pub base_dir: Option<PathBuf>,
    #[arg(long, help = "Compose manifest (default: <base-dir>/docker-compose.yml)")]
    pub manifest: Option<PathBuf>,
    #[arg(long, help = "Public hostname routed to the file manager")]
    pub hostname: Option<String>,
    #[arg(long = "extra-hostname", help = "Additional hostname (repeatable)")]
    pub extra_hostnames: Vec<String>,
    #[arg(long, help = "Compose service name of the file manager")]
    pub app_service: Option<String>,
    #[arg(long, help = "Port the file manager listens on inside the network")]
    pub app_port: Option<u16>,
    #[arg(long, help = "Fixed wait when no healthcheck is declared")]
    pub settle_wait_secs: Option<u64>,
    #[arg(long, help = "Upper bound when polling healthchecks")]
    pub ready_timeout_secs: Option<u64>,
    #[arg(long, help = "Log lines shown when the stack is unhealthy")]
    pub log_tail: Option<usize>,
    #[arg(long, help = "Docker install script URL")]
    pub install_url: Option<String>,
    #[arg(long, help = "Never install Docker; fail if it is missing")]
    pub skip_install: bool,
    #[arg(long, help = "Write a JSON run report here after a successful run")]
    pub report: Option<PathBuf>,
    #[arg(short, long, action = ArgAction::Count, help = "More log output (-v info, -vv debug)")]
    pub verbose: u8,
}

impl Cli {
    /// Layer flag values over an env-derived config
    pub fn apply(&self, config: &mut StackConfig) {
        if let Some(ref dir) = self.base_dir {
            config.base_dir = dir.clone();
        }
        if let Some(ref manifest) = self.manifest {
            config.manifest = Some(manifest.clone());
        }
        if let Some(ref hostname) = self.hostname {
            config.hostname = hostname.clone();
        }
        if !self.extra_hostnames.is_empty() {
            config.extra_hostnames = self.extra_hostnames.clone();
        }
        if let Some(ref service) = self.app_service {
            config.app_service = service.clone();
        }
        if let Some(port) = self.app_port {
            config.app_port = port;
        }
        if let Some(secs) = self.settle_wait_secs {
            config.settle_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = self.ready_timeout_secs {
            config.ready_timeout = Duration::from_secs(secs);
        }
        if let Some(lines) = self.log_tail {
            config.log_tail = lines;
        }
        if let Some(ref url) = self.install_url {
            config.install_url = url.clone();
        }
        if self.skip_install {
            config.skip_install = true;
        }
        if let Some(ref path) = self.report {
            config.report = Some(path.clone());
        }
    }

    /// Default tracing filter for the verbosity flag
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keeps_config() {
        let cli = Cli::try_parse_from(["fbdeploy"]).unwrap();
        let mut config = StackConfig::with_base_dir("/srv");
        cli.apply(&mut config);
        assert_eq!(config.base_dir, PathBuf::from("/srv"));
        assert_eq!(config.hostname, "files.example.com");
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::try_parse_from([
            "fbdeploy",
            "--base-dir",
            "/opt/files",
            "--hostname",
            "drive.example.net",
            "--extra-hostname",
            "www.drive.example.net",
            "--settle-wait-secs",
            "3",
            "--skip-install",
            "--report",
            "/var/log/fbdeploy.json",
            "-vv",
        ])
        .unwrap();
        let mut config = StackConfig::with_base_dir("/srv");
        cli.apply(&mut config);
        assert_eq!(config.base_dir, PathBuf::from("/opt/files"));
        assert_eq!(config.hostnames(), vec!["drive.example.net", "www.drive.example.net"]);
        assert_eq!(config.settle_wait, Duration::from_secs(3));
        assert!(config.skip_install);
        assert_eq!(config.report, Some(PathBuf::from("/var/log/fbdeploy.json")));
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["fbdeploy", "--app-port", "70000"]).is_err());
    }
}
