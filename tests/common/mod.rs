#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use fbdeploy::domain::HostSnapshot;
use fbdeploy::infra::{CommandError, CommandOutput, CommandSpec, Runner, ScriptSource};
use fbdeploy::services::{Console, HostInspector, Pipeline};
use fbdeploy::{DeployError, DeployResult, StackConfig};

pub const GIB: u64 = 1024 * 1024 * 1024;

pub const TWO_SERVICE_MANIFEST: &str = r#"services:
  caddy:
    image: caddy:2-alpine
    ports: ["80:80", "443:443"]
    volumes:
      - ./caddy/Caddyfile:/etc/caddy/Caddyfile
      - ./caddy/data:/data
      - ./caddy/config:/config
  filebrowser:
    image: filebrowser/filebrowser:latest
    volumes:
      - ./data:/srv
      - ./filebrowser/database:/database
      - ./filebrowser/config:/config
"#;

pub const HEALTHCHECK_MANIFEST: &str = r#"services:
  caddy:
    image: caddy:2-alpine
  filebrowser:
    image: filebrowser/filebrowser:latest
    healthcheck:
      test: ["CMD", "wget", "-qO-", "http://localhost/health"]
      interval: 5s
"#;

pub const BOTH_UP: &str = r#"{"Name":"stack-caddy-1","Service":"caddy","State":"running","Status":"Up 30 seconds","Health":""}
{"Name":"stack-filebrowser-1","Service":"filebrowser","State":"running","Status":"Up 30 seconds","Health":""}
"#;

pub const BOTH_EXITED: &str = r#"{"Name":"stack-caddy-1","Service":"caddy","State":"exited","Status":"Exited (1) 20 seconds ago","Health":""}
{"Name":"stack-filebrowser-1","Service":"filebrowser","State":"exited","Status":"Exited (2) 20 seconds ago","Health":""}
"#;

pub const PS_TABLE: &str = "NAME                  STATUS\nstack-caddy-1         Up 30 seconds\nstack-filebrowser-1   Up 30 seconds\n";

#[derive(Clone, Debug)]
pub enum Reply {
    Ok(String),
    Fail(i32, String),
    NotFound,
}

struct Rule {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// Fake runner: the first rule whose pattern occurs in the command line answers.
/// Queued replies are consumed in order; the last one repeats.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, reply: Reply) -> Self {
        self.on_seq(pattern, vec![reply])
    }

    pub fn on_seq(self, pattern: &str, replies: Vec<Reply>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            replies: replies.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, pattern: &str) -> bool {
        self.calls().iter().any(|c| c.contains(pattern))
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }

    /// Docker 24 with the compose plugin and a running daemon.
    pub fn with_docker(self) -> Self {
        self.on("docker --version", Reply::Ok("Docker version 24.0.7, build afdd53b\n".into()))
            .on("docker info", Reply::Ok("24.0.7\n".into()))
            .on("docker compose version", Reply::Ok("Docker Compose version v2.21.0\n".into()))
    }

    /// Compose commands for a stack whose `ps` reports `ps_json`.
    pub fn with_stack(self, ps_json: &str) -> Self {
        self.on("config -q", Reply::Ok(String::new()))
            .on(" pull", Reply::Ok("Pulled\n".into()))
            .on("up -d", Reply::Ok("Started\n".into()))
            .on("ps --all --format json", Reply::Ok(ps_json.to_string()))
            .on(" ps", Reply::Ok(PS_TABLE.to_string()))
            .on(" logs ", Reply::Ok("filebrowser  | panic: database locked\n".into()))
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let line = spec.command_line();
        self.calls.lock().unwrap().push(line.clone());

        let reply = {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().find(|r| line.contains(&r.pattern)) {
                Some(rule) if rule.replies.len() > 1 => rule.replies.pop_front(),
                Some(rule) => rule.replies.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Ok(stdout)) => Ok(CommandOutput {
                code: Some(0),
                stdout,
                stderr: String::new(),
            }),
            Some(Reply::Fail(code, stderr)) => Ok(CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr,
            }),
            Some(Reply::NotFound) | None => Err(CommandError::SpawnFailed {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
        }
    }
}

/// Serves a fixed install script and records requested URLs.
#[derive(Default)]
pub struct StaticScripts {
    pub body: String,
    pub fetched: Mutex<Vec<String>>,
}

impl StaticScripts {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl ScriptSource for StaticScripts {
    async fn fetch(&self, url: &str) -> DeployResult<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.body.is_empty() {
            return Err(DeployError::Fetch(format!("{} unreachable", url)));
        }
        Ok(self.body.clone())
    }
}

pub struct FixedHost(pub HostSnapshot);

impl FixedHost {
    pub fn roomy() -> Self {
        Self::with(4 * GIB, 50 * GIB)
    }

    pub fn with(memory: u64, disk: u64) -> Self {
        FixedHost(HostSnapshot {
            hostname: "deploy-box".to_string(),
            os_name: "Linux 6.1".to_string(),
            cpu_count: 2,
            total_memory_bytes: memory,
            available_disk_bytes: disk,
            disk_mount: "/".to_string(),
        })
    }
}

impl HostInspector for FixedHost {
    fn snapshot(&self, _base_dir: &Path) -> HostSnapshot {
        self.0.clone()
    }
}

pub struct TestEnv {
    _tmp: TempDir,
    pub base: PathBuf,
    pub config: StackConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("stack");
        fs::create_dir_all(&base).unwrap();
        let mut config = StackConfig::with_base_dir(&base);
        config.settle_wait = Duration::from_millis(10);
        config.poll_interval = Duration::from_millis(10);
        config.ready_timeout = Duration::from_millis(500);
        config.probe_timeout = Duration::from_secs(5);
        Self {
            _tmp: tmp,
            base,
            config,
        }
    }

    pub fn with_manifest(self, content: &str) -> Self {
        fs::write(self.base.join("docker-compose.yml"), content).unwrap();
        self
    }

    pub fn caddyfile(&self) -> PathBuf {
        self.config.caddyfile_path()
    }
}

pub async fn run_pipeline(
    env: &TestEnv,
    runner: &ScriptedRunner,
    scripts: &StaticScripts,
    host: &FixedHost,
    console: &Console,
) -> DeployResult<fbdeploy::services::RunReport> {
    let pipeline = Pipeline {
        runner,
        scripts,
        inspector: host,
        is_root: true,
    };
    pipeline.run(&env.config, console).await
}
