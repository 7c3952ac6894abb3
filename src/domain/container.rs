//! 容器相关领域模型

use serde::{Deserialize, Serialize};

/// 容器健康状态（来自 compose 的 Health 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Unhealthy,
    Starting,
    /// 未声明 healthcheck
    None,
}

impl Health {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "healthy" => Health::Healthy,
            "unhealthy" => Health::Unhealthy,
            "starting" => Health::Starting,
            _ => Health::None,
        }
    }
}

/// `docker compose ps --format json` 的单行记录
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    health: String,
}

/// 容器状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerStatus {
    pub name: String,
    pub service: String,
    pub image: String,
    /// running / exited / restarting ...
    pub state: String,
    /// 人类可读状态，如 "Up 2 minutes (healthy)"
    pub status: String,
    pub health: Health,
}

impl From<PsRecord> for ContainerStatus {
    fn from(r: PsRecord) -> Self {
        Self {
            health: Health::parse(&r.health),
            name: r.name,
            service: r.service,
            image: r.image,
            state: r.state,
            status: r.status,
        }
    }
}

impl ContainerStatus {
    /// `State` wins; `Status` is only consulted when compose left `State` empty
    pub fn is_running(&self) -> bool {
        if self.state.is_empty() {
            self.status.starts_with("Up") && !self.status.contains("(Paused)")
        } else {
            self.state.eq_ignore_ascii_case("running")
        }
    }

    /// 运行中，且健康或未声明 healthcheck
    pub fn is_ready(&self) -> bool {
        self.is_running() && matches!(self.health, Health::Healthy | Health::None)
    }

    /// 声明了 healthcheck 且尚未得出结论
    pub fn is_settling(&self) -> bool {
        self.is_running() && self.health == Health::Starting
    }
}

/// 解析 `ps --format json` 输出
///
/// 新版 compose 每行一个 JSON 对象，旧版输出一个 JSON 数组，两种都接受
pub fn parse_ps_output(raw: &str) -> Result<Vec<ContainerStatus>, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        let records: Vec<PsRecord> = serde_json::from_str(trimmed)?;
        return Ok(records.into_iter().map(ContainerStatus::from).collect());
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<PsRecord>(line).map(ContainerStatus::from))
        .collect()
}
