//! 环境变量配置加载
//!
//! 所有步骤共享同一个显式的 `StackConfig`，不依赖进程的当前目录或其他隐式状态

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::domain::system::ResourceThresholds;

/// 部署配置
#[derive(Clone, Debug)]
pub struct StackConfig {
    /// 基础目录（目录布局与默认清单所在位置）
    pub base_dir: PathBuf,
    /// compose 清单路径，None 时使用 `<base_dir>/docker-compose.yml`
    pub manifest: Option<PathBuf>,
    /// 对外访问的主机名
    pub hostname: String,
    /// 额外主机名，每个生成一个路由块
    pub extra_hostnames: Vec<String>,
    /// 应用在 compose 网络中的服务名
    pub app_service: String,
    /// 应用监听端口
    pub app_port: u16,
    /// 未声明 healthcheck 时的固定等待
    pub settle_wait: Duration,
    /// 轮询 healthcheck 的上限
    pub ready_timeout: Duration,
    /// 轮询间隔
    pub poll_interval: Duration,
    /// 失败时输出的日志行数
    pub log_tail: usize,
    /// Docker 安装脚本地址
    pub install_url: String,
    /// 跳过安装（仍要求运行时可用）
    pub skip_install: bool,
    /// 资源阈值
    pub thresholds: ResourceThresholds,
    /// 探测类短命令的超时
    pub probe_timeout: Duration,
    /// 成功后写入 JSON 运行报告的路径
    pub report: Option<PathBuf>,
}

impl StackConfig {
    /// 指定基础目录，其余使用默认值
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            manifest: None,
            hostname: defaults::HOSTNAME.to_string(),
            extra_hostnames: Vec::new(),
            app_service: defaults::APP_SERVICE.to_string(),
            app_port: defaults::APP_PORT,
            settle_wait: Duration::from_secs(defaults::SETTLE_WAIT_SECS),
            ready_timeout: Duration::from_secs(defaults::READY_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(defaults::POLL_INTERVAL_SECS),
            log_tail: defaults::LOG_TAIL,
            install_url: defaults::INSTALL_URL.to_string(),
            skip_install: false,
            thresholds: ResourceThresholds {
                min_memory_bytes: constants::MIN_MEMORY_BYTES,
                min_disk_bytes: constants::MIN_DISK_BYTES,
            },
            probe_timeout: Duration::from_secs(constants::PROBE_TIMEOUT_SECS),
            report: None,
        }
    }

    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = lookup("FBDEPLOY_BASE_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::with_base_dir(base_dir);

        config.manifest = lookup("FBDEPLOY_MANIFEST")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        if let Some(hostname) = lookup("FBDEPLOY_HOSTNAME").filter(|v| !v.is_empty()) {
            config.hostname = hostname;
        }

        config.extra_hostnames = lookup("FBDEPLOY_EXTRA_HOSTNAMES")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        if let Some(service) = lookup("FBDEPLOY_APP_SERVICE").filter(|v| !v.is_empty()) {
            config.app_service = service;
        }

        if let Some(port) = parse_var(&lookup, "FBDEPLOY_APP_PORT") {
            config.app_port = port;
        }

        if let Some(secs) = parse_var(&lookup, "FBDEPLOY_SETTLE_WAIT_SECS") {
            config.settle_wait = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var(&lookup, "FBDEPLOY_READY_TIMEOUT_SECS") {
            config.ready_timeout = Duration::from_secs(secs);
        }

        if let Some(lines) = parse_var(&lookup, "FBDEPLOY_LOG_TAIL") {
            config.log_tail = lines;
        }

        if let Some(url) = lookup("FBDEPLOY_INSTALL_URL").filter(|v| !v.is_empty()) {
            config.install_url = url;
        }

        config.skip_install = lookup("FBDEPLOY_SKIP_INSTALL")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        config.report = lookup("FBDEPLOY_REPORT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        config
    }

    /// compose 清单路径
    pub fn manifest_path(&self) -> PathBuf {
        match self.manifest {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.base_dir.join(path),
            None => self.base_dir.join(defaults::MANIFEST_FILE),
        }
    }

    pub fn caddy_dir(&self) -> PathBuf {
        self.base_dir.join("caddy")
    }

    /// Caddyfile 路径
    pub fn caddyfile_path(&self) -> PathBuf {
        self.caddy_dir().join("Caddyfile")
    }

    /// 需要置备的目录，父目录在前
    pub fn layout_dirs(&self) -> Vec<PathBuf> {
        let base = &self.base_dir;
        vec![
            base.join("filebrowser"),
            base.join("filebrowser").join("config"),
            base.join("filebrowser").join("database"),
            self.caddy_dir(),
            self.caddy_dir().join("data"),
            self.caddy_dir().join("config"),
            base.join("data"),
        ]
    }

    /// 所有受管理的主机名（主主机名在前，去重）
    pub fn hostnames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![self.hostname.as_str()];
        for extra in &self.extra_hostnames {
            if !names.contains(&extra.as_str()) {
                names.push(extra.as_str());
            }
        }
        names
    }

    /// 访问地址
    pub fn access_url(&self) -> String {
        format!("https://{}", self.hostname)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 默认值
pub mod defaults {
    pub const MANIFEST_FILE: &str = "docker-compose.yml";
    pub const HOSTNAME: &str = "files.example.com";
    pub const APP_SERVICE: &str = "filebrowser";
    pub const APP_PORT: u16 = 80;
    pub const SETTLE_WAIT_SECS: u64 = 30;
    pub const READY_TIMEOUT_SECS: u64 = 120;
    pub const POLL_INTERVAL_SECS: u64 = 2;
    pub const LOG_TAIL: usize = 50;
    pub const INSTALL_URL: &str = "https://get.docker.com";
}

/// 常量
pub mod constants {
    /// 内存下限 1 GiB
    pub const MIN_MEMORY_BYTES: u64 = 1024 * 1024 * 1024;

    /// 磁盘可用空间下限 5 GiB
    pub const MIN_DISK_BYTES: u64 = 5 * 1024 * 1024 * 1024;

    /// 支持 compose v2 插件的最低 Docker 主版本
    pub const MIN_DOCKER_MAJOR: u32 = 20;

    /// 探测命令超时（秒）
    pub const PROBE_TIMEOUT_SECS: u64 = 30;

    /// 安装脚本下载超时（秒）
    pub const FETCH_TIMEOUT_SECS: u64 = 60;

    /// 最低 compose 主版本（v1 不支持 `ps --format json`）
    pub const MIN_COMPOSE_MAJOR: u32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StackConfig::from_lookup(lookup_from(&[("FBDEPLOY_BASE_DIR", "/srv/files")]));
        assert_eq!(config.base_dir, PathBuf::from("/srv/files"));
        assert_eq!(config.manifest_path(), PathBuf::from("/srv/files/docker-compose.yml"));
        assert_eq!(config.caddyfile_path(), PathBuf::from("/srv/files/caddy/Caddyfile"));
        assert_eq!(config.settle_wait, Duration::from_secs(30));
        assert_eq!(config.hostname, "files.example.com");
        assert!(!config.skip_install);
        assert!(config.report.is_none());
    }

    #[test]
    fn test_overrides_from_env() {
        let config = StackConfig::from_lookup(lookup_from(&[
            ("FBDEPLOY_BASE_DIR", "/srv/files"),
            ("FBDEPLOY_MANIFEST", "stack/compose.yaml"),
            ("FBDEPLOY_HOSTNAME", "drive.example.org"),
            ("FBDEPLOY_EXTRA_HOSTNAMES", "a.example.org, ,b.example.org"),
            ("FBDEPLOY_APP_PORT", "8080"),
            ("FBDEPLOY_SETTLE_WAIT_SECS", "5"),
            ("FBDEPLOY_SKIP_INSTALL", "true"),
            ("FBDEPLOY_REPORT", "/var/log/fbdeploy.json"),
        ]));
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("/srv/files/stack/compose.yaml")
        );
        assert_eq!(config.access_url(), "https://drive.example.org");
        assert_eq!(
            config.hostnames(),
            vec!["drive.example.org", "a.example.org", "b.example.org"]
        );
        assert_eq!(config.app_port, 8080);
        assert_eq!(config.settle_wait, Duration::from_secs(5));
        assert!(config.skip_install);
        assert_eq!(config.report, Some(PathBuf::from("/var/log/fbdeploy.json")));
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = StackConfig::from_lookup(lookup_from(&[
            ("FBDEPLOY_BASE_DIR", "/srv"),
            ("FBDEPLOY_APP_PORT", "eighty"),
        ]));
        assert_eq!(config.app_port, 80);
    }

    #[test]
    fn test_absolute_manifest_is_kept() {
        let mut config = StackConfig::with_base_dir("/srv");
        config.manifest = Some(PathBuf::from("/etc/stack/compose.yml"));
        assert_eq!(config.manifest_path(), PathBuf::from("/etc/stack/compose.yml"));
    }

    #[test]
    fn test_layout_dirs_parents_first() {
        let config = StackConfig::with_base_dir("/srv");
        let dirs = config.layout_dirs();
        let caddy = dirs.iter().position(|d| d == &PathBuf::from("/srv/caddy")).unwrap();
        let caddy_data = dirs
            .iter()
            .position(|d| d == &PathBuf::from("/srv/caddy/data"))
            .unwrap();
        assert!(caddy < caddy_data);
    }

    #[test]
    fn test_duplicate_hostnames_collapse() {
        let mut config = StackConfig::with_base_dir("/srv");
        config.extra_hostnames = vec!["files.example.com".to_string()];
        assert_eq!(config.hostnames(), vec!["files.example.com"]);
    }
}
