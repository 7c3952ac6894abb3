//! fbdeploy - FileBrowser + Caddy 一键部署
//!
//! 安装 Docker、置备目录与 Caddyfile，然后用 docker compose 启动服务栈

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

pub use config::StackConfig;
pub use error::{DeployError, DeployResult};
