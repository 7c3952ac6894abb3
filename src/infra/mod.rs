//! 基础设施模块
//!
//! 封装外部依赖（命令执行、compose CLI、HTTP 下载、权限检查）

pub mod command;
pub mod compose;
pub mod fetch;
pub mod privilege;

pub use command::{CommandError, CommandOutput, CommandSpec, Runner, SystemRunner};
pub use compose::{ComposeCli, ComposeFlavor};
pub use fetch::{HttpScriptSource, ScriptSource};
