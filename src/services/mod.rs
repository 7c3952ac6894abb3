//! 服务层
//!
//! 部署流程的各个步骤

pub mod health;
pub mod installer;
pub mod launcher;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod probe;

pub use output::Console;
pub use pipeline::{Pipeline, RunReport};
pub use probe::{HostInspector, SysinfoInspector};
