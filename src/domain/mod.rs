//! 领域模型
//!
//! 纯数据类型，不涉及 IO

pub mod container;
pub mod layout;
pub mod manifest;
pub mod stage;
pub mod system;

pub use container::{ContainerStatus, Health};
pub use layout::{LayoutReport, ProvisionOutcome, ProvisionedEntry};
pub use manifest::{ManifestSummary, ServiceSummary};
pub use stage::{DeployStage, StageStatus};
pub use system::{HostSnapshot, ResourceThresholds, ResourceWarning};
