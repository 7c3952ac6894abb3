//! 主机资源领域模型

use serde::Serialize;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// 字节转 GiB
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

/// 主机资源快照（每次运行采样一次）
#[derive(Clone, Debug, Serialize)]
pub struct HostSnapshot {
    pub hostname: String,
    pub os_name: String,
    pub cpu_count: usize,
    pub total_memory_bytes: u64,
    /// 基础目录所在文件系统的可用空间
    pub available_disk_bytes: u64,
    pub disk_mount: String,
}

/// 资源阈值
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceThresholds {
    pub min_memory_bytes: u64,
    pub min_disk_bytes: u64,
}

/// 资源不足警告（不阻塞部署）
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceWarning {
    LowMemory { total: u64, threshold: u64 },
    LowDisk { available: u64, threshold: u64, mount: String },
}

impl std::fmt::Display for ResourceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceWarning::LowMemory { total, threshold } => write!(
                f,
                "low memory: {:.2} GiB total, at least {:.0} GiB recommended",
                bytes_to_gib(*total),
                bytes_to_gib(*threshold)
            ),
            ResourceWarning::LowDisk {
                available,
                threshold,
                mount,
            } => write!(
                f,
                "low disk space on {}: {:.2} GiB free, at least {:.0} GiB recommended",
                mount,
                bytes_to_gib(*available),
                bytes_to_gib(*threshold)
            ),
        }
    }
}

impl HostSnapshot {
    /// 与阈值比较，返回所有警告
    pub fn warnings(&self, thresholds: &ResourceThresholds) -> Vec<ResourceWarning> {
        let mut warnings = Vec::new();
        if self.total_memory_bytes < thresholds.min_memory_bytes {
            warnings.push(ResourceWarning::LowMemory {
                total: self.total_memory_bytes,
                threshold: thresholds.min_memory_bytes,
            });
        }
        if self.available_disk_bytes < thresholds.min_disk_bytes {
            warnings.push(ResourceWarning::LowDisk {
                available: self.available_disk_bytes,
                threshold: thresholds.min_disk_bytes,
                mount: self.disk_mount.clone(),
            });
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_GIB: u64 = 1024 * 1024 * 1024;

    fn snapshot(memory: u64, disk: u64) -> HostSnapshot {
        HostSnapshot {
            hostname: "box".to_string(),
            os_name: "Linux".to_string(),
            cpu_count: 2,
            total_memory_bytes: memory,
            available_disk_bytes: disk,
            disk_mount: "/".to_string(),
        }
    }

    fn thresholds() -> ResourceThresholds {
        ResourceThresholds {
            min_memory_bytes: ONE_GIB,
            min_disk_bytes: 5 * ONE_GIB,
        }
    }

    #[test]
    fn test_no_warnings_when_above_thresholds() {
        assert!(snapshot(2 * ONE_GIB, 20 * ONE_GIB).warnings(&thresholds()).is_empty());
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert!(snapshot(ONE_GIB, 5 * ONE_GIB).warnings(&thresholds()).is_empty());
    }

    #[test]
    fn test_low_memory_and_disk() {
        let warnings = snapshot(512 * 1024 * 1024, 2 * ONE_GIB).warnings(&thresholds());
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], ResourceWarning::LowMemory { .. }));
        assert!(warnings[1].to_string().contains("2.00 GiB free"));
    }
}
