//! Runtime configuration and the well-known pseudo-file locations.
//!
//! All paths are resolved against [`Config::rootfs`], which is `/` unless
//! `SYSRES_ROOTFS` points somewhere else (for example a host root mounted into
//! a monitoring container, or a temporary tree in tests).

use std::path::{Path, PathBuf};

/// Environment variable holding a decimal CPU core count.
///
/// Consulted only when the cgroup CPU limit is unlimited or unreadable, which is
/// the situation in sandboxed runtimes such as gVisor.
pub const CPU_CORES_ENV: &str = "SYSRES_CPU_CORES";

/// Environment variable overriding the filesystem root.
pub const ROOTFS_ENV: &str = "SYSRES_ROOTFS";

/// Canonical cgroup mount point, relative to the root filesystem.
const CGROUP_MOUNT: &str = "sys/fs/cgroup";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    rootfs: PathBuf,
    cpu_cores_override: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rootfs: PathBuf::from("/"),
            cpu_cores_override: None,
        }
    }
}

impl Config {
    /// Builds a configuration from `SYSRES_ROOTFS` and `SYSRES_CPU_CORES`.
    ///
    /// Invalid override values are logged and ignored.
    pub fn from_env() -> Self {
        let rootfs = std::env::var_os(ROOTFS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        let cpu_cores_override = std::env::var(CPU_CORES_ENV)
            .ok()
            .and_then(|raw| parse_cpu_cores(&raw));

        Self {
            rootfs,
            cpu_cores_override,
        }
    }

    /// Returns a default configuration rooted at `rootfs`.
    pub fn with_rootfs(rootfs: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
            cpu_cores_override: None,
        }
    }

    /// Sets the CPU core override. Non-positive values clear it.
    pub fn cpu_cores_override(mut self, cores: Option<f64>) -> Self {
        self.cpu_cores_override = cores.filter(|c| *c > 0.0);
        self
    }

    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    pub fn cpu_cores(&self) -> Option<f64> {
        self.cpu_cores_override
    }

    /// Returns the well-known paths for this root.
    pub fn paths(&self) -> Paths {
        Paths::new(&self.rootfs)
    }
}

/// Parses an override value, accepting only finite positive numbers.
fn parse_cpu_cores(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(cores) if cores.is_finite() && cores > 0.0 => Some(cores),
        _ => {
            log::warn!("ignoring {CPU_CORES_ENV}={raw:?}: expected a positive core count");
            None
        }
    }
}

/// Absolute locations of every file the resolvers read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// The cgroup mount root, `/sys/fs/cgroup`.
    pub cgroup_root: PathBuf,
    /// `/proc/self/cgroup`.
    pub self_cgroup: PathBuf,
    /// `/proc/meminfo`.
    pub meminfo: PathBuf,
    /// `/proc/loadavg`.
    pub loadavg: PathBuf,
}

impl Paths {
    pub fn new(rootfs: &Path) -> Self {
        Self {
            cgroup_root: rootfs.join(CGROUP_MOUNT),
            self_cgroup: rootfs.join("proc/self/cgroup"),
            meminfo: rootfs.join("proc/meminfo"),
            loadavg: rootfs.join("proc/loadavg"),
        }
    }

    /// `cpuacct.usage` in the dedicated and the combined v1 hierarchy.
    pub fn v1_cpuacct_usage(&self) -> [PathBuf; 2] {
        [
            self.cgroup_root.join("cpuacct/cpuacct.usage"),
            self.cgroup_root.join("cpu,cpuacct/cpuacct.usage"),
        ]
    }

    /// `(cfs_quota_us, cfs_period_us)` pairs in the dedicated and the combined v1 hierarchy.
    pub fn v1_cfs(&self) -> [(PathBuf, PathBuf); 2] {
        [
            (
                self.cgroup_root.join("cpu/cpu.cfs_quota_us"),
                self.cgroup_root.join("cpu/cpu.cfs_period_us"),
            ),
            (
                self.cgroup_root.join("cpu,cpuacct/cpu.cfs_quota_us"),
                self.cgroup_root.join("cpu,cpuacct/cpu.cfs_period_us"),
            ),
        ]
    }

    pub fn v1_memory_limit(&self) -> PathBuf {
        self.cgroup_root.join("memory/memory.limit_in_bytes")
    }

    pub fn v1_memory_usage(&self) -> PathBuf {
        self.cgroup_root.join("memory/memory.usage_in_bytes")
    }
}
