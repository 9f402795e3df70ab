use std::path::{Path, PathBuf};

use serde::Serialize;

use super::container::classify_container;
use super::membership::resolve_cgroup_dir;
use crate::config::Paths;
use crate::fsutil::FileProbe;

/// The environments the monitor knows how to read metrics in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// macOS and other non-Linux Unix hosts. Metrics come from native OS APIs.
    #[serde(rename = "macos_host")]
    MacOsHost,
    /// Linux with the unified cgroup v2 hierarchy.
    LinuxCgroupV2,
    /// Linux with the legacy per-controller cgroup v1 hierarchies.
    LinuxCgroupV1,
    /// Linux without usable cgroup accounting; `/proc` only.
    LinuxHost,
    /// Anything else, e.g. Windows. Every metric reads as zero or "no limit".
    Unsupported,
}

impl Platform {
    pub fn cgroup_version(self) -> CgroupVersion {
        match self {
            Platform::LinuxCgroupV2 => CgroupVersion::V2,
            Platform::LinuxCgroupV1 => CgroupVersion::V1,
            Platform::MacOsHost | Platform::LinuxHost | Platform::Unsupported => {
                CgroupVersion::None
            }
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::MacOsHost => "macos_host",
            Platform::LinuxCgroupV2 => "linux_cgroup_v2",
            Platform::LinuxCgroupV1 => "linux_cgroup_v1",
            Platform::LinuxHost => "linux_host",
            Platform::Unsupported => "unsupported",
        };
        write!(f, "{name}")
    }
}

/// Cgroup generation in use, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CgroupVersion {
    V1,
    V2,
    None,
}

impl CgroupVersion {
    /// Numeric form: `2`, `1`, or `0` when no cgroup hierarchy is used.
    pub fn as_i32(self) -> i32 {
        match self {
            CgroupVersion::V2 => 2,
            CgroupVersion::V1 => 1,
            CgroupVersion::None => 0,
        }
    }
}

/// Everything learned about the environment in one detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub platform: Platform,
    /// Directory of the process's cgroup v2 controller files, set only on [`Platform::LinuxCgroupV2`].
    pub cgroup_dir: Option<PathBuf>,
    /// Whether a memory limit confines the process.
    pub containerized: bool,
}

/// Classifies the running environment and resolves the cgroup directory.
///
/// This probes the filesystem; callers are expected to cache the result.
pub fn detect(probe: &dyn FileProbe, paths: &Paths) -> Detection {
    let (platform, cgroup_dir) = detect_platform(probe, paths);
    let containerized = classify_container(probe, paths, platform, cgroup_dir.as_deref());

    log::info!("detected platform {platform} (containerized: {containerized})");

    Detection {
        platform,
        cgroup_dir,
        containerized,
    }
}

#[cfg(target_os = "linux")]
fn detect_platform(probe: &dyn FileProbe, paths: &Paths) -> (Platform, Option<PathBuf>) {
    detect_linux(probe, paths)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn detect_platform(_probe: &dyn FileProbe, _paths: &Paths) -> (Platform, Option<PathBuf>) {
    (Platform::MacOsHost, None)
}

#[cfg(not(unix))]
fn detect_platform(_probe: &dyn FileProbe, _paths: &Paths) -> (Platform, Option<PathBuf>) {
    (Platform::Unsupported, None)
}

/// The Linux branch of detection, first match wins:
///
/// 1. `cpu.stat` at the cgroup mount root or in the process's own cgroup directory: v2.
/// 2. `cpuacct.usage` in the dedicated or the combined v1 hierarchy: v1.
/// 3. Otherwise a plain host.
///
/// Only the CPU accounting files decide the version; a missing memory
/// controller never downgrades it.
pub(crate) fn detect_linux(probe: &dyn FileProbe, paths: &Paths) -> (Platform, Option<PathBuf>) {
    if has_cpu_stat(probe, &paths.cgroup_root) {
        let dir = resolve_cgroup_dir(probe, &paths.self_cgroup, &paths.cgroup_root);
        return (Platform::LinuxCgroupV2, Some(dir));
    }

    let dir = resolve_cgroup_dir(probe, &paths.self_cgroup, &paths.cgroup_root);
    if dir != paths.cgroup_root && has_cpu_stat(probe, &dir) {
        return (Platform::LinuxCgroupV2, Some(dir));
    }

    if paths
        .v1_cpuacct_usage()
        .iter()
        .any(|path| probe.exists(path))
    {
        return (Platform::LinuxCgroupV1, None);
    }

    (Platform::LinuxHost, None)
}

fn has_cpu_stat(probe: &dyn FileProbe, dir: &Path) -> bool {
    probe.exists(&dir.join("cpu.stat"))
}
