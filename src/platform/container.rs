use std::path::Path;

use super::Platform;
use crate::config::Paths;
use crate::error::ResultOkLogExt;
use crate::fsutil::{self, FileProbe};
use crate::stats::{MemoryLimit, SingleLineStat};

/// Returns `true` if a finite memory limit confines the process.
///
/// - v2: `memory.max` in the process's cgroup directory holds a byte count (not `max`).
/// - v1: `memory.limit_in_bytes` is below the "no limit" sentinel.
///
/// An unreadable or malformed file means "not containerized". Every other
/// platform is never containerized.
pub fn classify_container(
    probe: &dyn FileProbe,
    paths: &Paths,
    platform: Platform,
    cgroup_dir: Option<&Path>,
) -> bool {
    let limit = match platform {
        Platform::LinuxCgroupV2 => {
            let dir = cgroup_dir.unwrap_or(&paths.cgroup_root);
            fsutil::read_parsed(probe, &dir.join("memory.max"), MemoryLimit::from_reader).ok_log()
        }
        Platform::LinuxCgroupV1 => {
            fsutil::read_parsed(probe, &paths.v1_memory_limit(), MemoryLimit::from_reader)
                .ok_log()
                .map(MemoryLimit::v1_effective)
        }
        Platform::MacOsHost | Platform::LinuxHost | Platform::Unsupported => None,
    };

    limit.is_some_and(|limit| limit.is_limited())
}
