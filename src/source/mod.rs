//! Per-platform metric readers.
//!
//! Each [`Platform`] variant has one [`MetricSource`] implementation, chosen once
//! when the platform is detected. Sources never fail: unreadable files turn into
//! the documented zero or "no limit" values.

mod host;
#[cfg(all(unix, not(target_os = "linux")))]
mod native;
mod procfs;
mod unsupported;
mod v1;
mod v2;

use std::sync::Arc;

pub use host::HostSource;
#[cfg(all(unix, not(target_os = "linux")))]
pub use native::{MacOsSource, current_cpu_limit_cores, current_memory_stats};
pub use unsupported::UnsupportedSource;
pub use v1::CgroupV1Source;
pub use v2::CgroupV2Source;

use crate::config::Paths;
use crate::fsutil::FileProbe;
use crate::platform::{Detection, Platform};

/// Raw readings for one platform.
pub trait MetricSource: std::fmt::Debug + Send + Sync {
    /// Cumulative CPU time consumed by the cgroup, in microseconds.
    ///
    /// `None` if the platform has no such counter, in which case CPU load is
    /// derived from the load average instead.
    fn usage_micros(&self) -> Option<u64>;

    /// The CPU limit in millicores, `None` when unlimited or unknown.
    fn limit_millicores(&self) -> Option<u64>;

    /// The effective memory limit in bytes, falling back to total host memory.
    fn memory_limit_bytes(&self) -> u64;

    /// Memory currently in use, in bytes.
    fn memory_used_bytes(&self) -> u64;

    /// The raw 1-minute load average, not yet divided by the CPU count.
    fn load_average(&self) -> Option<f64>;

    /// Logical CPUs of the host, the CPU limit of last resort.
    fn logical_cpus(&self) -> f64 {
        num_cpus::get() as f64
    }
}

/// Builds the source bound to a detected platform.
pub fn for_detection(
    detection: &Detection,
    probe: Arc<dyn FileProbe>,
    paths: Paths,
) -> Box<dyn MetricSource> {
    match detection.platform {
        Platform::LinuxCgroupV2 => {
            let dir = detection
                .cgroup_dir
                .clone()
                .unwrap_or_else(|| paths.cgroup_root.clone());
            Box::new(CgroupV2Source::new(probe, paths, dir))
        }
        Platform::LinuxCgroupV1 => Box::new(CgroupV1Source::new(probe, paths)),
        Platform::LinuxHost => Box::new(HostSource::new(probe, paths)),
        #[cfg(all(unix, not(target_os = "linux")))]
        Platform::MacOsHost => Box::new(MacOsSource),
        #[cfg(not(all(unix, not(target_os = "linux"))))]
        Platform::MacOsHost => Box::new(UnsupportedSource),
        Platform::Unsupported => Box::new(UnsupportedSource),
    }
}
