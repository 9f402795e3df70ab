//! Container-aware resource metrics for the current process.
//!
//! `sysres` reports CPU and memory usage relative to the limits an orchestrator
//! imposes on the process, reading cgroup v2 or v1 control files and falling
//! back to `/proc` on unconfined Linux hosts and to native APIs on macOS.
//!
//! The main entry point is [`ResourceMonitor`]. For callers that only need one
//! monitor per process, the free functions of this crate forward to a lazily
//! created default instance:
//!
//! ```no_run
//! let _ = sysres::cpu_load();
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! println!(
//!     "{} (cgroup v{}): cpu {:.2}, memory {:.2}",
//!     sysres::detect_platform(),
//!     sysres::cgroup_version().as_i32(),
//!     sysres::cpu_load(),
//!     sysres::mem_usage(),
//! );
//! ```
//!
//! Environment variables, read once when the default monitor is created:
//!
//! - `SYSRES_CPU_CORES`: CPU core count used when no cgroup CPU limit applies.
//! - `SYSRES_ROOTFS`: root directory the cgroup and proc paths are resolved against.

use std::sync::LazyLock;

pub mod config;
pub mod cpu;
pub mod error;
pub mod fsutil;
pub mod monitor;
pub mod platform;
pub mod source;
pub mod stats;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use monitor::{NO_CPU_LIMIT, ResourceMonitor, ResourceMonitorBuilder, ResourceSnapshot};
pub use platform::{CgroupVersion, Platform};

static DEFAULT_MONITOR: LazyLock<ResourceMonitor> = LazyLock::new(ResourceMonitor::new);

/// The process-wide monitor behind the free functions of this crate.
pub fn default_monitor() -> &'static ResourceMonitor {
    &DEFAULT_MONITOR
}

/// See [`ResourceMonitor::detect_platform`].
pub fn detect_platform() -> Platform {
    DEFAULT_MONITOR.detect_platform()
}

/// See [`ResourceMonitor::cgroup_version`].
pub fn cgroup_version() -> CgroupVersion {
    DEFAULT_MONITOR.cgroup_version()
}

/// See [`ResourceMonitor::is_container_env`].
pub fn is_container_env() -> bool {
    DEFAULT_MONITOR.is_container_env()
}

/// See [`ResourceMonitor::cpu_load_avg`].
pub fn cpu_load_avg() -> f64 {
    DEFAULT_MONITOR.cpu_load_avg()
}

/// See [`ResourceMonitor::cpu_load`].
pub fn cpu_load() -> f64 {
    DEFAULT_MONITOR.cpu_load()
}

/// See [`ResourceMonitor::cpu_usage_millicores`].
pub fn cpu_usage_millicores() -> u64 {
    DEFAULT_MONITOR.cpu_usage_millicores()
}

/// See [`ResourceMonitor::cpu_usage_micros`].
pub fn cpu_usage_micros() -> u64 {
    DEFAULT_MONITOR.cpu_usage_micros()
}

/// See [`ResourceMonitor::cpu_limit_cores`].
pub fn cpu_limit_cores() -> f64 {
    DEFAULT_MONITOR.cpu_limit_cores()
}

/// See [`ResourceMonitor::cpu_limit_millicores`].
pub fn cpu_limit_millicores() -> i64 {
    DEFAULT_MONITOR.cpu_limit_millicores()
}

/// See [`ResourceMonitor::mem_usage`].
pub fn mem_usage() -> f64 {
    DEFAULT_MONITOR.mem_usage()
}

/// See [`ResourceMonitor::memory_limit_bytes`].
pub fn memory_limit_bytes() -> u64 {
    DEFAULT_MONITOR.memory_limit_bytes()
}

/// See [`ResourceMonitor::memory_used_bytes`].
pub fn memory_used_bytes() -> u64 {
    DEFAULT_MONITOR.memory_used_bytes()
}

/// See [`ResourceMonitor::reset_state`].
pub fn reset_state() {
    DEFAULT_MONITOR.reset_state()
}

/// See [`ResourceMonitor::snapshot`].
pub fn snapshot() -> ResourceSnapshot {
    DEFAULT_MONITOR.snapshot()
}
