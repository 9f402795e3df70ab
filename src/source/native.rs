//! Native readers for macOS and other non-Linux Unix hosts, backed by `sysinfo`.

use sysinfo::System;

use super::MetricSource;

/// Number of logical CPUs available to the process.
pub fn current_cpu_limit_cores() -> f64 {
    num_cpus::get() as f64
}

/// Returns `(used_bytes, total_bytes)` of physical memory.
pub fn current_memory_stats() -> (u64, u64) {
    let mut sys = System::new();
    sys.refresh_memory();
    (sys.used_memory(), sys.total_memory())
}

/// Source for non-Linux hosts. There is no cgroup, so limits are host-wide.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOsSource;

impl MetricSource for MacOsSource {
    fn usage_micros(&self) -> Option<u64> {
        None
    }

    fn limit_millicores(&self) -> Option<u64> {
        None
    }

    fn memory_limit_bytes(&self) -> u64 {
        current_memory_stats().1
    }

    fn memory_used_bytes(&self) -> u64 {
        current_memory_stats().0
    }

    fn load_average(&self) -> Option<f64> {
        let load = System::load_average();
        Some(load.one).filter(|one| one.is_finite() && *one >= 0.0)
    }

    fn logical_cpus(&self) -> f64 {
        current_cpu_limit_cores()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_readers() {
        assert!(current_cpu_limit_cores() >= 1.0);

        let (used, total) = current_memory_stats();
        assert!(total > 0);
        assert!(used <= total);
    }
}
