use std::sync::Arc;

use super::{MetricSource, procfs};
use crate::config::Paths;
use crate::fsutil::FileProbe;

/// Linux without cgroup accounting. Everything comes from `/proc`.
#[derive(Debug)]
pub struct HostSource {
    probe: Arc<dyn FileProbe>,
    paths: Paths,
}

impl HostSource {
    pub fn new(probe: Arc<dyn FileProbe>, paths: Paths) -> Self {
        Self { probe, paths }
    }
}

impl MetricSource for HostSource {
    fn usage_micros(&self) -> Option<u64> {
        None
    }

    fn limit_millicores(&self) -> Option<u64> {
        None
    }

    fn memory_limit_bytes(&self) -> u64 {
        procfs::meminfo_total_bytes(self.probe.as_ref(), &self.paths)
    }

    fn memory_used_bytes(&self) -> u64 {
        procfs::meminfo_used_bytes(self.probe.as_ref(), &self.paths)
    }

    fn load_average(&self) -> Option<f64> {
        procfs::load_average(self.probe.as_ref(), &self.paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRoot;

    #[test]
    fn test_host_reads_proc() {
        let root = FakeRoot::new();
        root.write(
            "proc/meminfo",
            "MemTotal:       8000 kB\nMemFree:        1000 kB\nMemAvailable:   6000 kB\nBuffers: 12 kB\n",
        );
        root.write("proc/loadavg", "0.50 0.40 0.30 1/100 42\n");

        let source = HostSource::new(Arc::new(root.probe()), root.paths());
        assert_eq!(source.usage_micros(), None);
        assert_eq!(source.limit_millicores(), None);
        assert_eq!(source.memory_limit_bytes(), 8000 * 1024);
        assert_eq!(source.memory_used_bytes(), 2000 * 1024);
        assert_eq!(source.load_average(), Some(0.5));
    }

    #[test]
    fn test_host_without_mem_available() {
        let root = FakeRoot::new();
        root.write("proc/meminfo", "MemTotal: 8000 kB\nMemFree: 1000 kB\n");

        let source = HostSource::new(Arc::new(root.probe()), root.paths());
        assert_eq!(source.memory_limit_bytes(), 8000 * 1024);
        assert_eq!(source.memory_used_bytes(), 0);
    }
}
