use std::path::Path;
use std::sync::Arc;

use super::{MetricSource, procfs};
use crate::config::Paths;
use crate::error::ResultOkLogExt;
use crate::fsutil::{self, FileProbe};
use crate::stats::{
    CfsPeriod, CfsQuota, CpuAcctUsage, MemoryLimit, MemoryUsage, SingleLineStat,
    quota_to_millicores,
};

/// Reads the per-controller cgroup v1 hierarchies.
///
/// CPU files are looked up in the dedicated hierarchy first (`cpuacct/`, `cpu/`)
/// and then in the combined `cpu,cpuacct/` one.
#[derive(Debug)]
pub struct CgroupV1Source {
    probe: Arc<dyn FileProbe>,
    paths: Paths,
}

impl CgroupV1Source {
    pub fn new(probe: Arc<dyn FileProbe>, paths: Paths) -> Self {
        Self { probe, paths }
    }

    /// Reads one quota/period pair.
    ///
    /// `None` if the quota file is unreadable, so the caller tries the next pair.
    /// `Some(None)` for an unlimited quota or an unusable period.
    fn cfs_limit(&self, quota: &Path, period: &Path) -> Option<Option<u64>> {
        let quota = fsutil::read_parsed(self.probe.as_ref(), quota, CfsQuota::from_reader)
            .ok_log()?
            .quota_us;
        let Some(quota) = quota else {
            log::debug!("cfs quota is unlimited");
            return Some(None);
        };

        let period = fsutil::read_parsed(self.probe.as_ref(), period, CfsPeriod::from_reader)
            .ok_log()?
            .period_us;
        Some(quota_to_millicores(Some(quota), period))
    }
}

impl MetricSource for CgroupV1Source {
    fn usage_micros(&self) -> Option<u64> {
        let usage = self
            .paths
            .v1_cpuacct_usage()
            .iter()
            .find_map(|path| {
                fsutil::read_parsed(self.probe.as_ref(), path, CpuAcctUsage::from_reader).ok_log()
            })
            .map_or(0, |usage| usage.usage_micros());
        Some(usage)
    }

    fn limit_millicores(&self) -> Option<u64> {
        self.paths
            .v1_cfs()
            .iter()
            .find_map(|(quota, period)| self.cfs_limit(quota, period))
            .flatten()
    }

    fn memory_limit_bytes(&self) -> u64 {
        let limit = fsutil::read_parsed(
            self.probe.as_ref(),
            &self.paths.v1_memory_limit(),
            MemoryLimit::from_reader,
        )
        .ok_log()
        .and_then(|limit| limit.v1_effective().limit_bytes);

        limit.unwrap_or_else(|| {
            log::debug!("no cgroup v1 memory limit, using /proc/meminfo total");
            procfs::meminfo_total_bytes(self.probe.as_ref(), &self.paths)
        })
    }

    fn memory_used_bytes(&self) -> u64 {
        fsutil::read_parsed(
            self.probe.as_ref(),
            &self.paths.v1_memory_usage(),
            MemoryUsage::from_reader,
        )
        .ok_log()
        .map_or(0, |usage| usage.usage_bytes)
    }

    fn load_average(&self) -> Option<f64> {
        procfs::load_average(self.probe.as_ref(), &self.paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRoot;

    fn source(root: &FakeRoot) -> CgroupV1Source {
        CgroupV1Source::new(Arc::new(root.probe()), root.paths())
    }

    #[test]
    fn test_usage_prefers_dedicated_hierarchy() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpuacct/cpuacct.usage", "2000000000\n");
        root.write("sys/fs/cgroup/cpu,cpuacct/cpuacct.usage", "7000000000\n");
        assert_eq!(source(&root).usage_micros(), Some(2_000_000));
    }

    #[test]
    fn test_usage_from_combined_hierarchy() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpu,cpuacct/cpuacct.usage", "2500000000\n");
        assert_eq!(source(&root).usage_micros(), Some(2_500_000));
    }

    #[test]
    fn test_usage_unreadable_is_zero() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpuacct/cpuacct.usage", "not-a-number\n");
        assert_eq!(source(&root).usage_micros(), Some(0));
    }

    #[test]
    fn test_cfs_limit() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpu/cpu.cfs_quota_us", "150000\n");
        root.write("sys/fs/cgroup/cpu/cpu.cfs_period_us", "100000\n");
        assert_eq!(source(&root).limit_millicores(), Some(1500));
    }

    #[test]
    fn test_cfs_unlimited_quota() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpu/cpu.cfs_quota_us", "-1\n");
        root.write("sys/fs/cgroup/cpu/cpu.cfs_period_us", "100000\n");
        root.write("sys/fs/cgroup/cpu,cpuacct/cpu.cfs_quota_us", "50000\n");
        root.write("sys/fs/cgroup/cpu,cpuacct/cpu.cfs_period_us", "100000\n");
        assert_eq!(source(&root).limit_millicores(), None);
    }

    #[test]
    fn test_cfs_limit_from_combined_hierarchy() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpu,cpuacct/cpu.cfs_quota_us", "50000\n");
        root.write("sys/fs/cgroup/cpu,cpuacct/cpu.cfs_period_us", "100000\n");
        assert_eq!(source(&root).limit_millicores(), Some(500));
    }

    #[test]
    fn test_cfs_zero_period() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpu/cpu.cfs_quota_us", "50000\n");
        root.write("sys/fs/cgroup/cpu/cpu.cfs_period_us", "0\n");
        assert_eq!(source(&root).limit_millicores(), None);
    }

    #[test]
    fn test_memory_limit_and_usage() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/memory/memory.limit_in_bytes", "536870912\n");
        root.write("sys/fs/cgroup/memory/memory.usage_in_bytes", "134217728\n");

        let source = source(&root);
        assert_eq!(source.memory_limit_bytes(), 536_870_912);
        assert_eq!(source.memory_used_bytes(), 134_217_728);
    }

    #[test]
    fn test_unlimited_memory_falls_back_to_meminfo() {
        let root = FakeRoot::new();
        root.write(
            "sys/fs/cgroup/memory/memory.limit_in_bytes",
            "9223372036854771712\n",
        );
        root.write("proc/meminfo", "MemTotal: 2048 kB\nMemAvailable: 1024 kB\n");
        assert_eq!(source(&root).memory_limit_bytes(), 2048 * 1024);
    }
}
