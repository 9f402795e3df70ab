use std::path::PathBuf;
use std::sync::Arc;

use super::{MetricSource, procfs};
use crate::config::Paths;
use crate::error::ResultOkLogExt;
use crate::fsutil::{self, FileProbe};
use crate::stats::{CpuMax, CpuStat, KeyValueStat, MemoryLimit, MemoryUsage, SingleLineStat};

/// Reads the unified cgroup v2 files of the process's own cgroup directory.
#[derive(Debug)]
pub struct CgroupV2Source {
    probe: Arc<dyn FileProbe>,
    paths: Paths,
    dir: PathBuf,
}

impl CgroupV2Source {
    /// `dir` is the resolved cgroup directory, see [`crate::platform::resolve_cgroup_dir`].
    pub fn new(probe: Arc<dyn FileProbe>, paths: Paths, dir: PathBuf) -> Self {
        Self { probe, paths, dir }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl MetricSource for CgroupV2Source {
    fn usage_micros(&self) -> Option<u64> {
        let usage = fsutil::read_parsed(
            self.probe.as_ref(),
            &self.dir.join("cpu.stat"),
            CpuStat::from_reader,
        )
        .ok_log()
        .map_or(0, |stat| stat.usage_usec);
        Some(usage)
    }

    fn limit_millicores(&self) -> Option<u64> {
        fsutil::read_parsed(
            self.probe.as_ref(),
            &self.dir.join("cpu.max"),
            CpuMax::from_reader,
        )
        .ok_log()?
        .millicores()
    }

    fn memory_limit_bytes(&self) -> u64 {
        let limit = fsutil::read_parsed(
            self.probe.as_ref(),
            &self.dir.join("memory.max"),
            MemoryLimit::from_reader,
        )
        .ok_log()
        .and_then(|limit| limit.limit_bytes);

        limit.unwrap_or_else(|| {
            log::debug!("no cgroup v2 memory limit, using /proc/meminfo total");
            procfs::meminfo_total_bytes(self.probe.as_ref(), &self.paths)
        })
    }

    fn memory_used_bytes(&self) -> u64 {
        fsutil::read_parsed(
            self.probe.as_ref(),
            &self.dir.join("memory.current"),
            MemoryUsage::from_reader,
        )
        .ok_log()
        .map_or(0, |usage| usage.usage_bytes)
    }

    fn load_average(&self) -> Option<f64> {
        procfs::load_average(self.probe.as_ref(), &self.paths)
    }
}
