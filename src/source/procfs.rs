//! Host-wide fallbacks read from `/proc`.

use crate::config::Paths;
use crate::error::ResultOkLogExt;
use crate::fsutil::{self, FileProbe};
use crate::stats::{KeyValueStat, LoadAvg, MemInfo, SingleLineStat};

fn meminfo(probe: &dyn FileProbe, paths: &Paths) -> Option<MemInfo> {
    fsutil::read_parsed(probe, &paths.meminfo, MemInfo::from_reader).ok_log()
}

/// `MemTotal` in bytes, `0` if `/proc/meminfo` is unavailable.
pub(crate) fn meminfo_total_bytes(probe: &dyn FileProbe, paths: &Paths) -> u64 {
    meminfo(probe, paths)
        .and_then(|info| info.total_bytes())
        .unwrap_or(0)
}

/// `MemTotal - MemAvailable` in bytes, `0` if either line is missing.
pub(crate) fn meminfo_used_bytes(probe: &dyn FileProbe, paths: &Paths) -> u64 {
    meminfo(probe, paths)
        .and_then(|info| info.used_bytes())
        .unwrap_or(0)
}

/// The raw 1-minute load average.
pub(crate) fn load_average(probe: &dyn FileProbe, paths: &Paths) -> Option<f64> {
    fsutil::read_parsed(probe, &paths.loadavg, LoadAvg::from_reader)
        .ok_log()
        .map(|load| load.one)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRoot;

    #[test]
    fn test_meminfo_values() {
        let root = FakeRoot::new();
        root.write(
            "proc/meminfo",
            "MemTotal:       2048 kB\nMemFree:    512 kB\nMemAvailable:   1024 kB\n",
        );
        let paths = root.paths();

        assert_eq!(meminfo_total_bytes(&root.probe(), &paths), 2048 * 1024);
        assert_eq!(meminfo_used_bytes(&root.probe(), &paths), 1024 * 1024);
    }

    #[test]
    fn test_missing_proc_files() {
        let root = FakeRoot::new();
        let paths = root.paths();

        assert_eq!(meminfo_total_bytes(&root.probe(), &paths), 0);
        assert_eq!(meminfo_used_bytes(&root.probe(), &paths), 0);
        assert_eq!(load_average(&root.probe(), &paths), None);
    }

    #[test]
    fn test_load_average() {
        let root = FakeRoot::new();
        root.write("proc/loadavg", "3.00 2.00 1.00 2/345 6789\n");
        assert_eq!(load_average(&root.probe(), &root.paths()), Some(3.0));
    }
}
