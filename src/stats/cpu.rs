//! Parsers for the CPU accounting and bandwidth files of both cgroup versions.
//!
//! - `cpu.stat` (v2): key-value lines; only `usage_usec` is of interest.
//! - `cpu.max` (v2): `"<quota> <period>"` where quota may be `max`.
//! - `cpuacct.usage` (v1): cumulative CPU time in nanoseconds.
//! - `cpu.cfs_quota_us` / `cpu.cfs_period_us` (v1): one integer each, quota `-1` meaning unlimited.
//!
//! # Examples
//!
//! ```rust
//! use sysres::stats::{CpuMax, CpuStat, KeyValueStat, SingleLineStat};
//!
//! let stat = CpuStat::from_reader(&mut "usage_usec 1000000\nuser_usec 600000\n".as_bytes()).unwrap();
//! assert_eq!(stat.usage_usec, 1_000_000);
//!
//! let max = CpuMax::from_reader(&mut "200000 100000\n".as_bytes()).unwrap();
//! assert_eq!(max.millicores(), Some(2000));
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::parser::{parse_single, read_first_line};
use super::{KeyValueStat, SingleLineStat, StatParseError};

/// Parsed `cpu.stat` of a cgroup v2 directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuStat {
    /// Total CPU time (user + system) consumed by every process in the cgroup, in microseconds.
    pub usage_usec: u64,
}

impl CpuStat {
    fn set_usage_usec(&mut self, usage_usec: u64) {
        self.usage_usec = usage_usec;
    }
}

type Setter = fn(&mut CpuStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(1);
    m.insert("usage_usec", CpuStat::set_usage_usec);
    m
});

impl KeyValueStat for CpuStat {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}

/// Converts a quota/period pair into millicores.
///
/// Returns `None` for an unlimited quota or a zero period.
pub fn quota_to_millicores(quota: Option<u64>, period: u64) -> Option<u64> {
    let quota = quota?;
    if period == 0 {
        return None;
    }
    Some(quota.saturating_mul(1000) / period)
}

/// Parsed `cpu.max` of a cgroup v2 directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuMax {
    /// CPU time allowed per period in microseconds, `None` when the file says `max`.
    pub quota: Option<u64>,
    /// Length of the enforcement period in microseconds.
    pub period: u64,
}

impl CpuMax {
    /// Returns the limit in millicores, `None` if unlimited.
    pub fn millicores(&self) -> Option<u64> {
        quota_to_millicores(self.quota, self.period)
    }
}

impl SingleLineStat for CpuMax {
    /// Parses `"<quota> <period>"` or `"max <period>"`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `InvalidData` if the period is missing or either
    /// field is not an integer. `max` is never read as a number.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        let mut parts = line.split_whitespace();
        let quota = parts
            .next()
            .ok_or(StatParseError::MissingField { field: "quota" })?;
        let period = parts
            .next()
            .ok_or(StatParseError::MissingField { field: "period" })?;

        let quota = match quota {
            "max" => None,
            value => Some(parse_single::<u64>(value)?),
        };
        let period = parse_single::<u64>(period)?;

        Ok(CpuMax { quota, period })
    }
}

/// Parsed `cpuacct.usage` of a cgroup v1 hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuAcctUsage {
    /// Cumulative CPU time in nanoseconds.
    pub usage_ns: u64,
}

impl CpuAcctUsage {
    pub fn usage_micros(&self) -> u64 {
        self.usage_ns / 1000
    }
}

impl SingleLineStat for CpuAcctUsage {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        Ok(CpuAcctUsage {
            usage_ns: parse_single(&line)?,
        })
    }
}

/// Parsed `cpu.cfs_quota_us` of a cgroup v1 hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfsQuota {
    /// Quota in microseconds, `None` when the file holds `-1`.
    pub quota_us: Option<u64>,
}

impl SingleLineStat for CfsQuota {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        let raw = parse_single::<i64>(&line)?;
        Ok(CfsQuota {
            quota_us: u64::try_from(raw).ok(),
        })
    }
}

/// Parsed `cpu.cfs_period_us` of a cgroup v1 hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfsPeriod {
    pub period_us: u64,
}

impl SingleLineStat for CfsPeriod {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        Ok(CfsPeriod {
            period_us: parse_single(&line)?,
        })
    }
}
