//! Parsers for memory accounting files.
//!
//! - `memory.current` (v2) and `memory.usage_in_bytes` (v1): a single byte count.
//! - `memory.max` (v2) and `memory.limit_in_bytes` (v1): a byte count, or `max` on v2.
//! - `/proc/meminfo`: `Key:   <value> kB` lines, of which `MemTotal` and `MemAvailable` are used.
//!
//! # Examples
//!
//! ```rust
//! use sysres::stats::{KeyValueStat, MemInfo, MemoryLimit, SingleLineStat};
//!
//! let limit = MemoryLimit::from_reader(&mut "max\n".as_bytes()).unwrap();
//! assert_eq!(limit.limit_bytes, None);
//!
//! let meminfo = MemInfo::from_reader(&mut "MemTotal: 4 kB\nMemAvailable: 1 kB\n".as_bytes()).unwrap();
//! assert_eq!(meminfo.total_bytes(), Some(4096));
//! assert_eq!(meminfo.used_bytes(), Some(3072));
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::parser::{parse_single, read_first_line};
use super::{KeyValueStat, SingleLineStat};

/// Values at or above this are the "no limit" sentinel of cgroup v1
/// (`LONG_MAX` rounded down to the page size).
pub const V1_UNLIMITED_THRESHOLD: u64 = 9_000_000_000_000_000_000;

/// Current memory usage from `memory.current` or `memory.usage_in_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    /// Total memory usage in bytes.
    pub usage_bytes: u64,
}

impl SingleLineStat for MemoryUsage {
    /// Parses a single numeric byte count.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `InvalidData` if the value cannot be parsed as a `u64`.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        Ok(MemoryUsage {
            usage_bytes: parse_single(&line)?,
        })
    }
}

/// Memory limit from `memory.max` or `memory.limit_in_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryLimit {
    /// Memory limit in bytes, `None` when the file says `max`.
    pub limit_bytes: Option<u64>,
}

impl MemoryLimit {
    /// Applies the cgroup v1 convention that a huge value means "no limit".
    pub fn v1_effective(self) -> Self {
        Self {
            limit_bytes: self.limit_bytes.filter(|b| *b < V1_UNLIMITED_THRESHOLD),
        }
    }

    pub fn is_limited(&self) -> bool {
        self.limit_bytes.is_some()
    }
}

impl SingleLineStat for MemoryLimit {
    /// Parses either a byte count or the literal `max`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `InvalidData` for anything else, so `max` is never read as `0`.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        let limit_bytes = match line.as_str() {
            "max" => None,
            value => Some(parse_single::<u64>(value)?),
        };

        Ok(MemoryLimit { limit_bytes })
    }
}

/// The subset of `/proc/meminfo` used for host memory accounting. Values are in kB.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemInfo {
    pub mem_total_kb: Option<u64>,
    pub mem_available_kb: Option<u64>,
}

impl MemInfo {
    fn set_mem_total(&mut self, v: u64) {
        self.mem_total_kb = Some(v);
    }

    fn set_mem_available(&mut self, v: u64) {
        self.mem_available_kb = Some(v);
    }

    /// `MemTotal` in bytes.
    pub fn total_bytes(&self) -> Option<u64> {
        self.mem_total_kb.map(|kb| kb.saturating_mul(1024))
    }

    /// `MemTotal - MemAvailable` in bytes.
    ///
    /// Reclaimable page cache counts as available here, not as used.
    pub fn used_bytes(&self) -> Option<u64> {
        let total = self.mem_total_kb?;
        let available = self.mem_available_kb?;
        Some(total.saturating_sub(available).saturating_mul(1024))
    }
}

type Setter = fn(&mut MemInfo, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(2);

    m.insert("MemTotal:", MemInfo::set_mem_total);
    m.insert("MemAvailable:", MemInfo::set_mem_available);

    m
});

impl KeyValueStat for MemInfo {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}
