//! Typed parsers for the cgroup and procfs files the resolvers read.
//!
//! Every parser works on any [`std::io::BufRead`], so the same code handles
//! real files and in-memory fixtures. Malformed content is reported as a
//! [`StatParseError`] wrapped in an [`std::io::Error`] of kind `InvalidData`.
//!
//! # Main types
//!
//! - [`CpuStat`], [`CpuMax`]: cgroup v2 CPU accounting and bandwidth.
//! - [`CpuAcctUsage`], [`CfsQuota`], [`CfsPeriod`]: their cgroup v1 counterparts.
//! - [`MemoryUsage`], [`MemoryLimit`]: memory accounting for both versions.
//! - [`MemInfo`], [`LoadAvg`]: host-wide fallbacks from `/proc`.

mod cpu;
mod error;
mod loadavg;
mod memory;
mod parser;

pub use cpu::{CfsPeriod, CfsQuota, CpuAcctUsage, CpuMax, CpuStat, quota_to_millicores};
pub use error::StatParseError;
pub use loadavg::LoadAvg;
pub use memory::{MemInfo, MemoryLimit, MemoryUsage, V1_UNLIMITED_THRESHOLD};
pub use parser::{KeyValueStat, SingleLineStat};
