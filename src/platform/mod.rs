//! Platform detection.
//!
//! Determines which of a fixed set of environments the process runs in, where
//! its cgroup v2 controller files live, and whether a memory limit confines it.
mod container;
mod detect;
mod membership;

pub use container::classify_container;
pub use detect::{CgroupVersion, Detection, Platform, detect};
pub(crate) use detect::detect_linux;
pub use membership::{
    CgroupMembership, ParseError, find_unified_path, parse_membership_line, resolve_cgroup_dir,
};
