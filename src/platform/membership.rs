//! Parser for `/proc/[pid]/cgroup` and resolution of the process's cgroup v2 directory.
//!
//! Each line has the format `<hierarchy-id>:<controller-list>:<cgroup-path>`:
//!
//! - v1 lines carry an arbitrary hierarchy id and a comma-separated controller list.
//! - The v2 (unified) line always has hierarchy id `0` and an empty controller list.
//!
//! Inside a container with its own cgroup namespace the unified path is `/`.
//! A native process on a systemd host sits in a slice such as
//! `/user.slice/user-1000.slice/session-2.scope`, and its controller files live
//! below that path, not at the mount root.

use std::path::{Path, PathBuf};

use crate::fsutil::FileProbe;

/// Represents a parsed `/proc/[pid]/cgroup` line.
#[derive(Debug, PartialEq, Eq)]
pub struct CgroupMembership<'a> {
    /// Hierarchy id, `0` for the unified hierarchy.
    pub hierarchy_id: &'a str,
    /// Comma-separated controllers, empty for the unified hierarchy.
    pub controllers: &'a str,
    /// Path of the cgroup relative to the hierarchy's mount point.
    pub path: &'a str,
}

impl CgroupMembership<'_> {
    /// Returns `true` for the cgroup v2 entry.
    pub fn is_unified(&self) -> bool {
        self.hierarchy_id == "0" && self.controllers.is_empty()
    }
}

/// Errors that may occur when parsing a `/proc/[pid]/cgroup` line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing `{field}` in cgroup membership line: `{line}`")]
    MissingField { field: &'static str, line: String },
}

/// Parses a single `/proc/[pid]/cgroup` line.
///
/// The path may itself contain `:`, so the line is split at most twice.
///
/// # Errors
///
/// Returns [`ParseError::MissingField`] if the line has fewer than three fields.
pub fn parse_membership_line(line: &str) -> Result<CgroupMembership<'_>, ParseError> {
    let mut fields = line.splitn(3, ':');
    let hierarchy_id = fields.next().ok_or_else(|| ParseError::MissingField {
        field: "hierarchy_id",
        line: line.to_owned(),
    })?;
    let controllers = fields.next().ok_or_else(|| ParseError::MissingField {
        field: "controllers",
        line: line.to_owned(),
    })?;
    let path = fields.next().ok_or_else(|| ParseError::MissingField {
        field: "path",
        line: line.to_owned(),
    })?;

    Ok(CgroupMembership {
        hierarchy_id,
        controllers,
        path: path.trim_end(),
    })
}

/// Finds the unified cgroup path in the content of `/proc/[pid]/cgroup`.
///
/// Malformed lines are skipped.
pub fn find_unified_path(content: &str) -> Option<&str> {
    content
        .lines()
        .filter_map(|line| match parse_membership_line(line) {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!("skipping cgroup membership line: {err}");
                None
            }
        })
        .find(|entry| entry.is_unified())
        .map(|entry| entry.path)
}

/// Joins a cgroup path onto the mount root.
///
/// Returns `None` for paths escaping the root (`..`), which is how the kernel
/// reports a cgroup outside the reader's cgroup namespace.
pub fn join_cgroup_path(mount_root: &Path, cgroup_path: &str) -> Option<PathBuf> {
    let mut dir = mount_root.to_path_buf();
    for component in cgroup_path.split('/') {
        match component {
            "" | "." => {}
            ".." => return None,
            name => dir.push(name),
        }
    }
    Some(dir)
}

/// Resolves the directory holding the calling process's cgroup v2 controller files.
///
/// Falls back to `mount_root` when `self_cgroup` is unreadable, has no unified
/// entry, or names a path outside the namespace.
pub fn resolve_cgroup_dir(probe: &dyn FileProbe, self_cgroup: &Path, mount_root: &Path) -> PathBuf {
    let content = match probe.read(self_cgroup) {
        Ok(content) => content,
        Err(err) => {
            log::debug!("using cgroup mount root, membership unavailable: {err}");
            return mount_root.to_path_buf();
        }
    };

    let Some(path) = find_unified_path(&content) else {
        log::debug!(
            "no unified entry in `{}`, using cgroup mount root",
            self_cgroup.display()
        );
        return mount_root.to_path_buf();
    };

    match join_cgroup_path(mount_root, path) {
        Some(dir) => {
            log::debug!("resolved cgroup v2 directory: {}", dir.display());
            dir
        }
        None => {
            log::debug!("cgroup path `{path}` is outside the namespace, using mount root");
            mount_root.to_path_buf()
        }
    }
}
