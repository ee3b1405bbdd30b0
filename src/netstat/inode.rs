//! Socket inode -> owning PID resolution.
//!
//! The index is built by walking `<proc_root>/<pid>/fd/<n>` and reading each
//! descriptor symlink. Processes exit and descriptors close while the walk is
//! running, and other users' `fd` directories are unreadable without root, so
//! every per-process and per-descriptor failure is skipped. A missing mapping
//! means "owner unknown", never an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

#[derive(Debug, Default, Clone)]
pub struct InodeIndex {
    owners: HashMap<u64, u32>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ScanStats {
    processes: usize,
    descriptors: usize,
    skipped: usize,
}

impl InodeIndex {
    pub fn build(proc_root: &Path) -> Self {
        let mut index = Self::default();
        let mut stats = ScanStats::default();

        for pid in numeric_entries(proc_root) {
            let fd_dir = proc_root.join(pid.to_string()).join("fd");
            let descriptors = match fs::read_dir(&fd_dir) {
                Ok(dir) => dir,
                Err(err) => {
                    trace!(pid, error = %err, "fd directory unreadable");
                    stats.skipped += 1;
                    continue;
                }
            };
            stats.processes += 1;

            let mut fds: Vec<(u32, PathBuf)> = descriptors
                .flatten()
                .filter_map(|entry| {
                    let fd = entry.file_name().to_str()?.parse().ok()?;
                    Some((fd, entry.path()))
                })
                .collect();
            fds.sort_unstable_by_key(|(fd, _)| *fd);

            for (fd, path) in fds {
                stats.descriptors += 1;
                let target = match fs::read_link(&path) {
                    Ok(target) => target,
                    Err(err) => {
                        trace!(pid, fd, error = %err, "descriptor vanished");
                        stats.skipped += 1;
                        continue;
                    }
                };
                if let Some(inode) = parse_socket_inode(&target.to_string_lossy()) {
                    index.owners.entry(inode).or_insert(pid);
                }
            }
        }

        debug!(
            processes = stats.processes,
            descriptors = stats.descriptors,
            skipped = stats.skipped,
            sockets = index.owners.len(),
            "inode index built"
        );
        index
    }

    pub fn lookup(&self, inode: u64) -> Option<u32> {
        self.owners.get(&inode).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// `"socket:[12345]"` -> `Some(12345)`.
pub(crate) fn parse_socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?.strip_suffix(']')?.parse().ok()
}

/// Target of `<proc_root>/<pid>/exe`, if it can still be read.
pub fn executable_path(proc_root: &Path, pid: u32) -> Option<PathBuf> {
    fs::read_link(proc_root.join(pid.to_string()).join("exe")).ok()
}

/// Numeric directory names under the procfs root, ascending.
fn numeric_entries(proc_root: &Path) -> Vec<u32> {
    let entries = match fs::read_dir(proc_root) {
        Ok(dir) => dir,
        Err(err) => {
            debug!(root = %proc_root.display(), error = %err, "process table unreadable");
            return Vec::new();
        }
    };
    let mut pids: Vec<u32> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .collect();
    pids.sort_unstable();
    pids
}
