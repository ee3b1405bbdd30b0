use crate::alert::{PerfData, Report, Status, Thresholds};
use crate::error::{read_text, ProbeError};
use std::path::Path;
use sysinfo::{DiskExt, System, SystemExt};
use tracing::debug;

/// Mount points of `/proc/mounts` whose filesystem type is not excluded.
pub fn mount_points(content: &str, exclude_fstypes: &[String]) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _device = columns.next()?;
            let mount = columns.next()?;
            let fstype = columns.next()?;
            (!exclude_fstypes.iter().any(|t| t == fstype)).then(|| unescape_mount(mount))
        })
        .collect()
}

/// `/proc/mounts` octal-escapes space, tab, newline and backslash.
fn unescape_mount(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

/// Capacity figures in kB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub total: f64,
    pub used: f64,
    pub free: f64,
    pub perc_inuse: f64,
}

impl DiskUsage {
    pub fn from_bytes(total_bytes: u64, available_bytes: u64) -> Self {
        let total = (total_bytes / 1024) as f64;
        let free = (available_bytes / 1024) as f64;
        let used = (total_bytes.saturating_sub(available_bytes) / 1024) as f64;
        let perc_inuse = if total > 0.0 {
            100.0 - (free / total) * 100.0
        } else {
            0.0
        };
        Self {
            total,
            used,
            free,
            perc_inuse,
        }
    }
}

fn filesystem_usage(mount_point: &str) -> Result<DiskUsage, ProbeError> {
    let mut system = System::new();
    system.refresh_disks_list();
    system.refresh_disks();
    let disk = system
        .disks()
        .iter()
        .find(|d| d.mount_point() == Path::new(mount_point))
        .ok_or_else(|| ProbeError::InvalidMountPoint(mount_point.to_string()))?;
    debug!(
        mount = mount_point,
        total = disk.total_space(),
        available = disk.available_space(),
        "filesystem found"
    );
    Ok(DiskUsage::from_bytes(disk.total_space(), disk.available_space()))
}

pub fn disk_report(mount_point: &str, usage: &DiskUsage, thresholds: &Thresholds, no_alert: bool) -> Report {
    let status = if no_alert {
        Status::Ok
    } else {
        thresholds.classify(usage.perc_inuse)
    };
    let mut perfdata = PerfData::default();
    perfdata.push("total", usage.total);
    perfdata.push("used", usage.used);
    perfdata.push("free", usage.free);
    perfdata.push("perc_inuse", usage.perc_inuse);
    Report::new(
        status,
        format!("File system {mount_point} {status} {:.2}% in use", usage.perc_inuse),
        perfdata,
    )
}

pub fn check_disk(
    proc_root: &Path,
    mount_point: &str,
    exclude_fstypes: &[String],
    thresholds: &Thresholds,
    no_alert: bool,
) -> Result<Report, ProbeError> {
    let mounts = mount_points(&read_text(&proc_root.join("mounts"))?, exclude_fstypes);
    if !mounts.iter().any(|m| m == mount_point) {
        return Err(ProbeError::InvalidMountPoint(mount_point.to_string()));
    }
    let usage = filesystem_usage(mount_point)?;
    Ok(disk_report(mount_point, &usage, thresholds, no_alert))
}
