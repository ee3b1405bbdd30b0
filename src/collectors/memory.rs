use crate::alert::{PerfData, Report, Status, Thresholds};
use crate::error::{read_text, ProbeError};
use std::collections::HashMap;
use std::path::Path;

/// `Key:   value kB` lines of `/proc/meminfo`, values in kB.
pub fn parse_meminfo(content: &str) -> HashMap<String, u64> {
    content
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim().to_string(), value))
        })
        .collect()
}

fn field(info: &HashMap<String, u64>, name: &'static str) -> Result<f64, ProbeError> {
    info.get(name)
        .map(|v| *v as f64)
        .ok_or(ProbeError::MissingField {
            file: "meminfo".to_string(),
            field: name,
        })
}

fn percent_in_use(available: f64, total: f64) -> f64 {
    if total > 0.0 {
        100.0 - (available / total) * 100.0
    } else {
        0.0
    }
}

/// Buffers and page cache are counted as free memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub total: f64,
    pub free: f64,
    pub buffers: f64,
    pub cached: f64,
    pub used: f64,
    pub perc_inuse: f64,
}

pub fn memory_usage(info: &HashMap<String, u64>) -> Result<MemoryUsage, ProbeError> {
    let total = field(info, "MemTotal")?;
    let free = field(info, "MemFree")?;
    let buffers = field(info, "Buffers")?;
    let cached = field(info, "Cached")?;
    let available = free + buffers + cached;
    Ok(MemoryUsage {
        total,
        free,
        buffers,
        cached,
        used: (total - available).max(0.0),
        perc_inuse: percent_in_use(available, total),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapUsage {
    pub total: f64,
    pub free: f64,
    pub perc_inuse: f64,
}

pub fn swap_usage(info: &HashMap<String, u64>) -> Result<SwapUsage, ProbeError> {
    let total = field(info, "SwapTotal")?;
    let free = field(info, "SwapFree")?;
    Ok(SwapUsage {
        total,
        free,
        perc_inuse: percent_in_use(free, total),
    })
}

pub fn check_memory(proc_root: &Path, thresholds: &Thresholds, no_alert: bool) -> Result<Report, ProbeError> {
    let info = parse_meminfo(&read_text(&proc_root.join("meminfo"))?);
    let usage = memory_usage(&info)?;
    let status = if no_alert {
        Status::Ok
    } else {
        thresholds.classify(usage.perc_inuse)
    };
    let mut perfdata = PerfData::default();
    perfdata.push("total", usage.total);
    perfdata.push("free", usage.free);
    perfdata.push("buffers", usage.buffers);
    perfdata.push("cached", usage.cached);
    perfdata.push("used", usage.used);
    perfdata.push("perc_inuse", usage.perc_inuse);
    Ok(Report::new(
        status,
        format!("Memory {status} {:.2}% in use", usage.perc_inuse),
        perfdata,
    ))
}

pub fn check_swap(proc_root: &Path, thresholds: &Thresholds, no_alert: bool) -> Result<Report, ProbeError> {
    let info = parse_meminfo(&read_text(&proc_root.join("meminfo"))?);
    let usage = swap_usage(&info)?;
    let status = if no_alert {
        Status::Ok
    } else {
        thresholds.classify(usage.perc_inuse)
    };
    let mut perfdata = PerfData::default();
    perfdata.push("swap_total", usage.total);
    perfdata.push("swap_free", usage.free);
    perfdata.push("perc_inuse", usage.perc_inuse);
    Ok(Report::new(
        status,
        format!("Swap {status} {:.2}% in use", usage.perc_inuse),
        perfdata,
    ))
}
