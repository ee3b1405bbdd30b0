use crate::alert::{PerfData, Report, Status, Thresholds};
use crate::error::{read_text, ProbeError};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const FIELDS: [&str; 8] = [
    "user", "nice", "sys", "idle", "iowait", "irq", "softirq", "steal",
];
const IDLE: usize = 3;

/// Cumulative jiffies from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes([u64; 8]);

impl CpuTimes {
    fn busy(&self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != IDLE)
            .map(|(_, v)| v)
            .sum()
    }
}

pub fn parse_stat(content: &str) -> Result<CpuTimes, ProbeError> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or(ProbeError::MissingField {
            file: "stat".to_string(),
            field: "cpu",
        })?;

    let mut times = [0_u64; 8];
    let mut columns = line.split_whitespace().skip(1);
    for (i, slot) in times.iter_mut().enumerate() {
        match columns.next() {
            Some(raw) => {
                *slot = raw
                    .parse()
                    .map_err(|_| ProbeError::malformed(raw, "expected jiffies counter"))?;
            }
            // kernels before 2.6.11 stop after softirq
            None if i > IDLE => break,
            None => {
                return Err(ProbeError::MissingField {
                    file: "stat".to_string(),
                    field: FIELDS[i],
                })
            }
        }
    }
    Ok(CpuTimes(times))
}

/// Share of each counter over the interval, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuUsage {
    pub fields: [f64; 8],
    pub in_use: f64,
}

pub fn cpu_usage(first: &CpuTimes, second: &CpuTimes) -> CpuUsage {
    let mut delta = [0_u64; 8];
    for (i, d) in delta.iter_mut().enumerate() {
        *d = second.0[i].saturating_sub(first.0[i]);
    }
    let delta = CpuTimes(delta);
    let total = delta.busy() + delta.0[IDLE];
    if total == 0 {
        return CpuUsage::default();
    }
    let pct = |v: u64| v as f64 * 100.0 / total as f64;
    let mut fields = [0.0; 8];
    for (i, f) in fields.iter_mut().enumerate() {
        *f = pct(delta.0[i]);
    }
    CpuUsage {
        fields,
        in_use: pct(delta.busy()),
    }
}

pub fn check_cpu(
    proc_root: &Path,
    interval: Duration,
    thresholds: &Thresholds,
    no_alert: bool,
) -> Result<Report, ProbeError> {
    let path = proc_root.join("stat");
    let first = parse_stat(&read_text(&path)?)?;
    std::thread::sleep(interval);
    let second = parse_stat(&read_text(&path)?)?;
    let usage = cpu_usage(&first, &second);
    debug!(interval = %humantime::format_duration(interval), in_use = usage.in_use, "cpu sampled");
    Ok(cpu_report(&usage, thresholds, no_alert))
}

pub fn cpu_report(usage: &CpuUsage, thresholds: &Thresholds, no_alert: bool) -> Report {
    let status = if no_alert {
        Status::Ok
    } else {
        thresholds.classify(usage.in_use)
    };
    let mut perfdata = PerfData::default();
    for (name, value) in FIELDS.iter().zip(usage.fields) {
        perfdata.push(*name, value);
    }
    perfdata.push("inuse", usage.in_use);
    perfdata.push("total", if usage.in_use + usage.fields[IDLE] > 0.0 { 100.0 } else { 0.0 });
    Report::new(
        status,
        format!("CPU {status} {:.2}% in use", usage.in_use),
        perfdata,
    )
}
