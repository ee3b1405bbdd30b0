use crate::alert::{PerfData, Report, Status, Thresholds};
use crate::error::{read_text, ProbeError};
use std::path::Path;
use sysinfo::{CpuRefreshKind, RefreshKind, System, SystemExt};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

pub fn parse_loadavg(content: &str) -> Result<LoadAverage, ProbeError> {
    let mut columns = content.split_whitespace();
    let mut next = |field: &'static str| -> Result<f64, ProbeError> {
        let raw = columns.next().ok_or(ProbeError::MissingField {
            file: "loadavg".to_string(),
            field,
        })?;
        raw.parse()
            .map_err(|_| ProbeError::malformed(raw, "expected a load average"))
    };
    Ok(LoadAverage {
        load1: next("load1")?,
        load5: next("load5")?,
        load15: next("load15")?,
    })
}

pub fn logical_cpus() -> usize {
    let system = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
    system.cpus().len().max(1)
}

/// `cpus` divides load1 before classification when set.
pub fn load_report(load: &LoadAverage, thresholds: &Thresholds, cpus: Option<usize>, no_alert: bool) -> Report {
    let measured = match cpus {
        Some(n) if n > 0 => load.load1 / n as f64,
        _ => load.load1,
    };
    let status = if no_alert {
        Status::Ok
    } else {
        thresholds.classify(measured)
    };
    let mut perfdata = PerfData::default();
    perfdata.push("load1", load.load1);
    perfdata.push("load5", load.load5);
    perfdata.push("load15", load.load15);
    Report::new(
        status,
        format!(
            "Load average {status} {:.2}, {:.2}, {:.2}",
            load.load1, load.load5, load.load15
        ),
        perfdata,
    )
}

pub fn check_load(
    proc_root: &Path,
    thresholds: &Thresholds,
    per_cpu: bool,
    no_alert: bool,
) -> Result<Report, ProbeError> {
    let load = parse_loadavg(&read_text(&proc_root.join("loadavg"))?)?;
    let cpus = per_cpu.then(logical_cpus);
    Ok(load_report(&load, thresholds, cpus, no_alert))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loadavg_line() {
        let load = parse_loadavg("0.25 0.10 0.13 1/423 31337\n").unwrap();
        assert_eq!(
            load,
            LoadAverage {
                load1: 0.25,
                load5: 0.10,
                load15: 0.13
            }
        );
        assert!(matches!(
            parse_loadavg("0.25"),
            Err(ProbeError::MissingField { field: "load5", .. })
        ));
        assert!(parse_loadavg("abc 1 1").is_err());
    }

    #[test]
    fn per_cpu_division_changes_classification() {
        let load = LoadAverage {
            load1: 3.0,
            load5: 2.0,
            load15: 1.0,
        };
        let t = Thresholds::new(1.0, 2.0).unwrap();
        assert_eq!(load_report(&load, &t, None, false).status, Status::Critical);
        assert_eq!(load_report(&load, &t, Some(2), false).status, Status::Warning);
        assert_eq!(load_report(&load, &t, Some(4), false).status, Status::Ok);
        assert_eq!(
            load_report(&load, &t, Some(4), false).to_string(),
            "Load average OK 3.00, 2.00, 1.00 | 'load1'=3.00 'load5'=2.00 'load15'=1.00"
        );
    }

    #[test]
    fn host_has_at_least_one_cpu() {
        assert!(logical_cpus() >= 1);
    }
}
