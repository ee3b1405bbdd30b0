use crate::error::ProbeError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Upper-bound thresholds for utilization style metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Thresholds {
    pub fn new(warning: f64, critical: f64) -> Result<Self, ProbeError> {
        if warning > critical {
            return Err(ProbeError::Thresholds(
                "warning threshold greater than critical threshold".to_string(),
            ));
        }
        if warning == critical {
            return Err(ProbeError::Thresholds(
                "warning and critical threshold are equal".to_string(),
            ));
        }
        Ok(Self { warning, critical })
    }

    pub fn classify(&self, value: f64) -> Status {
        if value <= self.warning {
            Status::Ok
        } else if value < self.critical {
            Status::Warning
        } else {
            Status::Critical
        }
    }
}

/// Inclusive range for the established connection count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionBounds {
    pub min: u64,
    pub max: u64,
}

impl ConnectionBounds {
    pub fn new(min: u64, max: u64) -> Result<Self, ProbeError> {
        if min > max {
            return Err(ProbeError::Thresholds(
                "minimal threshold greater than maximum threshold".to_string(),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn classify(&self, established: u64) -> Status {
        if (self.min..=self.max).contains(&established) {
            Status::Ok
        } else {
            Status::Critical
        }
    }
}

/// Ordered `'key'=value` pairs appended after the `|` of a plugin line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerfData(Vec<(String, f64)>);

impl PerfData {
    pub fn push(&mut self, key: impl Into<String>, value: f64) {
        self.0.push((key.into(), value));
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "'{key}'={value:.2}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub status: Status,
    pub summary: String,
    pub perfdata: PerfData,
}

impl Report {
    pub fn new(status: Status, summary: String, perfdata: PerfData) -> Self {
        Self {
            status,
            summary,
            perfdata,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.summary, self.perfdata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_bound_classification_edges() {
        let t = Thresholds::new(80.0, 90.0).unwrap();
        assert_eq!(t.classify(0.0), Status::Ok);
        assert_eq!(t.classify(80.0), Status::Ok);
        assert_eq!(t.classify(80.01), Status::Warning);
        assert_eq!(t.classify(89.99), Status::Warning);
        assert_eq!(t.classify(90.0), Status::Critical);
        assert_eq!(t.classify(150.0), Status::Critical);
    }

    #[test]
    fn inverted_or_equal_thresholds_are_rejected() {
        assert!(matches!(Thresholds::new(90.0, 80.0), Err(ProbeError::Thresholds(_))));
        assert!(matches!(Thresholds::new(80.0, 80.0), Err(ProbeError::Thresholds(_))));
    }

    #[test]
    fn connection_bounds_are_inclusive() {
        let b = ConnectionBounds::new(1, 2).unwrap();
        assert_eq!(b.classify(0), Status::Critical);
        assert_eq!(b.classify(1), Status::Ok);
        assert_eq!(b.classify(2), Status::Ok);
        assert_eq!(b.classify(3), Status::Critical);
        assert!(ConnectionBounds::new(3, 2).is_err());
        assert!(ConnectionBounds::new(2, 2).is_ok());
    }

    #[test]
    fn exit_codes_follow_plugin_convention() {
        assert_eq!(Status::Ok.exit_code(), 0);
        assert_eq!(Status::Warning.exit_code(), 1);
        assert_eq!(Status::Critical.exit_code(), 2);
        assert_eq!(Status::Unknown.exit_code(), 3);
    }

    #[test]
    fn report_renders_plugin_line() {
        let mut perf = PerfData::default();
        perf.push("load1", 0.25);
        perf.push("load5", 1.0 / 3.0);
        let report = Report::new(Status::Ok, "Load average OK 0.25".to_string(), perf);
        assert_eq!(
            report.to_string(),
            "Load average OK 0.25 | 'load1'=0.25 'load5'=0.33"
        );
        assert_eq!(report.perfdata.get("load1"), Some(0.25));
    }
}
