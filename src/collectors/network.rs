use crate::alert::{PerfData, Report, Status, Thresholds};
use crate::error::{read_text, ProbeError};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Column order of `/proc/net/dev` after the `iface:` prefix.
pub const FIELDS: [&str; 16] = [
    "rx_bytes",
    "rx_packets",
    "rx_errs",
    "rx_drop",
    "rx_fifo",
    "rx_frame",
    "rx_compressed",
    "rx_multicast",
    "tx_bytes",
    "tx_packets",
    "tx_errs",
    "tx_drop",
    "tx_fifo",
    "tx_colls",
    "tx_carrier",
    "tx_compressed",
];
const RX_BYTES: usize = 0;
const RX_PACKETS: usize = 1;
const TX_BYTES: usize = 8;
const TX_PACKETS: usize = 9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters([u64; 16]);

pub fn parse_net_dev(content: &str) -> Result<Vec<(String, InterfaceCounters)>, ProbeError> {
    let mut interfaces = Vec::new();
    // two header lines
    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = rest.split_whitespace().collect();
        if values.len() < FIELDS.len() {
            return Err(ProbeError::malformed(line.trim(), "expected 16 interface counters"));
        }
        let mut counters = [0_u64; 16];
        for (slot, raw) in counters.iter_mut().zip(&values) {
            *slot = raw
                .parse()
                .map_err(|_| ProbeError::malformed(*raw, "expected an interface counter"))?;
        }
        interfaces.push((name.trim().to_string(), InterfaceCounters(counters)));
    }
    Ok(interfaces)
}

pub fn interface_counters(content: &str, device: &str) -> Result<InterfaceCounters, ProbeError> {
    parse_net_dev(content)?
        .into_iter()
        .find(|(name, _)| name == device)
        .map(|(_, counters)| counters)
        .ok_or_else(|| ProbeError::UnknownInterface(device.to_string()))
}

/// Per-second rates; byte counters are converted to kB/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InterfaceRates {
    pub fields: [f64; 16],
}

impl InterfaceRates {
    pub fn total_kbytes(&self) -> f64 {
        self.fields[RX_BYTES] + self.fields[TX_BYTES]
    }
}

pub fn interface_rates(first: &InterfaceCounters, second: &InterfaceCounters, interval: Duration) -> InterfaceRates {
    let secs = interval.as_secs_f64().max(f64::EPSILON);
    let mut fields = [0.0; 16];
    for (i, rate) in fields.iter_mut().enumerate() {
        let delta = second.0[i].saturating_sub(first.0[i]) as f64;
        *rate = if FIELDS[i].ends_with("_bytes") {
            delta / 1024.0 / secs
        } else {
            delta / secs
        };
    }
    InterfaceRates { fields }
}

pub fn network_report(device: &str, rates: &InterfaceRates, thresholds: &Thresholds, no_alert: bool) -> Report {
    let total = rates.total_kbytes();
    let status = if no_alert {
        Status::Ok
    } else {
        thresholds.classify(total)
    };
    let mut perfdata = PerfData::default();
    for (name, value) in FIELDS.iter().zip(rates.fields) {
        perfdata.push(*name, value);
    }
    perfdata.push("total_bytes", total);
    Report::new(
        status,
        format!(
            "{device} {status} TX {:.2} kB/s RX {:.2} kB/s, TX {:.2} pkts/s RX {:.2} pkts/s",
            rates.fields[TX_BYTES],
            rates.fields[RX_BYTES],
            rates.fields[TX_PACKETS],
            rates.fields[RX_PACKETS],
        ),
        perfdata,
    )
}

pub fn check_network(
    proc_root: &Path,
    device: &str,
    interval: Duration,
    thresholds: &Thresholds,
    no_alert: bool,
) -> Result<Report, ProbeError> {
    let path = proc_root.join("net").join("dev");
    let first = interface_counters(&read_text(&path)?, device)?;
    std::thread::sleep(interval);
    let second = interface_counters(&read_text(&path)?, device)?;
    let rates = interface_rates(&first, &second, interval);
    debug!(device, total_kbytes = rates.total_kbytes(), "interface sampled");
    Ok(network_report(device, &rates, thresholds, no_alert))
}
