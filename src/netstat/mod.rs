//! Connection-state probe built on the `/proc/net` socket tables.

pub mod aggregate;
pub mod enumerate;
pub mod hex;
pub mod inode;
pub mod table;
pub mod users;

use crate::alert::{ConnectionBounds, PerfData, Report};
use crate::error::ProbeError;
use aggregate::{aggregate, AggregationResult, Destination};
use enumerate::{enumerate_connections, enumerate_packet_sockets, ConnectionRecord, PacketSocketOwner};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use table::Protocol;
use users::UserDirectory;

pub fn check_netstat(
    proc_root: &Path,
    destination: &Destination,
    users: &dyn UserDirectory,
) -> Result<AggregationResult, ProbeError> {
    let connections = enumerate_connections(proc_root, &Protocol::ALL, users)?;
    Ok(aggregate(&connections, destination))
}

pub fn netstat_report(
    result: &AggregationResult,
    destination: &Destination,
    bounds: &ConnectionBounds,
    no_alert: bool,
) -> Report {
    let established = result.established();
    let status = if no_alert {
        crate::alert::Status::Ok
    } else {
        bounds.classify(established)
    };
    let mut perfdata = PerfData::default();
    for (label, count) in result.labelled() {
        perfdata.push(label, count as f64);
    }
    Report::new(
        status,
        format!(
            "Netstat {status} {established} established connection(s) to {}:{}",
            destination.host(),
            destination.port()
        ),
        perfdata,
    )
}

#[derive(Debug, Serialize)]
pub struct SocketListing {
    pub connections: Vec<ConnectionRecord>,
    pub packet_sockets: Vec<PacketSocketOwner>,
}

pub fn socket_listing(proc_root: &Path, users: &dyn UserDirectory) -> Result<SocketListing, ProbeError> {
    Ok(SocketListing {
        connections: enumerate_connections(proc_root, &Protocol::ALL, users)?,
        packet_sockets: enumerate_packet_sockets(proc_root)?,
    })
}

impl SocketListing {
    pub fn to_json(&self) -> Result<String, ProbeError> {
        serde_json::to_string_pretty(self).map_err(ProbeError::Serialization)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::from(
            "Legend: connection id, user, local address, remote address, state, pid, executable\n",
        );
        for protocol in Protocol::ALL {
            out.push_str(&format!("\n{protocol} results:\n"));
            for c in self.connections.iter().filter(|c| c.protocol == protocol) {
                out.push_str(&format!(
                    "{} {} {} {} {} {} {}\n",
                    c.connection_id,
                    c.owner_name.clone().unwrap_or_else(|| c.owner_uid.to_string()),
                    c.local,
                    c.remote,
                    c.state,
                    or_dash(c.pid),
                    or_dash(c.executable.as_ref().map(|p| p.display())),
                ));
            }
        }
        out.push_str("\npacket socket results:\n");
        for p in &self.packet_sockets {
            out.push_str(&format!(
                "{} {} {}\n",
                p.inode,
                or_dash(p.pid),
                or_dash(p.executable.as_ref().map(|e| e.display())),
            ));
        }
        out
    }
}

fn or_dash(value: Option<impl Display>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
