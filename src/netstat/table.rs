use super::hex::{decode_hex_int, decode_ipv4, decode_ipv6};
use crate::error::{read_text, ProbeError};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

const SOCKET_TABLE_COLUMNS: usize = 10;
const PACKET_TABLE_COLUMNS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    Stateless,
}

/// Kernel state codes from `include/net/tcp_states.h`.
pub const TCP_STATES: [(&str, SocketState); 11] = [
    ("01", SocketState::Established),
    ("02", SocketState::SynSent),
    ("03", SocketState::SynRecv),
    ("04", SocketState::FinWait1),
    ("05", SocketState::FinWait2),
    ("06", SocketState::TimeWait),
    ("07", SocketState::Close),
    ("08", SocketState::CloseWait),
    ("09", SocketState::LastAck),
    ("0A", SocketState::Listen),
    ("0B", SocketState::Closing),
];

pub fn decode_state(code: &str) -> Result<SocketState, ProbeError> {
    TCP_STATES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, state)| *state)
        .ok_or_else(|| ProbeError::UnknownState(code.to_string()))
}

impl SocketState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Established => "ESTABLISHED",
            Self::SynSent => "SYN_SENT",
            Self::SynRecv => "SYN_RECV",
            Self::FinWait1 => "FIN_WAIT1",
            Self::FinWait2 => "FIN_WAIT2",
            Self::TimeWait => "TIME_WAIT",
            Self::Close => "CLOSE",
            Self::CloseWait => "CLOSE_WAIT",
            Self::LastAck => "LAST_ACK",
            Self::Listen => "LISTEN",
            Self::Closing => "CLOSING",
            Self::Stateless => "STATELESS",
        }
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp4,
    Tcp6,
    Udp4,
    Udp6,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [Self::Tcp4, Self::Tcp6, Self::Udp4, Self::Udp6];

    /// File name under `<proc_root>/net`.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Tcp4 => "tcp",
            Self::Tcp6 => "tcp6",
            Self::Udp4 => "udp",
            Self::Udp6 => "udp6",
        }
    }

    pub fn is_tcp(self) -> bool {
        matches!(self, Self::Tcp4 | Self::Tcp6)
    }

    pub fn is_ipv6(self) -> bool {
        matches!(self, Self::Tcp6 | Self::Udp6)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Udp4 => "udp4",
            Self::Udp6 => "udp6",
        };
        f.write_str(label)
    }
}

/// A decoded `address:port` pair. IPv4 hosts are dotted quads, IPv6 hosts use
/// the sixteen-segment rendering of [`super::hex::decode_ipv6`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One row of a tcp/udp socket table, before owner resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    pub protocol: Protocol,
    pub slot: String,
    pub local: Endpoint,
    pub remote: Endpoint,
    pub state: SocketState,
    pub uid: u32,
    pub inode: u64,
}

pub fn parse_socket_table(protocol: Protocol, content: &str) -> Result<Vec<SocketEntry>, ProbeError> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < SOCKET_TABLE_COLUMNS {
            return Err(ProbeError::MalformedLine {
                table: protocol.table_name(),
                line: index + 1,
                expected: SOCKET_TABLE_COLUMNS,
                found: fields.len(),
            });
        }

        let state = if protocol.is_tcp() {
            decode_state(fields[3])?
        } else {
            SocketState::Stateless
        };

        entries.push(SocketEntry {
            protocol,
            slot: fields[0].trim_end_matches(':').to_string(),
            local: parse_endpoint(fields[1], protocol.is_ipv6())?,
            remote: parse_endpoint(fields[2], protocol.is_ipv6())?,
            state,
            uid: parse_decimal(fields[7])?,
            inode: parse_decimal(fields[9])?,
        });
    }
    Ok(entries)
}

/// Returns the inode column of every packet socket row.
pub fn parse_packet_table(content: &str) -> Result<Vec<u64>, ProbeError> {
    let mut inodes = Vec::new();
    for (index, line) in content.lines().enumerate().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < PACKET_TABLE_COLUMNS {
            return Err(ProbeError::MalformedLine {
                table: "packet",
                line: index + 1,
                expected: PACKET_TABLE_COLUMNS,
                found: fields.len(),
            });
        }
        inodes.push(parse_decimal(fields[8])?);
    }
    Ok(inodes)
}

pub fn read_socket_table(proc_root: &Path, protocol: Protocol) -> Result<Vec<SocketEntry>, ProbeError> {
    let path = proc_root.join("net").join(protocol.table_name());
    let entries = parse_socket_table(protocol, &read_text(&path)?)?;
    debug!(table = %path.display(), rows = entries.len(), "socket table parsed");
    Ok(entries)
}

pub fn read_packet_table(proc_root: &Path) -> Result<Vec<u64>, ProbeError> {
    let path = proc_root.join("net").join("packet");
    let inodes = parse_packet_table(&read_text(&path)?)?;
    debug!(table = %path.display(), rows = inodes.len(), "packet table parsed");
    Ok(inodes)
}

fn parse_endpoint(field: &str, ipv6: bool) -> Result<Endpoint, ProbeError> {
    let (addr_hex, port_hex) = field
        .split_once(':')
        .ok_or_else(|| ProbeError::malformed(field, "expected address:port"))?;
    let host = if ipv6 {
        decode_ipv6(addr_hex)?
    } else {
        decode_ipv4(addr_hex)?
    };
    let port = u16::try_from(decode_hex_int(port_hex)?)
        .map_err(|_| ProbeError::malformed(port_hex, "port out of range"))?;
    Ok(Endpoint { host, port })
}

fn parse_decimal<T: std::str::FromStr>(field: &str) -> Result<T, ProbeError> {
    field
        .parse()
        .map_err(|_| ProbeError::malformed(field, "expected a decimal number"))
}
