use super::enumerate::ConnectionRecord;
use super::hex::{ipv4_mapped_ipv6, render_octets};
use super::table::SocketState;
use crate::error::ProbeError;
use std::net::{IpAddr, Ipv6Addr};

/// Perfdata label of every tally bucket, in bucket order.
pub const BUCKET_LABELS: [&str; 12] = [
    "established",
    "syn_sent",
    "syn_recv",
    "fin_wait1",
    "fin_wait2",
    "time_wait",
    "close",
    "close_wait",
    "last_ack",
    "listen",
    "closing",
    "closed",
];

/// Never filled: the kernel has no state distinct from `CLOSE` to put here.
pub const CLOSED_BUCKET: usize = 11;

fn bucket(state: SocketState) -> Option<usize> {
    let index = match state {
        SocketState::Established => 0,
        SocketState::SynSent => 1,
        SocketState::SynRecv => 2,
        SocketState::FinWait1 => 3,
        SocketState::FinWait2 => 4,
        SocketState::TimeWait => 5,
        SocketState::Close => 6,
        SocketState::CloseWait => 7,
        SocketState::LastAck => 8,
        SocketState::Listen => 9,
        SocketState::Closing => 10,
        SocketState::Stateless => return None,
    };
    Some(index)
}

/// The remote `host:port` literals a connection may be reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    host: String,
    port: u16,
    literals: Vec<String>,
}

impl Destination {
    /// IPv4 hosts match both `a.b.c.d:port` and the IPv4-mapped IPv6 form.
    /// IPv6 hosts match their sixteen-segment rendering only, so a mapped
    /// host written as `::ffff:10.0.0.5` counts tcp6 rows but never the
    /// dotted tcp4 rows. Pass the dotted form to count both.
    pub fn new(host: &str, port: u16) -> Result<Self, ProbeError> {
        let literals = match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => vec![
                format!("{host}:{port}"),
                format!("{}:{port}", ipv4_mapped_ipv6(host)?),
            ],
            Ok(IpAddr::V6(addr)) => vec![format!("{}:{port}", render_ipv6(&addr))],
            Err(_) => return Err(ProbeError::InvalidAddress(host.to_string())),
        };
        Ok(Self {
            host: host.to_string(),
            port,
            literals,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn matches(&self, remote: &str) -> bool {
        self.literals.iter().any(|literal| literal == remote)
    }
}

fn render_ipv6(addr: &Ipv6Addr) -> String {
    render_octets(&addr.octets())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationResult {
    pub total_connections: u64,
    pub per_state: [u64; BUCKET_LABELS.len()],
}

impl AggregationResult {
    pub fn count(&self, state: SocketState) -> u64 {
        bucket(state).map_or(0, |index| self.per_state[index])
    }

    pub fn established(&self) -> u64 {
        self.count(SocketState::Established)
    }

    /// `connections` followed by every state bucket.
    pub fn labelled(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        std::iter::once(("connections", self.total_connections)).chain(
            BUCKET_LABELS
                .iter()
                .copied()
                .zip(self.per_state.iter().copied()),
        )
    }
}

/// Tallies TCP connections whose remote endpoint is `destination`.
pub fn aggregate(connections: &[ConnectionRecord], destination: &Destination) -> AggregationResult {
    let result = connections
        .iter()
        .filter(|c| c.protocol.is_tcp())
        .filter(|c| destination.matches(&c.remote.to_string()))
        .fold(AggregationResult::default(), |mut acc, c| {
            acc.total_connections += 1;
            if let Some(index) = bucket(c.state) {
                acc.per_state[index] += 1;
            }
            acc
        });
    debug_assert_eq!(result.per_state[CLOSED_BUCKET], 0);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netstat::table::{Endpoint, Protocol};

    fn conn(protocol: Protocol, remote_host: &str, port: u16, state: SocketState) -> ConnectionRecord {
        ConnectionRecord {
            protocol,
            connection_id: "0".to_string(),
            local: Endpoint {
                host: "10.0.0.1".to_string(),
                port: 40000,
            },
            remote: Endpoint {
                host: remote_host.to_string(),
                port,
            },
            state,
            owner_uid: 0,
            owner_name: None,
            inode: 1,
            pid: None,
            executable: None,
        }
    }

    #[test]
    fn counts_states_toward_destination() {
        let connections = vec![
            conn(Protocol::Tcp4, "10.0.0.5", 443, SocketState::Established),
            conn(Protocol::Tcp4, "10.0.0.5", 443, SocketState::Established),
            conn(Protocol::Tcp4, "10.0.0.5", 443, SocketState::TimeWait),
            conn(Protocol::Tcp4, "10.0.0.6", 443, SocketState::Established),
        ];
        let result = aggregate(&connections, &Destination::new("10.0.0.5", 443).unwrap());

        assert_eq!(result.total_connections, 3);
        assert_eq!(result.established(), 2);
        assert_eq!(result.count(SocketState::TimeWait), 1);
        let others: u64 = result
            .labelled()
            .filter(|(label, _)| !matches!(*label, "connections" | "established" | "time_wait"))
            .map(|(_, count)| count)
            .sum();
        assert_eq!(others, 0);
    }

    #[test]
    fn ipv4_mapped_remote_counts_for_plain_ipv4_target() {
        let mapped = "00:00:00:00:00:00:00:00:00:00:FF:FF:0A:00:00:05";
        let connections = vec![
            conn(Protocol::Tcp6, mapped, 443, SocketState::Established),
            conn(Protocol::Tcp6, mapped, 8443, SocketState::Established),
        ];
        let result = aggregate(&connections, &Destination::new("10.0.0.5", 443).unwrap());
        assert_eq!(result.total_connections, 1);
        assert_eq!(result.established(), 1);
    }

    #[test]
    fn udp_and_other_ports_are_ignored() {
        let connections = vec![
            conn(Protocol::Udp4, "10.0.0.5", 443, SocketState::Stateless),
            conn(Protocol::Tcp4, "10.0.0.5", 80, SocketState::Established),
        ];
        let result = aggregate(&connections, &Destination::new("10.0.0.5", 443).unwrap());
        assert_eq!(result, AggregationResult::default());
    }

    #[test]
    fn closed_bucket_stays_zero() {
        let connections = vec![
            conn(Protocol::Tcp4, "10.0.0.5", 443, SocketState::Close),
            conn(Protocol::Tcp4, "10.0.0.5", 443, SocketState::Closing),
        ];
        let result = aggregate(&connections, &Destination::new("10.0.0.5", 443).unwrap());
        assert_eq!(result.count(SocketState::Close), 1);
        assert_eq!(result.count(SocketState::Closing), 1);
        assert_eq!(result.per_state[CLOSED_BUCKET], 0);
    }

    #[test]
    fn ipv6_target_matches_native_rendering() {
        let remote = "20:01:0D:B8:00:00:00:00:00:00:00:00:00:00:00:01";
        let connections = vec![conn(Protocol::Tcp6, remote, 22, SocketState::Listen)];
        let result = aggregate(&connections, &Destination::new("2001:db8::1", 22).unwrap());
        assert_eq!(result.total_connections, 1);
        assert_eq!(result.count(SocketState::Listen), 1);
    }

    #[test]
    fn ipv6_form_of_mapped_target_skips_dotted_rows() {
        let mapped = "00:00:00:00:00:00:00:00:00:00:FF:FF:0A:00:00:05";
        let connections = vec![
            conn(Protocol::Tcp6, mapped, 443, SocketState::Established),
            conn(Protocol::Tcp4, "10.0.0.5", 443, SocketState::Established),
        ];
        let result = aggregate(&connections, &Destination::new("::ffff:10.0.0.5", 443).unwrap());
        assert_eq!(result.total_connections, 1);
        assert_eq!(result.established(), 1);
    }

    #[test]
    fn hostname_target_is_rejected() {
        assert!(matches!(
            Destination::new("db.internal", 5432),
            Err(ProbeError::InvalidAddress(_))
        ));
    }

    #[test]
    fn labelled_lists_every_bucket() {
        let labels: Vec<_> = AggregationResult::default().labelled().map(|(l, _)| l).collect();
        assert_eq!(labels.len(), 13);
        assert_eq!(labels[0], "connections");
        assert_eq!(labels[12], "closed");
    }
}
