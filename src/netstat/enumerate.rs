use super::inode::{executable_path, InodeIndex};
use super::table::{read_packet_table, read_socket_table, Endpoint, Protocol, SocketEntry, SocketState};
use super::users::UserDirectory;
use crate::error::ProbeError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    pub protocol: Protocol,
    pub connection_id: String,
    pub local: Endpoint,
    pub remote: Endpoint,
    pub state: SocketState,
    pub owner_uid: u32,
    pub owner_name: Option<String>,
    pub inode: u64,
    pub pid: Option<u32>,
    pub executable: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketSocketOwner {
    pub inode: u64,
    pub pid: Option<u32>,
    pub executable: Option<PathBuf>,
}

/// Reads every table in `protocols` and annotates each row with its owner.
///
/// Any table that cannot be read or parsed aborts the whole enumeration.
pub fn enumerate_connections(
    proc_root: &Path,
    protocols: &[Protocol],
    users: &dyn UserDirectory,
) -> Result<Vec<ConnectionRecord>, ProbeError> {
    let mut entries = Vec::new();
    for protocol in protocols {
        entries.extend(read_socket_table(proc_root, *protocol)?);
    }

    let index = InodeIndex::build(proc_root);
    if index.is_empty() && !entries.is_empty() {
        debug!("no socket owners resolved, fd directories may be unreadable");
    }
    let records: Vec<ConnectionRecord> = entries
        .into_iter()
        .map(|entry| annotate(proc_root, &index, users, entry))
        .collect();

    debug!(
        connections = records.len(),
        indexed_sockets = index.len(),
        resolved = records.iter().filter(|r| r.pid.is_some()).count(),
        "connections enumerated"
    );
    Ok(records)
}

pub fn enumerate_packet_sockets(proc_root: &Path) -> Result<Vec<PacketSocketOwner>, ProbeError> {
    let inodes = read_packet_table(proc_root)?;
    let index = InodeIndex::build(proc_root);
    Ok(inodes
        .into_iter()
        .map(|inode| {
            let pid = index.lookup(inode);
            PacketSocketOwner {
                inode,
                pid,
                executable: pid.and_then(|pid| executable_path(proc_root, pid)),
            }
        })
        .collect())
}

fn annotate(
    proc_root: &Path,
    index: &InodeIndex,
    users: &dyn UserDirectory,
    entry: SocketEntry,
) -> ConnectionRecord {
    let pid = index.lookup(entry.inode);
    ConnectionRecord {
        protocol: entry.protocol,
        connection_id: entry.slot,
        local: entry.local,
        remote: entry.remote,
        state: entry.state,
        owner_uid: entry.uid,
        owner_name: users.user_name(entry.uid),
        inode: entry.inode,
        pid,
        executable: pid.and_then(|pid| executable_path(proc_root, pid)),
    }
}
