//! Throwaway procfs trees for tests.

use crate::netstat::users::UserDirectory;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

const TABLE_HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

pub struct FakeProc {
    root: PathBuf,
}

impl FakeProc {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!(
            "hostcheck-proc-{}-{}",
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("net")).unwrap();
        Self { root }
    }

    /// A tree with all four IP socket tables present and empty.
    pub fn with_tables() -> Self {
        let proc = Self::new();
        for table in ["tcp", "tcp6", "udp", "udp6"] {
            proc.socket_table(table, &[]);
        }
        proc
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, relative: &str) {
        fs::create_dir_all(self.root.join(relative)).unwrap();
    }

    pub fn file(&self, relative: &str, content: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn socket_table(&self, name: &str, rows: &[&str]) {
        let mut content = format!("{TABLE_HEADER}\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        self.file(&format!("net/{name}"), &content);
    }

    /// Dangling symlink `<pid>/fd/<fd>` -> `target`, as procfs presents it.
    pub fn fd(&self, pid: u32, fd: u32, target: &str) {
        let dir = self.root.join(pid.to_string()).join("fd");
        fs::create_dir_all(&dir).unwrap();
        symlink(target, dir.join(fd.to_string())).unwrap();
    }

    pub fn exe(&self, pid: u32, target: &str) {
        let dir = self.root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        symlink(target, dir.join("exe")).unwrap();
    }
}

impl Drop for FakeProc {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

pub struct StaticUsers(HashMap<u32, String>);

impl StaticUsers {
    pub fn new(entries: &[(u32, &str)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(uid, name)| (*uid, name.to_string()))
                .collect(),
        )
    }
}

impl UserDirectory for StaticUsers {
    fn user_name(&self, uid: u32) -> Option<String> {
        self.0.get(&uid).cloned()
    }
}
