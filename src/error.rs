use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("malformed input {value:?}: {reason}")]
    MalformedInput { value: String, reason: &'static str },
    #[error("malformed line {line} in {table}: expected at least {expected} columns, found {found}")]
    MalformedLine {
        table: &'static str,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown TCP state code {0:?}")]
    UnknownState(String),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("{field} not found in {file}")]
    MissingField { file: String, field: &'static str },
    #[error("{0} is not a valid network interface")]
    UnknownInterface(String),
    #[error("{0} is not a valid mount point")]
    InvalidMountPoint(String),
    #[error("{0}")]
    Thresholds(String),
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl ProbeError {
    pub fn malformed(value: impl Into<String>, reason: &'static str) -> Self {
        Self::MalformedInput {
            value: value.into(),
            reason,
        }
    }
}

/// Reads a procfs text file, mapping the I/O failure to a fatal probe error.
pub fn read_text(path: &Path) -> Result<String, ProbeError> {
    std::fs::read_to_string(path).map_err(|source| ProbeError::Read {
        path: path.display().to_string(),
        source,
    })
}
