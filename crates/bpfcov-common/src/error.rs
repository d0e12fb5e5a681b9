//! Unified error types for the bpfcov workspace.
//!
//! The variants follow the failure categories of the tool: trace control,
//! pin conflicts, missing pins and unreadable map content. Descriptor
//! duplication races are recovered locally and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::MapRole;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CovError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A trace-control primitive failed outside of the child-exit path.
    #[error("trace control failed during {operation}: {source}")]
    Trace {
        /// The primitive that failed (`PTRACE_SYSCALL`, `waitpid`, ...).
        operation: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A second map claimed a role that was already pinned in this run.
    #[error("{role} map already pinned at {path} during this run")]
    PinConflict {
        /// Role claimed twice.
        role: MapRole,
        /// Pin path of the role.
        path: PathBuf,
    },

    /// Pinning a map to the BPF filesystem failed.
    #[error("could not pin map '{map}' at {path}: {message}")]
    Pin {
        /// Kernel name of the map.
        map: String,
        /// Target pin path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A stale pin could not be removed before a run.
    #[error("could not unpin map at {path}: {source}")]
    Unpin {
        /// Pin path that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A pin path required for profile generation does not exist.
    #[error("could not access pinned map at {path}")]
    MissingPin {
        /// The absent pin path.
        path: PathBuf,
    },

    /// A pinned map could not be opened or its metadata queried.
    #[error("could not get info about pinned map at {path}: {message}")]
    MapInfo {
        /// Pin path of the map.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A singleton map has no first key.
    #[error("map at {path} holds no entry")]
    EmptyMap {
        /// Pin path of the map.
        path: PathBuf,
    },

    /// Key iteration or value lookup failed.
    #[error("lookup in map at {path} failed: {source}")]
    Lookup {
        /// Pin path of the map.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A map expected to hold a single entry is declared with more.
    #[error("map at {path} declares {max_entries} entries, expected a single one")]
    TooManyEntries {
        /// Pin path of the map.
        path: PathBuf,
        /// Declared capacity of the map.
        max_entries: u32,
    },

    /// Map content does not have the expected shape.
    #[error("malformed {role} map content: {message}")]
    MalformedContent {
        /// Role of the offending map.
        role: MapRole,
        /// Description of the problem.
        message: String,
    },

    /// The configured path is not a mounted BPF filesystem.
    #[error("the BPF filesystem is not mounted at {path}")]
    NotBpfFs {
        /// Path that was checked.
        path: PathBuf,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },
}

impl CovError {
    /// Wraps an OS error raised by a trace-control primitive.
    pub fn trace(operation: &'static str, source: impl Into<std::io::Error>) -> Self {
        Self::Trace {
            operation,
            source: source.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CovError>;
