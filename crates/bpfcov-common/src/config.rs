//! Configuration model shared by the tracer and the profile serializer.
//!
//! The CLI resolves every value once per invocation and hands the result
//! down as an immutable [`CovConfig`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::types::MapRole;

/// Pin paths of the four coverage maps of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinPaths {
    paths: [PathBuf; 4],
}

impl PinPaths {
    /// Builds the pin paths below a program's pin directory.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self {
            paths: MapRole::ALL.map(|role| root.join(role.suffix())),
        }
    }

    /// Returns the pin path of a role.
    #[must_use]
    pub fn get(&self, role: MapRole) -> &Path {
        &self.paths[role.index()]
    }

    /// Iterates over `(role, path)` pairs in pin-slot order.
    pub fn iter(&self) -> impl Iterator<Item = (MapRole, &Path)> {
        MapRole::ALL
            .into_iter()
            .map(move |role| (role, self.get(role)))
    }
}

/// Resolved configuration for one `run` or `gen` invocation.
#[derive(Debug, Clone)]
pub struct CovConfig {
    /// Mount point of the BPF filesystem.
    pub bpffs: PathBuf,
    /// Program path followed by its arguments.
    pub program: Vec<OsString>,
    /// Output profile path (`gen` only).
    pub output: Option<PathBuf>,
    /// Pin paths of the coverage maps.
    pub pins: PinPaths,
    /// Diagnostic verbosity in `0..=3`.
    pub verbosity: u8,
    /// Append the names section after the counters.
    pub include_names: bool,
}

impl CovConfig {
    /// Path of the traced or profiled program.
    #[must_use]
    pub fn program_path(&self) -> Option<&Path> {
        self.program.first().map(Path::new)
    }
}
