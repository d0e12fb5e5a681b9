//! Exposing captured maps on the BPF filesystem.
//!
//! A pinned map outlives the process that created it, which is what lets a
//! later `gen` invocation read the counters of a program that already exited.

use std::path::Path;

use aya::maps::MapData;
use bpfcov_common::config::PinPaths;
use bpfcov_common::error::{CovError, Result};
use bpfcov_common::types::MapRole;

/// Tracks which role pins have been taken during one run.
///
/// Each role may be pinned once per run; a second claim is a conflict.
#[derive(Debug, Clone)]
pub struct RolePins {
    paths: PinPaths,
    pinned: [bool; 4],
}

impl RolePins {
    /// Creates a tracker with every role still free.
    #[must_use]
    pub const fn new(paths: PinPaths) -> Self {
        Self {
            paths,
            pinned: [false; 4],
        }
    }

    /// Claims the pin path of `role`.
    ///
    /// # Errors
    ///
    /// Returns `CovError::PinConflict` if the role was already claimed.
    pub fn claim(&mut self, role: MapRole) -> Result<&Path> {
        let slot = &mut self.pinned[role.index()];
        if *slot {
            return Err(CovError::PinConflict {
                role,
                path: self.paths.get(role).to_path_buf(),
            });
        }
        *slot = true;
        Ok(self.paths.get(role))
    }

    /// Whether `role` has been claimed.
    #[must_use]
    pub const fn is_pinned(&self, role: MapRole) -> bool {
        self.pinned[role.index()]
    }

    /// Number of roles claimed so far.
    #[must_use]
    pub fn pinned_count(&self) -> usize {
        self.pinned.iter().filter(|p| **p).count()
    }
}

/// Pins `map` at `path`.
///
/// # Errors
///
/// Returns `CovError::Pin` if the kernel refuses the pin, typically because
/// the path is already taken.
pub fn pin_map(map: &MapData, name: &str, path: &Path) -> Result<()> {
    tracing::warn!(map = name, path = %path.display(), "pinning map");
    map.pin(path).map_err(|e| CovError::Pin {
        map: name.to_owned(),
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Removes a pin if present. Returns whether something was removed.
///
/// # Errors
///
/// Returns `CovError::Unpin` if the pin exists but cannot be removed.
pub fn unpin(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(CovError::Unpin {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    tracing::warn!(path = %path.display(), "unpinning existing map");
    std::fs::remove_file(path).map_err(|source| CovError::Unpin {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins() -> RolePins {
        RolePins::new(PinPaths::under(Path::new("/sys/fs/bpf/cov/prog")))
    }

    #[test]
    fn claim_returns_role_path() {
        let mut pins = pins();
        let path = pins.claim(MapRole::Data).unwrap().to_path_buf();
        assert_eq!(path, Path::new("/sys/fs/bpf/cov/prog/profd"));
        assert!(pins.is_pinned(MapRole::Data));
        assert!(!pins.is_pinned(MapRole::Counters));
    }

    #[test]
    fn second_claim_of_same_role_conflicts() {
        let mut pins = pins();
        let _ = pins.claim(MapRole::Counters).unwrap();
        let err = pins.claim(MapRole::Counters).unwrap_err();
        assert!(matches!(
            err,
            CovError::PinConflict {
                role: MapRole::Counters,
                ..
            }
        ));
        assert_eq!(pins.pinned_count(), 1);
    }

    #[test]
    fn distinct_roles_do_not_conflict() {
        let mut pins = pins();
        for role in MapRole::ALL {
            let _ = pins.claim(role).unwrap();
        }
        assert_eq!(pins.pinned_count(), 4);
    }

    #[test]
    fn unpin_removes_existing_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profc");
        std::fs::write(&path, b"stale").expect("write");
        assert!(unpin(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn unpin_missing_entry_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!unpin(&dir.path().join("profc")).unwrap());
    }

    #[test]
    fn unpin_unreachable_entry_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("prog");
        std::fs::write(&file, b"").expect("write");
        assert!(matches!(
            unpin(&file.join("profc")),
            Err(CovError::Unpin { .. })
        ));
    }
}
