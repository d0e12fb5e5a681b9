//! Pin layout on the BPF filesystem.
//!
//! Every program gets its own directory `<bpffs>/cov/<program>` holding one
//! pin per coverage map. `run` owns the directory and clears stale pins;
//! `gen` only reads and requires every pin to be present.

use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use bpfcov_common::config::PinPaths;
use bpfcov_common::constants::{BPF_FS_MAGIC, COVERAGE_DIR};
use bpfcov_common::error::{CovError, Result};

use crate::pin;

/// Returns whether `path` is the root of a mounted BPF filesystem.
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::unnecessary_cast)]
pub fn is_bpffs(path: &Path) -> bool {
    nix::sys::statfs::statfs(path)
        .is_ok_and(|st| st.filesystem_type().0 as u64 == BPF_FS_MAGIC)
}

/// Fails unless `path` is a mounted BPF filesystem.
///
/// # Errors
///
/// Returns `CovError::NotBpfFs` otherwise.
pub fn ensure_bpffs(path: &Path) -> Result<()> {
    if is_bpffs(path) {
        Ok(())
    } else {
        Err(CovError::NotBpfFs {
            path: path.to_path_buf(),
        })
    }
}

/// Strips trailing `/` characters, keeping a lone root slash.
#[must_use]
pub fn strip_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Makes a program name usable as a bpffs directory name (no dots).
#[must_use]
pub fn sanitize_component(name: &str) -> String {
    name.replace('.', "_")
}

/// Directory layout of one program's pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinLayout {
    /// `<bpffs>/cov`.
    pub coverage_root: PathBuf,
    /// `<bpffs>/cov/<program>`.
    pub program_root: PathBuf,
    /// The four pin paths below the program root.
    pub pins: PinPaths,
}

impl PinLayout {
    /// Derives the layout for `program` under the BPF filesystem `bpffs`.
    ///
    /// # Errors
    ///
    /// Returns `CovError::Config` if the program path has no file name.
    pub fn resolve(bpffs: &Path, program: &Path) -> Result<Self> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy())
            .ok_or_else(|| CovError::Config {
                message: format!("program path '{}' has no file name", program.display()),
            })?;
        let coverage_root = bpffs.join(COVERAGE_DIR);
        let program_root = coverage_root.join(sanitize_component(&name));
        let pins = PinPaths::under(&program_root);
        tracing::info!(path = %program_root.display(), "pin directory resolved");
        Ok(Self {
            coverage_root,
            program_root,
            pins,
        })
    }

    /// Prepares the layout for a `run`: creates the directories and removes
    /// any pin left over from a previous run.
    ///
    /// # Errors
    ///
    /// Returns `CovError::Io` if a directory cannot be created and
    /// `CovError::Unpin` if a stale pin cannot be removed.
    pub fn prepare_run(&self) -> Result<()> {
        for dir in [&self.coverage_root, &self.program_root] {
            create_private_dir(dir)?;
        }
        for (_, path) in self.pins.iter() {
            let _ = pin::unpin(path)?;
        }
        Ok(())
    }

    /// Checks the layout before a `gen`: every pin must exist.
    ///
    /// # Errors
    ///
    /// Returns `CovError::MissingPin` for the first absent pin and
    /// `CovError::Io` for a pin that cannot be checked.
    pub fn verify_gen(&self) -> Result<()> {
        for (_, path) in self.pins.iter() {
            match std::fs::symlink_metadata(path) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(CovError::MissingPin {
                        path: path.to_path_buf(),
                    });
                }
                Err(source) => {
                    return Err(CovError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    match std::fs::DirBuilder::new().mode(0o700).create(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(CovError::Io {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpfcov_common::types::MapRole;

    #[test]
    fn trailing_slashes_are_stripped() {
        assert_eq!(strip_trailing_slashes("/sys/fs/bpf///"), "/sys/fs/bpf");
        assert_eq!(strip_trailing_slashes("/sys/fs/bpf"), "/sys/fs/bpf");
        assert_eq!(strip_trailing_slashes("/"), "/");
    }

    #[test]
    fn dots_are_replaced_in_program_names() {
        assert_eq!(sanitize_component("prog.bpf.o"), "prog_bpf_o");
    }

    #[test]
    fn layout_is_namespaced_by_program_basename() {
        let layout =
            PinLayout::resolve(Path::new("/sys/fs/bpf"), Path::new("./out/hello.bpf.o")).unwrap();
        assert_eq!(layout.coverage_root, Path::new("/sys/fs/bpf/cov"));
        assert_eq!(layout.program_root, Path::new("/sys/fs/bpf/cov/hello_bpf_o"));
        assert_eq!(
            layout.pins.get(MapRole::CovMap),
            Path::new("/sys/fs/bpf/cov/hello_bpf_o/covmap")
        );
    }

    #[test]
    fn layout_requires_a_file_name() {
        assert!(matches!(
            PinLayout::resolve(Path::new("/sys/fs/bpf"), Path::new("/")),
            Err(CovError::Config { .. })
        ));
    }

    #[test]
    fn prepare_run_creates_dirs_and_clears_stale_pins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = PinLayout::resolve(dir.path(), Path::new("prog")).unwrap();
        std::fs::create_dir_all(&layout.program_root).expect("mkdir");
        let stale = layout.pins.get(MapRole::Names);
        std::fs::write(stale, b"stale").expect("write");

        layout.prepare_run().unwrap();

        assert!(layout.program_root.is_dir());
        assert!(!stale.exists());
    }

    #[test]
    fn prepare_run_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = PinLayout::resolve(dir.path(), Path::new("prog")).unwrap();
        layout.prepare_run().unwrap();
        layout.prepare_run().unwrap();
        assert!(layout.coverage_root.is_dir());
    }

    #[test]
    fn verify_gen_reports_first_missing_pin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = PinLayout::resolve(dir.path(), Path::new("prog")).unwrap();
        std::fs::create_dir_all(&layout.program_root).expect("mkdir");
        std::fs::write(layout.pins.get(MapRole::Counters), b"").expect("write");

        match layout.verify_gen() {
            Err(CovError::MissingPin { path }) => {
                assert_eq!(path, layout.pins.get(MapRole::Data));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn verify_gen_reports_unreachable_pins_as_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = PinLayout::resolve(dir.path(), Path::new("prog")).unwrap();
        std::fs::create_dir_all(&layout.coverage_root).expect("mkdir");
        std::fs::write(&layout.program_root, b"").expect("write");

        assert!(matches!(layout.verify_gen(), Err(CovError::Io { .. })));
    }

    #[test]
    fn verify_gen_accepts_complete_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = PinLayout::resolve(dir.path(), Path::new("prog")).unwrap();
        std::fs::create_dir_all(&layout.program_root).expect("mkdir");
        for (_, path) in layout.pins.iter() {
            std::fs::write(path, b"").expect("write");
        }
        layout.verify_gen().unwrap();
    }

    #[test]
    fn temp_directory_is_not_bpffs() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!is_bpffs(dir.path()));
        assert!(matches!(
            ensure_bpffs(dir.path()),
            Err(CovError::NotBpfFs { .. })
        ));
    }
}
