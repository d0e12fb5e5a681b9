//! Assembling and writing a raw profile.
//!
//! Everything is read from the maps before the output is touched, and the
//! output is replaced atomically, so a failed generation never leaves a
//! truncated profile behind.

use std::fs::Permissions;
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use bpfcov_common::config::CovConfig;
use bpfcov_common::constants::PROFRAW_HEADER_LEN;
use bpfcov_common::error::{CovError, Result};
use bpfcov_common::types::MapRole;
use bpfcov_ebpf::maps::{MapAccess, read_singleton};

use crate::header::ProfileHeader;
use crate::source::{MapSource, PinnedSource};

/// A raw profile ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Fixed header.
    pub header: ProfileHeader,
    /// Per-function data records.
    pub data: Vec<u8>,
    /// Counter values.
    pub counters: Vec<u8>,
    /// Names section, when requested.
    pub names: Option<Vec<u8>>,
}

impl Profile {
    /// Reads the coverage maps from `source` and builds the profile.
    ///
    /// # Errors
    ///
    /// Fails if any map is absent, cannot be queried, or has unexpected
    /// content.
    pub fn collect<S: MapSource>(source: &S, include_names: bool) -> Result<Self> {
        let counters = source.open(MapRole::Counters)?;
        let data = source.open(MapRole::Data)?;
        let names = source.open(MapRole::Names)?;
        let covmap = source.open(MapRole::CovMap)?;

        let covmap_content = read_singleton(&covmap)?;
        let header =
            ProfileHeader::derive(data.meta(), counters.meta(), names.meta(), &covmap_content)?;
        tracing::debug!(?header, "derived profile header");

        let data = read_singleton(&data)?;
        let counters = read_singleton(&counters)?;
        let names = if include_names {
            Some(read_singleton(&names)?)
        } else {
            None
        };
        Ok(Self {
            header,
            data,
            counters,
            names,
        })
    }

    /// Total size of the serialized profile in bytes.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        let names = self
            .names
            .as_ref()
            .map_or(0, |n| n.len() + names_padding(n.len()));
        (PROFRAW_HEADER_LEN + self.data.len() + self.counters.len() + names) as u64
    }

    /// Serializes the profile: header, data, counters, then names if present.
    ///
    /// # Errors
    ///
    /// Propagates the writer's error.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.write_to(w)?;
        w.write_all(&self.data)?;
        w.write_all(&self.counters)?;
        if let Some(names) = &self.names {
            w.write_all(names)?;
            w.write_all(&[0u8; 8][..names_padding(names.len())])?;
        }
        tracing::debug!(
            data = self.data.len(),
            counters = self.counters.len(),
            names = self.names.as_ref().map_or(0, Vec::len),
            "profile sections written"
        );
        Ok(())
    }
}

/// Zero bytes needed to align the names section to 8 bytes.
const fn names_padding(len: usize) -> usize {
    (8 - len % 8) % 8
}

/// Writes `profile` to `path`, replacing it atomically.
///
/// A replaced file keeps its mode; a new one gets `0o666` minus the umask.
///
/// # Errors
///
/// Returns `CovError::Io` if the temporary file cannot be created, written
/// or moved into place.
pub fn write_profile(path: &Path, profile: &Profile) -> Result<u64> {
    let io_err = |source: io::Error| CovError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    // 0o666 goes through the umask at creation, like a plain create
    let tmp = tempfile::Builder::new()
        .prefix(".profraw")
        .permissions(Permissions::from_mode(0o666))
        .tempfile_in(dir)
        .map_err(io_err)?;
    {
        let mut w = BufWriter::new(tmp.as_file());
        profile.write_to(&mut w).map_err(io_err)?;
        w.flush().map_err(io_err)?;
    }
    match std::fs::metadata(path) {
        Ok(existing) => tmp
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(io_err)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(e)),
    }
    let _ = tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(profile.byte_len())
}

/// Generates the profile of the configured program from its pinned maps.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns `CovError::Config` when no output path is configured, and any
/// error raised while reading the maps or writing the file.
pub fn generate(config: &CovConfig) -> Result<u64> {
    let output = config.output.as_deref().ok_or_else(|| CovError::Config {
        message: "missing output path".into(),
    })?;
    tracing::info!(output = %output.display(), "generating profile");
    let profile = Profile::collect(&PinnedSource::new(&config.pins), config.include_names)?;
    write_profile(output, &profile)
}
