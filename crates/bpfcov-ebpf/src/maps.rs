//! Map introspection: resolving pins to live maps and reading their content.
//!
//! Coverage maps are global-data maps holding exactly one entry whose value
//! is the whole instrumentation section. [`read_singleton`] extracts that
//! value from anything implementing [`MapAccess`].

use std::io;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};

use aya::maps::{MapData, MapInfo, MapType};
use bpfcov_common::error::{CovError, Result};
use bpfcov_common::types::MapMeta;

use crate::sys;

/// Raw key/value access to a map whose shape is only known at runtime.
pub trait MapAccess {
    /// Where the map was resolved from, for diagnostics.
    fn location(&self) -> &Path;

    /// Shape of the map.
    fn meta(&self) -> MapMeta;

    /// Returns the first key of the map, or `None` when it is empty.
    ///
    /// # Errors
    ///
    /// Returns the OS error if key iteration fails.
    fn first_key(&self) -> io::Result<Option<Vec<u8>>>;

    /// Returns the value stored under `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the lookup fails.
    fn lookup(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>>;
}

/// Converts aya's map info into the workspace's metadata snapshot.
#[must_use]
pub fn meta_of(info: &MapInfo) -> MapMeta {
    MapMeta {
        id: info.id(),
        key_size: info.key_size(),
        value_size: info.value_size(),
        max_entries: info.max_entries(),
    }
}

/// A map resolved from its pin on the BPF filesystem.
#[derive(Debug)]
pub struct PinnedMap {
    path: PathBuf,
    data: MapData,
    meta: MapMeta,
}

impl PinnedMap {
    /// Resolves a pin path to a live map handle and queries its shape.
    ///
    /// # Errors
    ///
    /// Returns `CovError::MissingPin` if nothing is pinned at `path`,
    /// `CovError::Io` if the path cannot be checked (e.g. permission denied),
    /// and `CovError::MapInfo` if the pin cannot be opened or queried.
    pub fn open(path: &Path) -> Result<Self> {
        match path.try_exists() {
            Ok(true) => {}
            Ok(false) => {
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
        let map_info_err = |message: String| CovError::MapInfo {
            path: path.to_path_buf(),
            message,
        };
        let data = MapData::from_pin(path).map_err(|e| map_info_err(e.to_string()))?;
        let info = data.info().map_err(|e| map_info_err(e.to_string()))?;
        if matches!(
            info.map_type(),
            Ok(MapType::PerCpuArray | MapType::PerCpuHash | MapType::LruPerCpuHash)
        ) {
            return Err(map_info_err("per-CPU maps are not supported".into()));
        }
        let meta = meta_of(&info);
        tracing::debug!(
            path = %path.display(),
            id = meta.id,
            key_size = meta.key_size,
            value_size = meta.value_size,
            max_entries = meta.max_entries,
            "opened pinned map"
        );
        Ok(Self {
            path: path.to_path_buf(),
            data,
            meta,
        })
    }
}

impl MapAccess for PinnedMap {
    fn location(&self) -> &Path {
        &self.path
    }

    fn meta(&self) -> MapMeta {
        self.meta
    }

    fn first_key(&self) -> io::Result<Option<Vec<u8>>> {
        let mut key = vec![0u8; self.meta.key_size as usize];
        match sys::map_get_next_key(self.data.fd().as_fd(), None, &mut key) {
            Ok(()) => Ok(Some(key)),
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn lookup(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        if key.len() != self.meta.key_size as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("key is {} bytes, map expects {}", key.len(), self.meta.key_size),
            ));
        }
        let mut value = vec![0u8; self.meta.value_size as usize];
        match sys::map_lookup_elem(self.data.fd().as_fd(), key, &mut value) {
            Ok(()) => Ok(Some(value)),
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Returns the shape of the map pinned at `path`.
///
/// # Errors
///
/// Fails if the pin is absent or its metadata cannot be queried.
pub fn inspect(path: &Path) -> Result<MapMeta> {
    PinnedMap::open(path).map(|map| map.meta())
}

/// Reads the value of a map that holds a single entry.
///
/// # Errors
///
/// Returns `CovError::TooManyEntries` if the map declares more than one
/// entry, `CovError::EmptyMap` if it has no first key and
/// `CovError::Lookup` if iterating or looking up the key fails.
pub fn read_singleton<M: MapAccess + ?Sized>(map: &M) -> Result<Vec<u8>> {
    let meta = map.meta();
    let path = map.location();
    if meta.max_entries > 1 {
        return Err(CovError::TooManyEntries {
            path: path.to_path_buf(),
            max_entries: meta.max_entries,
        });
    }

    let lookup_err = |source: io::Error| CovError::Lookup {
        path: path.to_path_buf(),
        source,
    };
    let key = map.first_key().map_err(lookup_err)?.ok_or_else(|| CovError::EmptyMap {
        path: path.to_path_buf(),
    })?;
    let value = map.lookup(&key).map_err(lookup_err)?.ok_or_else(|| {
        lookup_err(io::Error::new(
            io::ErrorKind::NotFound,
            "first key vanished before lookup",
        ))
    })?;
    if value.len() != meta.value_size as usize {
        return Err(lookup_err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("value is {} bytes, map declares {}", value.len(), meta.value_size),
        )));
    }
    Ok(value)
}
