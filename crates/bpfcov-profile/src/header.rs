//! The fixed 88-byte raw profile header.
//!
//! All fields are little-endian `u64`, in this order: magic, version,
//! function count, padding, counter count, padding, names size (twice),
//! counters delta, names delta, last value kind.

use std::io::{self, Write};

use bpfcov_common::constants::{
    COUNTER_RECORD_SIZE, COVMAP_VERSION_OFFSET, DATA_RECORD_SIZE, PROFRAW_HEADER_LEN,
    PROFRAW_MAGIC, VALUE_KIND_LAST,
};
use bpfcov_common::error::{CovError, Result};
use bpfcov_common::types::{MapMeta, MapRole};

/// Header of a raw profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileHeader {
    /// Format magic.
    pub magic: u64,
    /// One-based format version.
    pub version: u64,
    /// Number of per-function data records.
    pub data_count: u64,
    /// Padding before the counters section.
    pub padding_before_counters: u64,
    /// Number of counters.
    pub counters_count: u64,
    /// Padding after the counters section.
    pub padding_after_counters: u64,
    /// Size of the names section, in both of its slots.
    pub names_size: [u64; 2],
    /// Counters delta, always zero for BPF programs.
    pub counters_delta: u64,
    /// Names delta, always zero for BPF programs.
    pub names_delta: u64,
    /// Last value-profiling kind.
    pub value_kind_last: u64,
}

impl ProfileHeader {
    /// Derives the header from the map shapes and the coverage mapping header.
    ///
    /// # Errors
    ///
    /// Returns `CovError::MalformedContent` if `covmap` is too short to hold
    /// the format version.
    pub fn derive(data: MapMeta, counters: MapMeta, names: MapMeta, covmap: &[u8]) -> Result<Self> {
        let version = u64::from(covmap_version(covmap)?) + 1;
        Ok(Self {
            magic: PROFRAW_MAGIC,
            version,
            data_count: u64::from(data.value_size) / DATA_RECORD_SIZE,
            padding_before_counters: 0,
            counters_count: u64::from(counters.value_size) / COUNTER_RECORD_SIZE,
            padding_after_counters: 0,
            names_size: [u64::from(names.value_size); 2],
            counters_delta: 0,
            names_delta: 0,
            value_kind_last: VALUE_KIND_LAST,
        })
    }

    /// Serializes the header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PROFRAW_HEADER_LEN] {
        let fields = [
            self.magic,
            self.version,
            self.data_count,
            self.padding_before_counters,
            self.counters_count,
            self.padding_after_counters,
            self.names_size[0],
            self.names_size[1],
            self.counters_delta,
            self.names_delta,
            self.value_kind_last,
        ];
        let mut out = [0u8; PROFRAW_HEADER_LEN];
        for (chunk, field) in out.chunks_exact_mut(8).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Writes the serialized header.
    ///
    /// # Errors
    ///
    /// Propagates the writer's error.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }
}

/// Zero-based format version stored in the coverage mapping header.
///
/// # Errors
///
/// Returns `CovError::MalformedContent` if `covmap` is too short.
pub fn covmap_version(covmap: &[u8]) -> Result<u32> {
    covmap
        .get(COVMAP_VERSION_OFFSET..COVMAP_VERSION_OFFSET + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| CovError::MalformedContent {
            role: MapRole::CovMap,
            message: format!(
                "{} bytes is too short for a coverage mapping header",
                covmap.len()
            ),
        })
}
