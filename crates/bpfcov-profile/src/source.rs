//! Where the serializer gets its maps from.

use bpfcov_common::config::PinPaths;
use bpfcov_common::error::Result;
use bpfcov_common::types::MapRole;
use bpfcov_ebpf::maps::{MapAccess, PinnedMap};

/// Provides the coverage map of each role.
pub trait MapSource {
    /// Handle type of an opened map.
    type Map: MapAccess;

    /// Opens the map of `role`.
    ///
    /// # Errors
    ///
    /// Fails if the map is absent or cannot be queried.
    fn open(&self, role: MapRole) -> Result<Self::Map>;
}

/// [`MapSource`] reading the maps pinned by a previous `run`.
///
/// Read-only: pins are never created or removed.
#[derive(Debug, Clone, Copy)]
pub struct PinnedSource<'a> {
    pins: &'a PinPaths,
}

impl<'a> PinnedSource<'a> {
    /// Creates a source over the given pin paths.
    #[must_use]
    pub const fn new(pins: &'a PinPaths) -> Self {
        Self { pins }
    }
}

impl MapSource for PinnedSource<'_> {
    type Map = PinnedMap;

    fn open(&self, role: MapRole) -> Result<PinnedMap> {
        PinnedMap::open(self.pins.get(role))
    }
}
