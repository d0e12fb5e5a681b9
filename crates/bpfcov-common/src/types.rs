//! Domain primitive types used across the bpfcov workspace.

use std::fmt;

/// Semantic category of a coverage-instrumentation map.
///
/// Instrumented programs name their global-data maps `<owner>.<suffix>`;
/// the suffix selects the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapRole {
    /// Per-counter `u64` values (`profc`).
    Counters,
    /// Per-function metadata records (`profd`).
    Data,
    /// Compressed function names (`profn`).
    Names,
    /// Coverage mapping header (`covmap`).
    CovMap,
}

impl MapRole {
    /// Every role, in pin-slot order.
    pub const ALL: [Self; 4] = [Self::Counters, Self::Data, Self::Names, Self::CovMap];

    /// Name suffix, also used as the pin file name.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Counters => "profc",
            Self::Data => "profd",
            Self::Names => "profn",
            Self::CovMap => "covmap",
        }
    }

    /// Slot of the role inside fixed-size per-role tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Counters => 0,
            Self::Data => 1,
            Self::Names => 2,
            Self::CovMap => 3,
        }
    }

    /// Looks up a role by its exact suffix.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.suffix() == suffix)
    }

    /// Resolves the role of a kernel map name of the form `<owner>.<suffix>`.
    ///
    /// Returns `None` unless the name has exactly two non-empty dot-separated
    /// tokens and the second one is a known suffix.
    #[must_use]
    pub fn from_map_name(name: &str) -> Option<Self> {
        let (owner, suffix) = name.split_once('.')?;
        if owner.is_empty() || suffix.contains('.') {
            return None;
        }
        Self::from_suffix(suffix)
    }
}

impl fmt::Display for MapRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Shape of a kernel map, as reported by `BPF_OBJ_GET_INFO_BY_FD`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapMeta {
    /// Kernel-assigned map identifier.
    pub id: u32,
    /// Key size in bytes.
    pub key_size: u32,
    /// Value size in bytes.
    pub value_size: u32,
    /// Declared capacity.
    pub max_entries: u32,
}
