//! System-wide constants: default paths, pin names and profile layout values.

/// Default mount point of the BPF filesystem.
pub const DEFAULT_BPFFS: &str = "/sys/fs/bpf";

/// `statfs(2)` magic number identifying a BPF filesystem.
pub const BPF_FS_MAGIC: u64 = 0xcafe_4a11;

/// Directory under the BPF filesystem holding per-program pin directories.
pub const COVERAGE_DIR: &str = "cov";

/// Extension appended to the program path for the default output file.
pub const PROFRAW_EXTENSION: &str = "profraw";

/// Magic number opening every raw profile, as written little-endian.
pub const PROFRAW_MAGIC: u64 = 0xff6c_7072_6f66_7281;

/// Length in bytes of the fixed raw profile header.
pub const PROFRAW_HEADER_LEN: usize = 88;

/// Size of one per-function data record: five `u64` and two `u32` fields.
pub const DATA_RECORD_SIZE: u64 = 48;

/// Size of one counter record.
pub const COUNTER_RECORD_SIZE: u64 = 8;

/// Byte offset of the format version inside the coverage mapping header.
///
/// The header is a sequence of `u32` fields and the version is the fourth.
pub const COVMAP_VERSION_OFFSET: usize = 12;

/// Marker written in the last header slot (`IPVK_Last`).
pub const VALUE_KIND_LAST: u64 = 1;

/// Highest accepted verbosity level.
pub const MAX_VERBOSITY: u8 = 3;

/// Binary name for the CLI.
pub const BIN_NAME: &str = "bpfcov";
