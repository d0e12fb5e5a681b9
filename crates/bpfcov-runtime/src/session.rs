//! Entry/exit pairing of intercepted system calls.
//!
//! The kernel reports syscall-entry and syscall-exit stops identically, so
//! the tracer has to know which one it is looking at. [`SyscallTracker`]
//! keeps that as an explicit two-state machine and carries the "this call
//! creates a map" token from the entry to its exit.

use std::os::fd::RawFd;

/// `bpf(2)` syscall number on the host architecture.
#[allow(clippy::cast_sign_loss)]
pub const SYS_BPF: u64 = libc::SYS_bpf as u64;

#[allow(clippy::cast_sign_loss)]
const SYS_EXIT: u64 = libc::SYS_exit as u64;

#[allow(clippy::cast_sign_loss)]
const SYS_EXIT_GROUP: u64 = libc::SYS_exit_group as u64;

/// `BPF_MAP_CREATE` command of `bpf(2)`.
pub const BPF_MAP_CREATE: u32 = 0;

/// Registers captured at a syscall-entry stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallEntry {
    /// Syscall number.
    pub nr: u64,
    /// First four arguments.
    pub args: [u64; 4],
}

impl SyscallEntry {
    /// Whether this is `bpf(BPF_MAP_CREATE, ...)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn is_map_create(&self) -> bool {
        self.nr == SYS_BPF && self.args[0] as u32 == BPF_MAP_CREATE
    }

    /// Status passed to `exit` or `exit_group`, `None` for any other call.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn exit_status(self) -> Option<i32> {
        if self.nr == SYS_EXIT || self.nr == SYS_EXIT_GROUP {
            Some(self.args[0] as i32)
        } else {
            None
        }
    }
}

/// Position of the tracee inside the current syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// The next syscall stop is an entry.
    AwaitingEntry,
    /// The next syscall stop is the exit of the call just entered.
    AwaitingExit {
        /// The call being executed is `bpf(BPF_MAP_CREATE, ...)`.
        map_create: bool,
    },
}

/// Pairs syscall entries with exits and spots successful map creations.
#[derive(Debug, Clone)]
pub struct SyscallTracker {
    state: TraceState,
    last_entry: Option<SyscallEntry>,
}

impl Default for SyscallTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SyscallTracker {
    /// Starts outside of any syscall.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TraceState::AwaitingEntry,
            last_entry: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TraceState {
        self.state
    }

    /// Whether a map creation is waiting for its exit.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, TraceState::AwaitingExit { map_create: true })
    }

    /// The most recent syscall entry seen.
    #[must_use]
    pub const fn last_entry(&self) -> Option<SyscallEntry> {
        self.last_entry
    }

    /// Records a syscall-entry stop.
    pub fn on_entry(&mut self, entry: SyscallEntry) {
        self.state = TraceState::AwaitingExit {
            map_create: entry.is_map_create(),
        };
        self.last_entry = Some(entry);
    }

    /// Records a syscall-exit stop with the call's return value.
    ///
    /// Returns the tracee's descriptor of a newly created map when the
    /// paired entry was a map creation that succeeded. The pending token is
    /// cleared whatever the outcome.
    pub fn on_exit(&mut self, ret: i64) -> Option<RawFd> {
        let pending = self.is_pending();
        self.state = TraceState::AwaitingEntry;
        if !pending {
            return None;
        }
        RawFd::try_from(ret).ok().filter(|fd| *fd >= 0)
    }
}
