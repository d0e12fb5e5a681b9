//! Cross-process descriptor duplication.
//!
//! A map created by the tracee is only reachable through the tracee's own
//! descriptor table. [`DescriptorSource`] copies such a descriptor into this
//! process; the Linux implementation relies on `pidfd_getfd(2)` (5.6+).

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use nix::unistd::Pid;

/// Duplicates a descriptor owned by another process.
pub trait DescriptorSource {
    /// Returns a local duplicate of `target_fd` from the table of `pid`.
    ///
    /// # Errors
    ///
    /// Fails if the process is gone, access is denied, or the primitive is
    /// unavailable.
    fn duplicate(&self, pid: Pid, target_fd: RawFd) -> io::Result<OwnedFd>;
}

/// [`DescriptorSource`] backed by `pidfd_open(2)` and `pidfd_getfd(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidfdSource;

/// Opens a pidfd referring to `pid`.
///
/// # Errors
///
/// Returns the OS error of `pidfd_open(2)`.
pub fn open_pidfd(pid: Pid) -> io::Result<OwnedFd> {
    // SAFETY: pidfd_open takes a pid and flags by value and touches no memory.
    let raw = unsafe { libc::syscall(libc::SYS_pidfd_open, pid.as_raw(), 0) };
    into_owned(raw)
}

fn into_owned(raw: libc::c_long) -> io::Result<OwnedFd> {
    if raw < 0 {
        return Err(io::Error::last_os_error());
    }
    let fd = RawFd::try_from(raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    // SAFETY: the kernel just returned `fd` as a fresh descriptor owned by us.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

impl DescriptorSource for PidfdSource {
    fn duplicate(&self, pid: Pid, target_fd: RawFd) -> io::Result<OwnedFd> {
        let pidfd = open_pidfd(pid)?;
        // SAFETY: pidfd_getfd takes descriptors and flags by value and
        // touches no memory; `pidfd` stays open for the duration of the call.
        let raw = unsafe { libc::syscall(libc::SYS_pidfd_getfd, pidfd.as_raw_fd(), target_fd, 0) };
        into_owned(raw)
    }
}
