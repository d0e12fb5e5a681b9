//! Architecture-specific syscall register access.

use nix::sys::ptrace;
use nix::unistd::Pid;

use crate::session::SyscallEntry;

/// Reads the syscall number and first four arguments at an entry stop.
///
/// # Errors
///
/// Returns the `ptrace(PTRACE_GETREGS)` error; `ESRCH` means the tracee is gone.
#[cfg(target_arch = "x86_64")]
pub fn read_entry(pid: Pid) -> nix::Result<SyscallEntry> {
    let regs = ptrace::getregs(pid)?;
    Ok(SyscallEntry {
        nr: regs.orig_rax,
        args: [regs.rdi, regs.rsi, regs.rdx, regs.r10],
    })
}

/// Reads the syscall return value at an exit stop.
///
/// # Errors
///
/// Returns the `ptrace(PTRACE_GETREGS)` error; `ESRCH` means the tracee is gone.
#[cfg(target_arch = "x86_64")]
#[allow(clippy::cast_possible_wrap)]
pub fn read_return(pid: Pid) -> nix::Result<i64> {
    Ok(ptrace::getregs(pid)?.rax as i64)
}

/// Reads the syscall number and first four arguments at an entry stop.
///
/// # Errors
///
/// Returns the `ptrace(PTRACE_GETREGSET)` error; `ESRCH` means the tracee is gone.
#[cfg(target_arch = "aarch64")]
pub fn read_entry(pid: Pid) -> nix::Result<SyscallEntry> {
    let regs = ptrace::getregs(pid)?;
    Ok(SyscallEntry {
        nr: regs.regs[8],
        args: [regs.regs[0], regs.regs[1], regs.regs[2], regs.regs[3]],
    })
}

/// Reads the syscall return value at an exit stop.
///
/// # Errors
///
/// Returns the `ptrace(PTRACE_GETREGSET)` error; `ESRCH` means the tracee is gone.
#[cfg(target_arch = "aarch64")]
#[allow(clippy::cast_possible_wrap)]
pub fn read_return(pid: Pid) -> nix::Result<i64> {
    Ok(ptrace::getregs(pid)?.regs[0] as i64)
}
