//! The syscall-tracing monitor.
//!
//! The traced program is resumed from one syscall stop to the next. Each
//! entry stop is fed to a [`SyscallTracker`]; when the paired exit stop
//! reveals a freshly created map, the tracee's descriptor is handed to a
//! [`MapSink`], which pins coverage maps under their role path.

use std::ffi::{OsStr, OsString};
use std::os::fd::{OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use aya::maps::MapData;
use bpfcov_common::error::{CovError, Result};
use bpfcov_common::types::MapRole;
use bpfcov_ebpf::pin::{self, RolePins};
use nix::errno::Errno;
use nix::sys::ptrace::{self, Options};
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

use crate::fd::DescriptorSource;
use crate::regs;
use crate::session::{SyscallEntry, SyscallTracker, TraceState};

/// Receives the maps created by the traced program.
pub trait MapSink {
    /// Called once per successful `bpf(BPF_MAP_CREATE)` in the tracee.
    ///
    /// `handle` is the descriptor number inside the tracee.
    ///
    /// # Errors
    ///
    /// An error aborts the whole trace.
    fn on_map_created(&mut self, pid: Pid, handle: RawFd) -> Result<()>;
}

/// [`MapSink`] that pins coverage maps at their role path.
#[derive(Debug)]
pub struct PinningSink<D> {
    source: D,
    pins: RolePins,
}

impl<D: DescriptorSource> PinningSink<D> {
    /// Creates a sink pinning into `pins`, duplicating through `source`.
    pub const fn new(source: D, pins: RolePins) -> Self {
        Self { source, pins }
    }

    /// Pin bookkeeping of this run.
    pub const fn pins(&self) -> &RolePins {
        &self.pins
    }
}

impl<D: DescriptorSource> MapSink for PinningSink<D> {
    fn on_map_created(&mut self, pid: Pid, handle: RawFd) -> Result<()> {
        let fd = match self.source.duplicate(pid, handle) {
            Ok(fd) => fd,
            Err(e) => {
                tracing::debug!(
                    pid = pid.as_raw(),
                    handle,
                    error = %e,
                    "could not duplicate map descriptor, skipping"
                );
                return Ok(());
            }
        };
        let Some((map, name)) = describe(fd) else {
            return Ok(());
        };
        let Some(role) = MapRole::from_map_name(&name) else {
            tracing::debug!(map = %name, "not a coverage map");
            return Ok(());
        };
        let path = self.pins.claim(role)?;
        pin::pin_map(&map, &name, path)
    }
}

fn describe(fd: OwnedFd) -> Option<(MapData, String)> {
    let map = MapData::from_fd(fd)
        .map_err(|e| tracing::debug!(error = %e, "descriptor is not a usable map"))
        .ok()?;
    let info = map
        .info()
        .map_err(|e| tracing::debug!(error = %e, "could not query map info"))
        .ok()?;
    let name = info.name_as_str().filter(|n| !n.is_empty())?.to_owned();
    tracing::info!(map = %name, "captured map");
    Some((map, name))
}

/// Runs a program to completion under trace control.
#[derive(Debug)]
pub struct Monitor<S> {
    sink: S,
}

impl<S: MapSink> Monitor<S> {
    /// Creates a monitor delivering captured maps to `sink`.
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }

    /// The sink, for inspection after a run.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Spawns `argv` as a traced child and traces it until it exits.
    ///
    /// Returns the child's exit code, or `128 + signal` if it was killed.
    ///
    /// # Errors
    ///
    /// Returns `CovError::Config` for an empty `argv`, `CovError::Io` if the
    /// program cannot be spawned, `CovError::Trace` if a trace-control
    /// primitive fails, and any error raised by the sink.
    pub fn run(&mut self, argv: &[OsString]) -> Result<i32> {
        let (program, args) = argv.split_first().ok_or_else(|| CovError::Config {
            message: "missing program to run".into(),
        })?;
        tracing::info!(program = %program.to_string_lossy(), "executing program");
        let pid = spawn_traced(program, args)?;
        let mut session = TraceSession::attach(pid)?;
        loop {
            if let Some(code) = session.step(&mut self.sink)? {
                tracing::info!(pid = pid.as_raw(), code, "program exited");
                return Ok(code);
            }
        }
    }
}

#[allow(clippy::zombie_processes)] // reaped through waitpid by the session
fn spawn_traced(program: &OsStr, args: &[OsString]) -> Result<Pid> {
    let mut command = Command::new(program);
    // SAFETY: the hook runs between fork and exec and only issues
    // ptrace(PTRACE_TRACEME), which allocates nothing and takes no locks.
    let command = unsafe {
        command
            .args(args)
            .pre_exec(|| ptrace::traceme().map_err(std::io::Error::from))
    };
    let child = command.spawn().map_err(|source| CovError::Io {
        path: PathBuf::from(program),
        source,
    })?;
    let raw = i32::try_from(child.id()).map_err(|_| CovError::Config {
        message: format!("child pid {} out of range", child.id()),
    })?;
    Ok(Pid::from_raw(raw))
}

/// Outcome of waiting on the tracee.
enum Stop {
    Syscall,
    Other,
    Exited(i32),
}

/// One traced child process.
struct TraceSession {
    pid: Pid,
    tracker: SyscallTracker,
    pending_signal: Option<Signal>,
}

impl TraceSession {
    /// Synchronizes with the exec stop and configures trace options.
    fn attach(pid: Pid) -> Result<Self> {
        match waitpid(pid, None).map_err(|e| CovError::trace("waitpid", e))? {
            WaitStatus::Stopped(_, Signal::SIGTRAP) => {}
            status => {
                return Err(CovError::trace(
                    "waitpid",
                    std::io::Error::other(format!("unexpected initial stop: {status:?}")),
                ));
            }
        }
        ptrace::setoptions(
            pid,
            Options::PTRACE_O_EXITKILL
                | Options::PTRACE_O_TRACESYSGOOD
                | Options::PTRACE_O_TRACEEXEC,
        )
        .map_err(|e| CovError::trace("PTRACE_SETOPTIONS", e))?;
        Ok(Self {
            pid,
            tracker: SyscallTracker::new(),
            pending_signal: None,
        })
    }

    /// Resumes to the next stop and processes it.
    ///
    /// Returns the exit code once the tracee is gone.
    fn step<S: MapSink>(&mut self, sink: &mut S) -> Result<Option<i32>> {
        ptrace::syscall(self.pid, self.pending_signal.take())
            .map_err(|e| CovError::trace("PTRACE_SYSCALL", e))?;
        match self.wait()? {
            Stop::Exited(code) => return Ok(Some(code)),
            Stop::Other => return Ok(None),
            Stop::Syscall => {}
        }

        match self.tracker.state() {
            TraceState::AwaitingEntry => match regs::read_entry(self.pid) {
                Ok(entry) => self.tracker.on_entry(entry),
                Err(Errno::ESRCH) => return self.reap().map(Some),
                Err(e) => return Err(CovError::trace("PTRACE_GETREGS", e)),
            },
            TraceState::AwaitingExit { .. } => {
                let ret = match regs::read_return(self.pid) {
                    Ok(ret) => ret,
                    Err(Errno::ESRCH) => return self.reap().map(Some),
                    Err(e) => return Err(CovError::trace("PTRACE_GETREGS", e)),
                };
                if let Some(entry) = self.tracker.last_entry() {
                    tracing::debug!(nr = entry.nr, args = ?entry.args, ret, "syscall");
                }
                if let Some(handle) = self.tracker.on_exit(ret) {
                    sink.on_map_created(self.pid, handle)?;
                }
            }
        }
        Ok(None)
    }

    fn wait(&mut self) -> Result<Stop> {
        let status = waitpid(self.pid, None).map_err(|e| CovError::trace("waitpid", e))?;
        Ok(match status {
            WaitStatus::PtraceSyscall(_) => Stop::Syscall,
            WaitStatus::Exited(_, code) => Stop::Exited(code),
            WaitStatus::Signaled(_, signal, _) => Stop::Exited(128 + signal as i32),
            // later execs are reported as events, so every plain stop is a
            // signal meant for the child
            WaitStatus::Stopped(_, signal) => {
                self.pending_signal = Some(signal);
                Stop::Other
            }
            // exec events and continued stops
            _ => Stop::Other,
        })
    }

    /// Collects the exit status of a tracee that vanished under a stop.
    fn reap(&self) -> Result<i32> {
        match waitpid(self.pid, None) {
            Ok(WaitStatus::Exited(_, code)) => Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => Ok(128 + signal as i32),
            status => self
                .tracker
                .last_entry()
                .and_then(SyscallEntry::exit_status)
                .ok_or_else(|| {
                    CovError::trace(
                        "waitpid",
                        std::io::Error::other(format!(
                            "tracee vanished outside of exit: {status:?}"
                        )),
                    )
                }),
        }
    }
}
