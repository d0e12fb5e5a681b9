//! Syscall-tracing monitor for bpfcov.
//!
//! Runs the instrumented program under `ptrace(2)`, pairs every syscall
//! entry with its exit, and pins each coverage map the program creates.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod fd;
pub mod regs;
pub mod session;
pub mod tracer;
