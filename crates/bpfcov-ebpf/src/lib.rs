//! # bpfcov-ebpf
//!
//! Kernel-object plumbing for bpfcov:
//! - **Pin layout**: where the coverage maps of a program live on the BPF
//!   filesystem, and the reset-or-fail policy applied before `run`/`gen`.
//! - **Pinning**: exposing a captured map so it outlives the traced process.
//! - **Introspection**: resolving pins back to live maps, querying their
//!   shape and reading single-entry global-data maps.
//!
//! Raw `bpf(2)` commands that aya does not expose for untyped maps are
//! wrapped in [`sys`] with `// SAFETY:` documentation.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod bpffs;
pub mod maps;
pub mod pin;
pub mod sys;
