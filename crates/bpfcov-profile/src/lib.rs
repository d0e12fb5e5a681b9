//! Raw profile generation for bpfcov.
//!
//! Reads the four pinned coverage maps of a program and lays them out in
//! the raw profile format consumed by `llvm-profdata`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod header;
pub mod profile;
pub mod source;
