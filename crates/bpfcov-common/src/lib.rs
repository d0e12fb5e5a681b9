//! # bpfcov-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the entire bpfcov workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives that the tracer, the map
//! introspection layer and the profile serializer agree on.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
