//! Integration tests for profile generation.
//!
//! These tests are implemented in:
//! `crates/bpfcov-profile/tests/gen_pipeline.rs`
//!
//! Covered scenarios:
//! - `single_function_profile_is_144_bytes`: Header plus one data record plus one counter
//! - `header_counts_follow_map_sizes`: Data and counter counts derive from value sizes
//! - `names_section_is_opt_in_and_padded`: Names are appended only on request, 8-byte aligned
//! - `missing_role_fails_before_output_is_created`: No file appears when a map is absent
//! - `empty_singleton_is_fatal`: A map without an element aborts generation
//! - `write_replaces_existing_output`: Output is replaced in place
//! - `write_keeps_mode_of_replaced_output`: A replaced profile keeps its permissions
//! - `new_output_mode_follows_umask`: A new profile gets 0666 minus the umask
//! - `generate_without_pins_writes_nothing`: Missing pins leave no partial file
//! - `generate_requires_output_path`: Config without an output path is rejected
