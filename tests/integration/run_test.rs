//! Integration tests for the `run` monitor.
//!
//! These tests are implemented in:
//! `crates/bpfcov-runtime/tests/monitor_test.rs`
//!
//! Covered scenarios:
//! - `monitor_returns_child_exit_code`: Child exit status becomes the monitor's result
//! - `monitor_returns_zero_for_clean_exit`: A traced child that writes output exits 0
//! - `monitor_reports_signal_termination`: SIGKILL maps to 128 + 9
//! - `monitor_forwards_signals_to_the_child`: SIGTERM reaches the child and maps to 128 + 15
//! - `monitor_delivers_sigtrap_to_the_child`: A SIGTRAP sent to the child is re-injected, not swallowed
//! - `monitor_survives_exec_inside_the_child`: A second exec is an event stop, not a signal
//! - `monitor_fails_for_missing_program`: Spawn failure is an error, not an exit code
//!
//! Pinning against a live bpffs needs `CAP_BPF` and a loader program, so it is
//! exercised through the `PinningSink` unit tests with fake descriptor sources.
