//! `bpfcov run`: execute an instrumented program and pin its coverage maps.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use bpfcov_common::types::MapRole;
use bpfcov_ebpf::maps;
use bpfcov_ebpf::pin::RolePins;
use bpfcov_runtime::fd::PidfdSource;
use bpfcov_runtime::tracer::{Monitor, PinningSink};
use clap::Args;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Instrumented program followed by its arguments.
    #[arg(
        value_name = "program",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub program: Vec<OsString>,
}

/// Executes the `run` command.
///
/// The process exits with the traced program's own status.
///
/// # Errors
///
/// Returns an error if the pin directory cannot be prepared or tracing fails.
pub fn execute(args: RunArgs, bpffs: PathBuf, verbosity: u8) -> anyhow::Result<ExitCode> {
    let (config, layout) = super::build_config(bpffs, args.program, None, verbosity, false)?;
    layout.prepare_run()?;

    let sink = PinningSink::new(PidfdSource, RolePins::new(config.pins.clone()));
    let mut monitor = Monitor::new(sink);
    let code = monitor.run(&config.program)?;

    let pins = monitor.sink().pins();
    for (role, path) in config.pins.iter().filter(|(role, _)| pins.is_pinned(*role)) {
        match maps::inspect(path) {
            Ok(meta) => tracing::debug!(
                %role,
                id = meta.id,
                value_size = meta.value_size,
                "map pinned"
            ),
            Err(e) => tracing::warn!(%role, error = %e, "pinned map cannot be read back"),
        }
    }
    let pinned = pins.pinned_count();
    if pinned < MapRole::ALL.len() {
        tracing::warn!(pinned, "program exited before creating every coverage map");
    } else {
        tracing::info!(pinned, "coverage maps pinned");
    }
    Ok(exit_code(code))
}

/// Maps a child status onto the 8-bit process exit code.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}
