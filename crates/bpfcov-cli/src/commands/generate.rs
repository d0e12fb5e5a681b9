//! `bpfcov gen`: generate the raw profile from previously pinned maps.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use bpfcov_common::constants::PROFRAW_EXTENSION;
use clap::Args;

/// Arguments for the `gen` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Set the output path (defaults to `<program>.profraw`).
    #[arg(short, long, value_name = "path")]
    pub output: Option<PathBuf>,

    /// Append the function names section after the counters.
    #[arg(long)]
    pub include_names: bool,

    /// Instrumented program; extra arguments are accepted and ignored.
    #[arg(
        value_name = "program",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub program: Vec<OsString>,
}

/// Executes the `gen` command.
///
/// # Errors
///
/// Returns an error if any pin is missing or the profile cannot be written.
pub fn execute(args: GenerateArgs, bpffs: PathBuf, verbosity: u8) -> anyhow::Result<()> {
    if args.output.as_ref().is_some_and(|o| o.as_os_str().is_empty()) {
        anyhow::bail!("option '--output' requires a path");
    }
    let output = args
        .output
        .or_else(|| args.program.first().map(OsString::as_os_str).map(default_output));
    let (config, layout) =
        super::build_config(bpffs, args.program, output, verbosity, args.include_names)?;
    layout.verify_gen()?;

    let written = bpfcov_profile::profile::generate(&config)?;
    tracing::info!(
        output = ?config.output,
        bytes = written,
        "profile written"
    );
    Ok(())
}

/// `<program>.profraw`, next to the program.
fn default_output(program: &OsStr) -> PathBuf {
    let mut path = program.to_os_string();
    path.push(".");
    path.push(PROFRAW_EXTENSION);
    PathBuf::from(path)
}
