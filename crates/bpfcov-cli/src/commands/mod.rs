//! CLI command definitions and dispatch.

pub mod generate;
pub mod run;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use bpfcov_common::config::CovConfig;
use bpfcov_common::constants::{BIN_NAME, DEFAULT_BPFFS, MAX_VERBOSITY};
use bpfcov_ebpf::bpffs::{self, PinLayout};
use clap::{Parser, Subcommand};

/// Obtain coverage from your instrumented eBPF programs.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Set the BPF FS path.
    #[arg(long, global = true, value_name = "path", default_value = DEFAULT_BPFFS)]
    pub bpffs: String,

    /// Set the verbosity level (0-3); `-v` alone raises it by one.
    #[arg(
        short,
        long,
        global = true,
        value_name = "level",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "+",
        value_parser = parse_level,
        action = clap::ArgAction::Append
    )]
    pub verbose: Vec<LevelArg>,
}

/// One occurrence of the verbosity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    /// `-v` without a value.
    Raise,
    /// `--verbose=<level>`.
    Set(u8),
}

fn parse_level(s: &str) -> Result<LevelArg, String> {
    if s == "+" {
        return Ok(LevelArg::Raise);
    }
    let level: u8 = s
        .parse()
        .map_err(|_| format!("requires a numeric level, got '{s}'"))?;
    if level > MAX_VERBOSITY {
        return Err(format!("requires a level value in [0,{MAX_VERBOSITY}]"));
    }
    Ok(LevelArg::Set(level))
}

impl Cli {
    /// Folds the verbosity flags into a level.
    ///
    /// # Errors
    ///
    /// Returns an error if repeated `-v` flags exceed the maximum level.
    pub fn verbosity(&self) -> anyhow::Result<u8> {
        let mut level = 0u8;
        for arg in &self.verbose {
            level = match arg {
                LevelArg::Raise => level.saturating_add(1),
                LevelArg::Set(n) => *n,
            };
        }
        if level > MAX_VERBOSITY {
            bail!("verbosity level {level} out of range [0,{MAX_VERBOSITY}]");
        }
        Ok(level)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute your bpfcov instrumented program.
    Run(run::RunArgs),
    /// Generate the profraw file for the bpfcov instrumented program.
    #[command(name = "gen")]
    Generate(generate::GenerateArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli, verbosity: u8) -> anyhow::Result<ExitCode> {
    let bpffs = resolve_bpffs(&cli.bpffs)?;
    match cli.command {
        Command::Run(args) => run::execute(args, bpffs, verbosity),
        Command::Generate(args) => generate::execute(args, bpffs, verbosity).map(|()| ExitCode::SUCCESS),
    }
}

/// Normalizes the `--bpffs` value and checks it is a mounted BPF filesystem.
fn resolve_bpffs(raw: &str) -> anyhow::Result<PathBuf> {
    if raw.is_empty() {
        bail!("option '--bpffs' requires a path");
    }
    let path = PathBuf::from(bpffs::strip_trailing_slashes(raw));
    bpffs::ensure_bpffs(&path)?;
    Ok(path)
}

/// Builds the invocation configuration shared by both subcommands.
pub(crate) fn build_config(
    bpffs: PathBuf,
    program: Vec<OsString>,
    output: Option<PathBuf>,
    verbosity: u8,
    include_names: bool,
) -> anyhow::Result<(CovConfig, PinLayout)> {
    let program_path = program
        .first()
        .map(Path::new)
        .context("missing program argument")?;
    if !program_path.exists() {
        bail!("program '{}' does not actually exist", program_path.display());
    }
    let layout = PinLayout::resolve(&bpffs, program_path)?;
    let config = CovConfig {
        bpffs,
        program,
        output,
        pins: layout.pins.clone(),
        verbosity,
        include_names,
    };
    Ok((config, layout))
}
