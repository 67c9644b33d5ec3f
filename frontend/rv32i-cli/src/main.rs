use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use rv32i_core::{Machine, RunOutcome};
use thiserror::Error;

/// Parses a RAM size with an optional human-friendly suffix (`K`/`M`/`G`/`T`, binary units,
/// case-insensitive, an optional trailing `B` ignored) or a plain byte count.
fn parse_ram_size(raw: &str) -> Result<usize, String> {
    let raw = raw.trim();
    let split_at = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, suffix) = raw.split_at(split_at);

    let value: usize =
        digits.parse().map_err(|_| format!("invalid RAM size '{raw}': no numeric prefix"))?;

    let multiplier = match suffix.to_ascii_uppercase().trim_end_matches('B') {
        "" => 1,
        "K" => 1 << 10,
        "M" => 1 << 20,
        "G" => 1 << 30,
        "T" => 1 << 40,
        other => return Err(format!("invalid RAM size '{raw}': unrecognized suffix '{other}'")),
    };

    value.checked_mul(multiplier).ok_or_else(|| format!("RAM size '{raw}' overflows usize"))
}

#[derive(Parser)]
struct Args {
    /// Firmware image loaded at address 0
    #[arg(short = 'f', long, default_value = "bios.sto")]
    file_path: PathBuf,

    /// Main memory size, parsed with a human-friendly suffix (e.g. `512M`, `1G`)
    #[arg(long, default_value = "1G", value_parser = parse_ram_size)]
    ram_size: usize,

    /// Stop after this many retired instructions if ebreak has not fired yet
    #[arg(long)]
    max_steps: Option<u64>,

    /// Log every retired instruction at trace level
    #[arg(long)]
    trace: bool,

    /// Treat illegal instructions as a fatal error instead of a no-op
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Error)]
enum LoaderError {
    #[error("failed to read firmware image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn load_firmware(path: &PathBuf) -> Result<Vec<u8>, LoaderError> {
    fs::read(path).map_err(|source| LoaderError::Read { path: path.clone(), source })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let image = load_firmware(&args.file_path).with_context(|| {
        format!("could not start: failed to load firmware image from {}", args.file_path.display())
    })?;

    let mut machine = Machine::new(args.ram_size, args.strict, args.trace);
    machine.load_firmware(&image);

    let outcome = machine.run(args.max_steps).context("execution halted on a decode error")?;

    match outcome {
        RunOutcome::Halted { steps } => log::info!("halted after {steps} instructions"),
        RunOutcome::MaxStepsReached { steps } => {
            log::info!("reached --max-steps bound after {steps} instructions");
        }
    }

    Ok(())
}
