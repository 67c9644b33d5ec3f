//! Typed errors raised by the execution core.

use thiserror::Error;

/// A fault raised while running under `--strict` decode policy.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("illegal instruction 0x{instruction:08X} at pc=0x{pc:08X}")]
    IllegalInstruction { pc: u32, instruction: u32 },
}
