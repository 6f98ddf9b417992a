use std::io;

use thiserror::Error;

/// Conditions that stop a ROM from loading or a cycle from completing.
///
/// Undefined opcodes are deliberately absent: they decode to a no-op.
#[derive(Debug, Error)]
pub enum Chip8Error {
    /// `size` stops counting at `max + 1` when the ROM comes from a reader
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("unable to read ROM: {0}")]
    RomRead(#[from] io::Error),

    #[error("stack overflow: CALL at {pc:#06X} with a full call stack")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: RET at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryFault { address: usize },
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
