use std::io;

/// Everything that can stop a CHIP-8 run. None of these are recoverable
/// mid-cycle; a well-formed ROM never raises any of the machine variants.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("unknown opcode {opcode:#06x} at {addr:#05x}")]
    UnknownOpcode { opcode: u16, addr: u16 },

    #[error("stack overflow: call at {addr:#05x} exceeds 16 levels")]
    StackOverflow { addr: u16 },

    #[error("stack underflow: return at {addr:#05x} with empty call stack")]
    StackUnderflow { addr: u16 },

    #[error("memory access out of bounds at address {addr:#06x}")]
    MemoryOutOfBounds { addr: usize },

    #[error("key {key:#04x} out of range, keys go up to 0xf")]
    KeyOutOfRange { key: u8 },

    #[error("reset requested before any program was loaded")]
    NoProgramLoaded,

    #[error(transparent)]
    Io(#[from] io::Error),
}
