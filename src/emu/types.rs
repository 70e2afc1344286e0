/// Result type for CHIP-8 CPU cycle execution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip8Result {
    /// Continue executing instructions in the current frame.
    Continue,
    /// Wait for the next frame before continuing
    /// (after a draw, or while blocked on a key press).
    WaitForNextFrame,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomLoadError { size: usize, max_size: usize },

    #[error("Failed to read ROM data")]
    RomReadError(#[from] std::io::Error),

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("Stack overflow: subroutine call at {pc:#06X} exceeds 16 nested calls")]
    StackOverflow { pc: u16 },

    #[error("Stack underflow: return at {pc:#06X} with empty call stack")]
    StackUnderflow { pc: u16 },
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
pub const DISPLAY_SIZE: usize = DISPLAY_X * DISPLAY_Y;

/// Monochrome framebuffer, one byte (0 or 1) per pixel, indexed `x + y * DISPLAY_X`.
pub type Framebuffer = [u8; DISPLAY_SIZE];
