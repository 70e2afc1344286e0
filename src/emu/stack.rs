use super::Chip8Error;

/// Maximum nesting depth of subroutine calls.
pub const STACK_DEPTH: usize = 16;

/// Fixed-depth call stack holding the addresses of pending `2NNN` calls.
///
/// `sp` is the number of live entries; slots at or above `sp` are stale.
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    entries: [u16; STACK_DEPTH],
    sp: usize,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the address of a call instruction.
    pub fn push(&mut self, pc: u16) -> Result<(), Chip8Error> {
        let slot = self
            .entries
            .get_mut(self.sp)
            .ok_or(Chip8Error::StackOverflow { pc })?;
        *slot = pc;
        self.sp += 1;
        Ok(())
    }

    /// Pops the most recent call address. `pc` is only used for error reporting.
    pub fn pop(&mut self, pc: u16) -> Result<u16, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { pc });
        }
        self.sp -= 1;
        Ok(std::mem::take(&mut self.entries[self.sp]))
    }

    /// Current depth (stack pointer).
    pub fn depth(&self) -> usize {
        self.sp
    }

    /// Live entries, oldest first.
    pub fn as_slice(&self) -> &[u16] {
        &self.entries[..self.sp]
    }
}
