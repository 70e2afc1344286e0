use std::io::Read;
use std::ops::Range;

use rand::{SeedableRng, rngs::StdRng};

use super::{
    CallStack, Chip8Error, Chip8Result, DISPLAY_SIZE, DISPLAY_X, DISPLAY_Y, FONT,
    FONT_END_ADDRESS, FONT_START_ADDRESS, Framebuffer, Opcode,
};
use crate::u4;

// Standard CHIP-8 memory layout
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;

/// How the program counter moves once an instruction has executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProgramFlow {
    /// Advance to the next instruction (PC + 2).
    Next,
    /// Skip the next instruction (PC + 4).
    Skip,
    /// Continue at an explicit address.
    Jump(u16),
    /// Execute the same instruction again next cycle.
    Repeat,
}

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Framebuffer,
    /// Set whenever the display changes, cleared by the consumer of the frame
    pub(crate) redraw: bool,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: CallStack,

    /// Delay timer: decrements once per cycle until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements once per cycle, beeps while non-zero
    pub(crate) sound_timer: u8,

    /// Register waiting to receive a key while blocked on Fx0A
    pub(crate) waiting_for_key: Option<u4>,
    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keypad: [bool; 16],

    /// The last fetched instruction word
    pub(crate) opcode: u16,
    /// Source of random bytes for Cxnn
    pub(crate) rng: StdRng,
}

impl Chip8 {
    /// Creates a machine with a randomly seeded random number generator.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates a machine whose Cxnn results are reproducible for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        Chip8 {
            memory,
            display: [0; DISPLAY_SIZE],
            redraw: false,
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
            waiting_for_key: None,
            keypad: [false; 16],
            opcode: 0,
            rng,
        }
    }

    /// Copies a ROM image into program memory starting at 0x200.
    ///
    /// Nothing is written if the image does not fit.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.memory
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomLoadError {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            })?
            .copy_from_slice(rom);

        // Set program counter to start of ROM
        self.pc = ROM_START_ADDRESS as u16;

        log::debug!(
            "Loaded {} byte ROM at {:#05X}",
            rom.len(),
            ROM_START_ADDRESS
        );
        Ok(())
    }

    /// Reads a whole ROM image from `reader` and loads it.
    pub fn load_from_reader<R: Read>(&mut self, mut reader: R) -> Result<(), Chip8Error> {
        let mut rom = Vec::new();
        reader.read_to_end(&mut rom)?;
        self.load(&rom)
    }

    /// Executes a single cycle: fetch, decode, execute, then tick both timers.
    ///
    /// On error the cycle is abandoned before any register, stack, PC or
    /// timer change is made.
    pub fn step(&mut self) -> Result<Chip8Result, Chip8Error> {
        let word = self.fetch()?;
        self.opcode = word;

        let opcode = Opcode::decode(word);
        log::trace!("{:#05X}: {word:04X}  {opcode}", self.pc);

        let flow = self.execute(opcode)?;
        self.pc = match flow {
            ProgramFlow::Next => self.pc.wrapping_add(2),
            ProgramFlow::Skip => self.pc.wrapping_add(4),
            ProgramFlow::Jump(address) => address,
            ProgramFlow::Repeat => self.pc,
        };

        self.timers_cycle();

        match (flow, opcode) {
            (ProgramFlow::Repeat, _) | (_, Opcode::Draw { .. }) => {
                Ok(Chip8Result::WaitForNextFrame)
            }
            _ => Ok(Chip8Result::Continue),
        }
    }

    fn timers_cycle(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad[key] = pressed;
    }

    pub fn keypad(&self) -> &[bool; 16] {
        &self.keypad
    }

    /// True while an Fx0A instruction is blocked waiting for a key press.
    pub fn is_waiting_for_key(&self) -> bool {
        self.waiting_for_key.is_some()
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    ///
    /// Coordinates outside the display read as off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_X && y < DISPLAY_Y && self.display[x + y * DISPLAY_X] != 0
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.display
    }

    pub fn redraw_requested(&self) -> bool {
        self.redraw
    }

    pub fn clear_redraw(&mut self) {
        self.redraw = false;
    }

    /// Returns the redraw flag and clears it.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// The most recently fetched instruction word.
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Live call stack entries, outermost call first.
    pub fn stack(&self) -> &[u16] {
        self.stack.as_slice()
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.depth()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn set_register(&mut self, x: u4, value: u8) {
        self.v[x] = value;
    }

    pub fn set_index(&mut self, value: u16) {
        self.i = value;
    }

    /// Moving PC abandons a pending Fx0A wait.
    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
        self.waiting_for_key = None;
    }

    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }

    /// Fetches the 16-bit opcode at PC without advancing it.
    fn fetch(&self) -> Result<u16, Chip8Error> {
        let range = Self::mem_range(self.pc, 2)?;
        let bytes = &self.memory[range];

        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Bounds-checks `len` bytes starting at `addr` and returns them as an index range.
    pub(crate) fn mem_range(addr: u16, len: usize) -> Result<Range<usize>, Chip8Error> {
        let start = addr as usize;
        let end = start + len;
        if end > MEMORY_SIZE {
            return Err(Chip8Error::MemoryOutOfBounds {
                address: start.max(MEMORY_SIZE) as u16,
            });
        }

        Ok(start..end)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
