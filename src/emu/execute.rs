use rand::Rng;

use super::chip8::ProgramFlow;
use super::{
    Chip8, Chip8Error, DISPLAY_X, DISPLAY_Y, FONT_GLYPH_SIZE, FONT_START_ADDRESS, Opcode,
    OpcodeALU,
};
use crate::u4;

impl Chip8 {
    /// Applies one decoded instruction to the machine state.
    ///
    /// PC still points at the instruction being executed; the returned
    /// `ProgramFlow` says where it goes next. Errors are raised before any
    /// state is modified.
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<ProgramFlow, Chip8Error> {
        let flow = match opcode {
            Opcode::ClearDisplay => {
                self.display.fill(0);
                self.redraw = true;
                ProgramFlow::Next
            }
            Opcode::Jump { nnn } => ProgramFlow::Jump(nnn),
            Opcode::JumpWithOffset { nnn } => {
                ProgramFlow::Jump(nnn.wrapping_add(self.v[0].into()))
            }
            Opcode::Call { nnn } => {
                // The call's own address is saved; 00EE resumes right after it
                self.stack.push(self.pc)?;
                ProgramFlow::Jump(nnn)
            }
            Opcode::Return => {
                let caller = self.stack.pop(self.pc)?;
                ProgramFlow::Jump(caller.wrapping_add(2))
            }
            Opcode::SkipRegEqualImm { x, nn } => skip_if(self.v[x] == nn),
            Opcode::SkipRegNotEqualImm { x, nn } => skip_if(self.v[x] != nn),
            Opcode::SkipRegEqualReg { x, y } => skip_if(self.v[x] == self.v[y]),
            Opcode::SkipRegNotEqualReg { x, y } => skip_if(self.v[x] != self.v[y]),
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
                ProgramFlow::Next
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
                ProgramFlow::Next
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
                ProgramFlow::Next
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
                ProgramFlow::Next
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
                ProgramFlow::Next
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
                ProgramFlow::Next
            }
            Opcode::Draw { x, y, n } => self.execute_draw(x, y, n)?,
            // Key indices wider than a nibble only look at the low nibble
            Opcode::SkipIfPressed { x } => {
                skip_if(self.keypad[u4::from_low_bits(self.v[x])])
            }
            Opcode::SkipIfNotPressed { x } => {
                skip_if(!self.keypad[u4::from_low_bits(self.v[x])])
            }
            Opcode::WaitForKey { x } => self.execute_wait_for_key(x),
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
                ProgramFlow::Next
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
                ProgramFlow::Next
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
                ProgramFlow::Next
            }
            Opcode::FontChar { x } => {
                let glyph = u16::from(self.v[x]) * FONT_GLYPH_SIZE as u16;
                self.i = FONT_START_ADDRESS as u16 + glyph;
                ProgramFlow::Next
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                let range = Self::mem_range(self.i, 3)?;
                self.memory[range].copy_from_slice(&[
                    value / 100,
                    (value / 10) % 10,
                    value % 10,
                ]);
                ProgramFlow::Next
            }
            Opcode::StoreRegs { x } => {
                let count = usize::from(x) + 1;
                let range = Self::mem_range(self.i, count)?;
                self.memory[range].copy_from_slice(&self.v[..count]);
                ProgramFlow::Next
            }
            Opcode::LoadRegs { x } => {
                let count = usize::from(x) + 1;
                let range = Self::mem_range(self.i, count)?;
                self.v[..count].copy_from_slice(&self.memory[range]);
                ProgramFlow::Next
            }
            Opcode::Unknown(word) => {
                log::warn!("Unknown opcode {word:#06X} at {:#05X}, skipping", self.pc);
                ProgramFlow::Next
            }
        };

        Ok(flow)
    }

    /// The flag is written before the result, so for X = F the result wins.
    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        let (vx, vy) = (self.v[x], self.v[y]);

        match op {
            OpcodeALU::Set => self.v[x] = vy,
            OpcodeALU::Or => self.v[x] = vx | vy,
            OpcodeALU::And => self.v[x] = vx & vy,
            OpcodeALU::Xor => self.v[x] = vx ^ vy,
            OpcodeALU::Add => {
                let (res, carry) = vx.overflowing_add(vy);
                self.v[0xF] = u8::from(carry);
                self.v[x] = res;
            }
            OpcodeALU::Sub => {
                let (res, borrow) = vx.overflowing_sub(vy);
                self.v[0xF] = u8::from(!borrow); // Notice that borrow is inverted
                self.v[x] = res;
            }
            OpcodeALU::SubReverse => {
                let (res, borrow) = vy.overflowing_sub(vx);
                self.v[0xF] = u8::from(!borrow);
                self.v[x] = res;
            }
            OpcodeALU::ShiftRight => {
                self.v[0xF] = vx & 1;
                self.v[x] = vx >> 1;
            }
            OpcodeALU::ShiftLeft => {
                self.v[0xF] = vx >> 7;
                self.v[x] = vx << 1;
            }
        }
    }

    /// XOR-blits an 8xN sprite, wrapping around both display edges.
    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<ProgramFlow, Chip8Error> {
        let x_pos = self.v[x] as usize;
        let y_pos = self.v[y] as usize;
        let sprite = Self::mem_range(self.i, usize::from(n))?;

        let mut any_erased = false;
        for (row, &sprite_byte) in self.memory[sprite].iter().enumerate() {
            let py = (y_pos + row) % DISPLAY_Y;

            for col in 0..8 {
                // If current sprite bit is non-zero
                if (sprite_byte & (0x80 >> col)) != 0 {
                    let px = (x_pos + col) % DISPLAY_X;
                    let pixel = &mut self.display[px + py * DISPLAY_X];

                    if *pixel != 0 {
                        any_erased = true;
                    }

                    // Flip the pixel
                    *pixel ^= 1;
                }
            }
        }

        self.v[0xF] = u8::from(any_erased);
        self.redraw = true;
        Ok(ProgramFlow::Next)
    }

    fn execute_wait_for_key(&mut self, x: u4) -> ProgramFlow {
        // With several keys held the highest-numbered one wins
        match self.keypad.iter().rposition(|&pressed| pressed) {
            Some(key) => {
                self.v[x] = key as u8;
                self.waiting_for_key = None;
                ProgramFlow::Next
            }
            None => {
                // Repeat this instruction until a key is pressed
                self.waiting_for_key = Some(x);
                ProgramFlow::Repeat
            }
        }
    }
}

fn skip_if(condition: bool) -> ProgramFlow {
    if condition {
        ProgramFlow::Skip
    } else {
        ProgramFlow::Next
    }
}
