use std::fmt;

use crate::u4;

/// CHIP-8 instruction opcodes.
///
/// The fields (x, y, n, nn, nnn) correspond to the operands encoded in the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// 1nnn - Jump to location nnn.
    Jump { nnn: u16 },
    /// Bnnn - Jump to location nnn + V0.
    JumpWithOffset { nnn: u16 },

    /// 2nnn - Call subroutine at nnn.
    Call { nnn: u16 },
    /// 00EE - Return from a subroutine.
    Return,

    /// 3xnn - Skip next instruction if Vx == nn.
    SkipRegEqualImm { x: u4, nn: u8 },
    /// 4xnn - Skip next instruction if Vx != nn.
    SkipRegNotEqualImm { x: u4, nn: u8 },
    /// 5xy0 - Skip next instruction if Vx == Vy.
    SkipRegEqualReg { x: u4, y: u4 },
    /// 9xy0 - Skip next instruction if Vx != Vy.
    SkipRegNotEqualReg { x: u4, y: u4 },

    /// 6xnn - Set Vx = nn.
    SetRegImm { x: u4, nn: u8 },
    /// 7xnn - Set Vx = Vx + nn.
    AddRegImm { x: u4, nn: u8 },
    /// Annn - Set I = nnn.
    SetIndexImm { nnn: u16 },
    /// Fx1E - Set I = I + Vx.
    AddIndexReg { x: u4 },

    /// 8xyN - ALU operations
    ALU { x: u4, y: u4, op: OpcodeALU },
    /// Cxnn - Set Vx = random byte AND nn.
    Random { x: u4, nn: u8 },

    /// 00E0 - Clear the display.
    ClearDisplay,
    /// Dxyn - Display sprite.
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E - Skip next instruction if key with the value of Vx is pressed.
    SkipIfPressed { x: u4 },
    /// ExA1 - Skip next instruction if key with the value of Vx is not pressed.
    SkipIfNotPressed { x: u4 },
    /// Fx0A - Wait for a key press, store the value of the key in Vx.
    WaitForKey { x: u4 },

    /// Fx07 - Set Vx = delay timer value.
    ReadDelayTimer { x: u4 },
    /// Fx15 - Set delay timer = Vx.
    SetDelayTimer { x: u4 },
    /// Fx18 - Set sound timer = Vx.
    SetSoundTimer { x: u4 },

    /// Fx29 - Set I = location of sprite for digit Vx.
    FontChar { x: u4 },
    /// Fx33 - Store BCD representation of Vx in memory locations I, I+1, and I+2.
    BCD { x: u4 },

    /// Fx55 - Store registers V0 through Vx in memory starting at location I.
    StoreRegs { x: u4 },
    /// Fx65 - Read registers V0 through Vx from memory starting at location I.
    LoadRegs { x: u4 },

    /// Any word that matches no instruction (including 0nnn machine calls
    /// and 8xyN with an unassigned N).
    Unknown(u16),
}

/// ALU operations for the 8xyN instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeALU {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx = Vx OR Vy
    Or,
    /// 8xy2 - Vx = Vx AND Vy
    And,
    /// 8xy3 - Vx = Vx XOR Vy
    Xor,
    /// 8xy4 - Vx = Vx + Vy, VF = carry
    Add,
    /// 8xy5 - Vx = Vx - Vy, VF = NOT borrow
    Sub,
    /// 8xy6 - Vx = Vx SHR 1
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = NOT borrow
    SubReverse,
    /// 8xyE - Vx = Vx SHL 1
    ShiftLeft,
}

impl OpcodeALU {
    /// Selects the 8xyN operation from its low nibble.
    fn from_nibble(n: u4) -> Option<Self> {
        Some(match n.value() {
            0x0 => OpcodeALU::Set,
            0x1 => OpcodeALU::Or,
            0x2 => OpcodeALU::And,
            0x3 => OpcodeALU::Xor,
            0x4 => OpcodeALU::Add,
            0x5 => OpcodeALU::Sub,
            0x6 => OpcodeALU::ShiftRight,
            0x7 => OpcodeALU::SubReverse,
            0xE => OpcodeALU::ShiftLeft,
            _ => return None,
        })
    }
}

impl Opcode {
    /// Decode a big-endian instruction word.
    ///
    /// Words that match no instruction decode to `Opcode::Unknown`.
    pub fn decode(word: u16) -> Self {
        let [high, low] = word.to_be_bytes();

        let family = high >> 4;
        let x = u4::from_low_bits(high);
        let y = u4::from_low_bits(low >> 4);
        let n = u4::from_low_bits(low);
        let nn = low;
        let nnn = word & 0x0FFF;

        match family {
            0x0 => match word {
                0x00E0 => Opcode::ClearDisplay,
                0x00EE => Opcode::Return,
                _ => Opcode::Unknown(word),
            },
            0x1 => Opcode::Jump { nnn },
            0x2 => Opcode::Call { nnn },
            0x3 => Opcode::SkipRegEqualImm { x, nn },
            0x4 => Opcode::SkipRegNotEqualImm { x, nn },
            0x5 if n.value() == 0 => Opcode::SkipRegEqualReg { x, y },
            0x6 => Opcode::SetRegImm { x, nn },
            0x7 => Opcode::AddRegImm { x, nn },
            0x8 => match OpcodeALU::from_nibble(n) {
                Some(op) => Opcode::ALU { x, y, op },
                None => Opcode::Unknown(word),
            },
            0x9 if n.value() == 0 => Opcode::SkipRegNotEqualReg { x, y },
            0xA => Opcode::SetIndexImm { nnn },
            0xB => Opcode::JumpWithOffset { nnn },
            0xC => Opcode::Random { x, nn },
            0xD => Opcode::Draw { x, y, n },
            0xE => match nn {
                0x9E => Opcode::SkipIfPressed { x },
                0xA1 => Opcode::SkipIfNotPressed { x },
                _ => Opcode::Unknown(word),
            },
            0xF => match nn {
                0x07 => Opcode::ReadDelayTimer { x },
                0x0A => Opcode::WaitForKey { x },
                0x15 => Opcode::SetDelayTimer { x },
                0x18 => Opcode::SetSoundTimer { x },
                0x1E => Opcode::AddIndexReg { x },
                0x29 => Opcode::FontChar { x },
                0x33 => Opcode::BCD { x },
                0x55 => Opcode::StoreRegs { x },
                0x65 => Opcode::LoadRegs { x },
                _ => Opcode::Unknown(word),
            },
            _ => Opcode::Unknown(word),
        }
    }
}

/// Disassembly in the conventional CHIP-8 mnemonic syntax.
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Opcode::Jump { nnn } => write!(f, "JP {nnn:#05X}"),
            Opcode::JumpWithOffset { nnn } => write!(f, "JP V0, {nnn:#05X}"),
            Opcode::Call { nnn } => write!(f, "CALL {nnn:#05X}"),
            Opcode::Return => write!(f, "RET"),
            Opcode::SkipRegEqualImm { x, nn } => write!(f, "SE V{x}, {nn:#04X}"),
            Opcode::SkipRegNotEqualImm { x, nn } => write!(f, "SNE V{x}, {nn:#04X}"),
            Opcode::SkipRegEqualReg { x, y } => write!(f, "SE V{x}, V{y}"),
            Opcode::SkipRegNotEqualReg { x, y } => write!(f, "SNE V{x}, V{y}"),
            Opcode::SetRegImm { x, nn } => write!(f, "LD V{x}, {nn:#04X}"),
            Opcode::AddRegImm { x, nn } => write!(f, "ADD V{x}, {nn:#04X}"),
            Opcode::SetIndexImm { nnn } => write!(f, "LD I, {nnn:#05X}"),
            Opcode::AddIndexReg { x } => write!(f, "ADD I, V{x}"),
            Opcode::ALU { x, y, op } => match op {
                OpcodeALU::Set => write!(f, "LD V{x}, V{y}"),
                OpcodeALU::Or => write!(f, "OR V{x}, V{y}"),
                OpcodeALU::And => write!(f, "AND V{x}, V{y}"),
                OpcodeALU::Xor => write!(f, "XOR V{x}, V{y}"),
                OpcodeALU::Add => write!(f, "ADD V{x}, V{y}"),
                OpcodeALU::Sub => write!(f, "SUB V{x}, V{y}"),
                OpcodeALU::ShiftRight => write!(f, "SHR V{x}"),
                OpcodeALU::SubReverse => write!(f, "SUBN V{x}, V{y}"),
                OpcodeALU::ShiftLeft => write!(f, "SHL V{x}"),
            },
            Opcode::Random { x, nn } => write!(f, "RND V{x}, {nn:#04X}"),
            Opcode::ClearDisplay => write!(f, "CLS"),
            Opcode::Draw { x, y, n } => write!(f, "DRW V{x}, V{y}, {}", n.value()),
            Opcode::SkipIfPressed { x } => write!(f, "SKP V{x}"),
            Opcode::SkipIfNotPressed { x } => write!(f, "SKNP V{x}"),
            Opcode::WaitForKey { x } => write!(f, "LD V{x}, K"),
            Opcode::ReadDelayTimer { x } => write!(f, "LD V{x}, DT"),
            Opcode::SetDelayTimer { x } => write!(f, "LD DT, V{x}"),
            Opcode::SetSoundTimer { x } => write!(f, "LD ST, V{x}"),
            Opcode::FontChar { x } => write!(f, "LD F, V{x}"),
            Opcode::BCD { x } => write!(f, "LD B, V{x}"),
            Opcode::StoreRegs { x } => write!(f, "LD [I], V{x}"),
            Opcode::LoadRegs { x } => write!(f, "LD V{x}, [I]"),
            Opcode::Unknown(word) => write!(f, "DW {word:#06X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operand_fields() {
        assert_eq!(
            Opcode::decode(0xD125),
            Opcode::Draw {
                x: u4::new(1),
                y: u4::new(2),
                n: u4::new(5)
            }
        );
        assert_eq!(Opcode::decode(0x2ABC), Opcode::Call { nnn: 0xABC });
        assert_eq!(
            Opcode::decode(0x7F10),
            Opcode::AddRegImm {
                x: u4::new(0xF),
                nn: 0x10
            }
        );
    }

    #[test]
    fn system_words_only_match_exactly() {
        assert_eq!(Opcode::decode(0x00E0), Opcode::ClearDisplay);
        assert_eq!(Opcode::decode(0x00EE), Opcode::Return);
        assert_eq!(Opcode::decode(0x0000), Opcode::Unknown(0x0000));
        assert_eq!(Opcode::decode(0x01E0), Opcode::Unknown(0x01E0));
        assert_eq!(Opcode::decode(0x0123), Opcode::Unknown(0x0123));
    }

    #[test]
    fn register_compares_need_zero_low_nibble() {
        assert_eq!(Opcode::decode(0x5121), Opcode::Unknown(0x5121));
        assert_eq!(Opcode::decode(0x912F), Opcode::Unknown(0x912F));
    }

    #[test]
    fn unassigned_alu_ops_are_unknown() {
        for n in [0x8u16, 0x9, 0xA, 0xB, 0xC, 0xD, 0xF] {
            let word = 0x8120 | n;
            assert_eq!(Opcode::decode(word), Opcode::Unknown(word));
        }
        assert_eq!(
            Opcode::decode(0x812E),
            Opcode::ALU {
                x: u4::new(1),
                y: u4::new(2),
                op: OpcodeALU::ShiftLeft
            }
        );
    }

    #[test]
    fn key_and_misc_families() {
        assert_eq!(Opcode::decode(0xE39E), Opcode::SkipIfPressed { x: u4::new(3) });
        assert_eq!(Opcode::decode(0xE3A1), Opcode::SkipIfNotPressed { x: u4::new(3) });
        assert_eq!(Opcode::decode(0xE3A2), Opcode::Unknown(0xE3A2));
        assert_eq!(Opcode::decode(0xF50A), Opcode::WaitForKey { x: u4::new(5) });
        assert_eq!(Opcode::decode(0xF529), Opcode::FontChar { x: u4::new(5) });
        assert_eq!(Opcode::decode(0xF599), Opcode::Unknown(0xF599));
    }

    #[test]
    fn every_word_decodes_with_its_own_fields() {
        for word in 0..=u16::MAX {
            match Opcode::decode(word) {
                Opcode::Unknown(raw) => assert_eq!(raw, word),
                Opcode::Jump { nnn } | Opcode::Call { nnn } | Opcode::SetIndexImm { nnn } => {
                    assert_eq!(nnn, word & 0x0FFF)
                }
                Opcode::Draw { x, y, n } => {
                    assert_eq!(u16::from(u8::from(x)), (word >> 8) & 0xF);
                    assert_eq!(u16::from(u8::from(y)), (word >> 4) & 0xF);
                    assert_eq!(u16::from(u8::from(n)), word & 0xF);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn disassembles_to_mnemonics() {
        assert_eq!(Opcode::decode(0x00E0).to_string(), "CLS");
        assert_eq!(Opcode::decode(0x1208).to_string(), "JP 0x208");
        assert_eq!(Opcode::decode(0x6A05).to_string(), "LD VA, 0x05");
        assert_eq!(Opcode::decode(0xD015).to_string(), "DRW V0, V1, 5");
        assert_eq!(Opcode::decode(0x8AB7).to_string(), "SUBN VA, VB");
        assert_eq!(Opcode::decode(0xF355).to_string(), "LD [I], V3");
        assert_eq!(Opcode::decode(0x0123).to_string(), "DW 0x0123");
    }
}
