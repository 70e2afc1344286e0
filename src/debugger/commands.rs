use clap::{Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;

use crate::emu::{Chip8Error, Chip8RunnerResult, Opcode};
use crate::u4;

/// Default cap on cycles executed by `run`, so a ROM that never reaches a
/// breakpoint still hands control back.
pub const DEFAULT_RUN_CYCLES: usize = 100_000;

#[derive(Parser)]
#[command(multicall = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Run until a breakpoint is hit or the cycle budget is spent
    #[command(visible_alias = "r")]
    Run {
        #[arg(default_value_t = DEFAULT_RUN_CYCLES)]
        max_cycles: usize,
    },

    /// Execute one or more cycles, ignoring breakpoints
    #[command(visible_alias = "s")]
    Step {
        #[arg(default_value_t = 1)]
        count: usize,
    },

    #[command(visible_alias = "b")]
    Breakpoint {
        #[command(subcommand)]
        action: BreakpointAction,
    },

    /// Overwrite a register, the index register, PC or a timer
    Set {
        #[arg(value_parser = parse_set_target)]
        target: SetTarget,
        #[arg(value_parser = maybe_hex::<u16>)]
        value: u16,
    },

    /// Press or release a keypad key
    #[command(visible_alias = "k")]
    Key {
        key: u4,
        #[arg(value_enum)]
        state: KeyState,
    },

    /// Show registers, timers and the last instruction
    Regs,

    /// Show the call stack
    Stack,

    /// Show the framebuffer
    Screen,

    /// Hex dump of memory
    #[command(visible_alias = "m")]
    Mem {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        #[arg(default_value = "64", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    /// Disassemble instructions, starting at PC by default
    #[command(visible_alias = "d")]
    Disasm {
        #[arg(value_parser = maybe_hex::<u16>)]
        start: Option<u16>,
        #[arg(default_value = "16", value_parser = maybe_hex::<u16>)]
        count: u16,
    },

    #[command(visible_alias = "q")]
    Quit,
}

#[derive(Debug)]
pub enum CommandResult {
    Ok,
    Stopped(Chip8RunnerResult),
    BreakpointList { breakpoints: Vec<u16> },
    MemDump { offset: u16, data: Vec<u8> },
    Disasm { instructions: Vec<(u16, u16, Opcode)> },
    ShowRegisters,
    ShowStack,
    ShowScreen,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Error while executing cpu instruction: {0}")]
    Chip8Error(#[from] Chip8Error),
    #[error("Value {value:#X} out of range for {target}")]
    ValueOutOfRange { target: SetTarget, value: u16 },
}

#[derive(Subcommand, Clone, Debug)]
pub enum BreakpointAction {
    #[command(visible_alias = "s")]
    Set {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "c")]
    Clear {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "l")]
    List,

    #[command(visible_alias = "ca")]
    ClearAll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetTarget {
    V(u4),
    I,
    Pc,
    DelayTimer,
    SoundTimer,
}

impl std::fmt::Display for SetTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetTarget::V(reg) => write!(f, "V{reg}"),
            SetTarget::I => write!(f, "I"),
            SetTarget::Pc => write!(f, "PC"),
            SetTarget::DelayTimer => write!(f, "DT"),
            SetTarget::SoundTimer => write!(f, "ST"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyState {
    #[value(alias = "press")]
    Down,
    #[value(alias = "release")]
    Up,
}

fn parse_set_target(s: &str) -> Result<SetTarget, String> {
    let lower = s.to_lowercase();

    match lower.as_str() {
        "index" | "i" => Ok(SetTarget::I),
        "pc" => Ok(SetTarget::Pc),
        "dt" => Ok(SetTarget::DelayTimer),
        "st" => Ok(SetTarget::SoundTimer),

        _ if lower.starts_with('v') => {
            let hex_str = &lower[1..];
            match u8::from_str_radix(hex_str, 16) {
                Ok(val) if val < 16 => Ok(SetTarget::V(u4::new(val))),
                _ => Err(format!("Invalid register: '{}'", s)),
            }
        }

        _ => Err(format!("Unknown set target: '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        Cli::try_parse_from(line.split_whitespace()).map(|cli| cli.command)
    }

    #[test]
    fn parses_aliases_and_hex() {
        assert!(matches!(
            parse("b s 0x2A0").unwrap(),
            Command::Breakpoint {
                action: BreakpointAction::Set { addr: 0x2A0 }
            }
        ));
        assert!(matches!(parse("s").unwrap(), Command::Step { count: 1 }));
        assert!(matches!(parse("step 12").unwrap(), Command::Step { count: 12 }));
        assert!(matches!(
            parse("r").unwrap(),
            Command::Run {
                max_cycles: DEFAULT_RUN_CYCLES
            }
        ));
    }

    #[test]
    fn parses_set_targets() {
        match parse("set vA 0x1F").unwrap() {
            Command::Set { target, value } => {
                assert_eq!(target, SetTarget::V(u4::new(0xA)));
                assert_eq!(value, 0x1F);
            }
            _ => panic!("expected set"),
        }
        assert!(matches!(
            parse("set dt 10").unwrap(),
            Command::Set {
                target: SetTarget::DelayTimer,
                value: 10
            }
        ));
        assert!(parse("set vG 1").is_err());
        assert!(parse("set sp 1").is_err());
    }

    #[test]
    fn parses_keys() {
        match parse("k f down").unwrap() {
            Command::Key { key, state } => {
                assert_eq!(key, u4::new(0xF));
                assert_eq!(state, KeyState::Down);
            }
            _ => panic!("expected key"),
        }
        assert!(matches!(
            parse("key 3 release").unwrap(),
            Command::Key {
                state: KeyState::Up,
                ..
            }
        ));
        assert!(parse("key 10 up").is_err());
    }

    #[test]
    fn mem_and_disasm_defaults() {
        assert!(matches!(
            parse("m").unwrap(),
            Command::Mem {
                start: 0x200,
                len: 64
            }
        ));
        assert!(matches!(
            parse("d").unwrap(),
            Command::Disasm {
                start: None,
                count: 16
            }
        ));
        assert!(matches!(
            parse("d 0x300 4").unwrap(),
            Command::Disasm {
                start: Some(0x300),
                count: 4
            }
        ));
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(parse("frobnicate").is_err());
    }
}
