use super::commands::{
    BreakpointAction, Command, CommandError, CommandResult, KeyState, SetTarget,
};
use crate::emu::{Chip8, Chip8Runner, Framebuffer, MEMORY_SIZE, Opcode};
use std::collections::HashSet;

pub struct Executor {
    runner: Chip8Runner,
    breakpoints: HashSet<u16>,
}

impl Executor {
    pub fn new(runner: Chip8Runner) -> Self {
        Self {
            runner,
            breakpoints: HashSet::new(),
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<CommandResult, CommandError> {
        match command {
            Command::Run { max_cycles } => self.execute_run(max_cycles),
            Command::Step { count } => self.execute_step(count),
            Command::Breakpoint { action } => self.handle_breakpoint(action),
            Command::Set { target, value } => self.handle_set(target, value),
            Command::Key { key, state } => {
                self.runner.set_key(key, state == KeyState::Down);
                Ok(CommandResult::Ok)
            }
            Command::Regs => Ok(CommandResult::ShowRegisters),
            Command::Stack => Ok(CommandResult::ShowStack),
            Command::Screen => Ok(CommandResult::ShowScreen),
            Command::Mem { start, len } => self.handle_mem(start, len),
            Command::Disasm { start, count } => {
                self.handle_disasm(start.unwrap_or(self.get_pc()), count)
            }
            Command::Quit => Ok(CommandResult::Quit),
        }
    }

    pub fn execute_run(&mut self, max_cycles: usize) -> Result<CommandResult, CommandError> {
        let result = self.runner.run_cycles(max_cycles, &self.breakpoints)?;
        Ok(CommandResult::Stopped(result))
    }

    pub fn execute_step(&mut self, count: usize) -> Result<CommandResult, CommandError> {
        for _ in 0..count {
            self.runner.chip8_mut().step()?;
        }
        Ok(CommandResult::Ok)
    }

    pub fn chip8(&self) -> &Chip8 {
        self.runner.chip8_ref()
    }

    pub fn get_display(&self) -> &Framebuffer {
        self.chip8().framebuffer()
    }

    pub fn get_pc(&self) -> u16 {
        self.chip8().pc()
    }

    pub fn get_stack(&self) -> &[u16] {
        self.chip8().stack()
    }

    fn handle_breakpoint(
        &mut self,
        action: BreakpointAction,
    ) -> Result<CommandResult, CommandError> {
        match action {
            BreakpointAction::Set { addr } => {
                self.breakpoints.insert(addr);
            }
            BreakpointAction::Clear { addr } => {
                self.breakpoints.remove(&addr);
            }
            BreakpointAction::ClearAll => {
                self.breakpoints.clear();
            }
            BreakpointAction::List => {
                return Ok(CommandResult::BreakpointList {
                    breakpoints: {
                        let mut bps: Vec<u16> = self.breakpoints.iter().cloned().collect();
                        bps.sort();
                        bps
                    },
                });
            }
        };

        Ok(CommandResult::Ok)
    }

    fn handle_set(&mut self, target: SetTarget, value: u16) -> Result<CommandResult, CommandError> {
        let max = match target {
            SetTarget::V(_) | SetTarget::DelayTimer | SetTarget::SoundTimer => u8::MAX as u16,
            SetTarget::I | SetTarget::Pc => MEMORY_SIZE as u16 - 1,
        };
        if value > max {
            return Err(CommandError::ValueOutOfRange { target, value });
        }

        let chip8 = self.runner.chip8_mut();
        match target {
            SetTarget::V(reg) => chip8.set_register(reg, value as u8),
            SetTarget::I => chip8.set_index(value),
            SetTarget::Pc => chip8.set_pc(value),
            SetTarget::DelayTimer => chip8.set_delay_timer(value as u8),
            SetTarget::SoundTimer => chip8.set_sound_timer(value as u8),
        }

        Ok(CommandResult::Ok)
    }

    /// Dumps up to `len` bytes, truncated at the end of memory.
    fn handle_mem(&self, start: u16, len: u16) -> Result<CommandResult, CommandError> {
        let len = usize::from(len).min(MEMORY_SIZE.saturating_sub(start.into()));
        let range = Chip8::mem_range(start, len.max(1))?;

        Ok(CommandResult::MemDump {
            offset: start,
            data: self.chip8().memory()[range].to_vec(),
        })
    }

    /// Decodes `count` words from `start`, stopping at the end of memory.
    fn handle_disasm(&self, start: u16, count: u16) -> Result<CommandResult, CommandError> {
        // Surface the error when not even one word is readable
        Chip8::mem_range(start, 2)?;

        let memory = self.chip8().memory();
        let instructions = (0..usize::from(count))
            .map_while(|n| {
                let addr = u16::try_from(usize::from(start) + n * 2).ok()?;
                let bytes = &memory[Chip8::mem_range(addr, 2).ok()?];
                let word = u16::from_be_bytes([bytes[0], bytes[1]]);
                Some((addr, word, Opcode::decode(word)))
            })
            .collect();

        Ok(CommandResult::Disasm { instructions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::{Chip8Error, Chip8RunnerResult};
    use crate::u4;

    fn executor(program: &[u16]) -> Executor {
        let rom: Vec<u8> = program.iter().flat_map(|word| word.to_be_bytes()).collect();
        let mut chip8 = Chip8::with_seed(7);
        chip8.load(&rom).unwrap();
        Executor::new(Chip8Runner::new(chip8))
    }

    #[test]
    fn step_executes_requested_cycles() {
        let mut exec = executor(&[0x6001, 0x7001, 0x7001]);
        exec.execute(Command::Step { count: 3 }).unwrap();
        assert_eq!(exec.chip8().registers()[0], 3);
        assert_eq!(exec.get_pc(), 0x206);
    }

    #[test]
    fn run_stops_at_breakpoint() {
        let mut exec = executor(&[0x7001, 0x7001, 0x7001, 0x1200]);
        exec.execute(Command::Breakpoint {
            action: BreakpointAction::Set { addr: 0x206 },
        })
        .unwrap();

        let result = exec.execute(Command::Run { max_cycles: 1000 }).unwrap();
        assert!(matches!(
            result,
            CommandResult::Stopped(Chip8RunnerResult::HitBreakpoint)
        ));
        assert_eq!(exec.get_pc(), 0x206);
        assert_eq!(exec.chip8().registers()[0], 3);
    }

    #[test]
    fn breakpoint_list_is_sorted() {
        let mut exec = executor(&[]);
        for addr in [0x300, 0x200, 0x250] {
            exec.execute(Command::Breakpoint {
                action: BreakpointAction::Set { addr },
            })
            .unwrap();
        }
        exec.execute(Command::Breakpoint {
            action: BreakpointAction::Clear { addr: 0x250 },
        })
        .unwrap();

        match exec
            .execute(Command::Breakpoint {
                action: BreakpointAction::List,
            })
            .unwrap()
        {
            CommandResult::BreakpointList { breakpoints } => {
                assert_eq!(breakpoints, vec![0x200, 0x300])
            }
            _ => panic!("expected breakpoint list"),
        }
    }

    #[test]
    fn set_validates_width() {
        let mut exec = executor(&[]);
        exec.execute(Command::Set {
            target: SetTarget::V(u4::new(2)),
            value: 0xAB,
        })
        .unwrap();
        assert_eq!(exec.chip8().registers()[2], 0xAB);

        let err = exec
            .execute(Command::Set {
                target: SetTarget::V(u4::new(2)),
                value: 0x100,
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::ValueOutOfRange { value: 0x100, .. }));

        exec.execute(Command::Set {
            target: SetTarget::Pc,
            value: 0x300,
        })
        .unwrap();
        assert_eq!(exec.get_pc(), 0x300);
        assert!(
            exec.execute(Command::Set {
                target: SetTarget::I,
                value: 0x1000,
            })
            .is_err()
        );
    }

    #[test]
    fn key_command_drives_latch() {
        let mut exec = executor(&[]);
        exec.execute(Command::Key {
            key: u4::new(0xB),
            state: KeyState::Down,
        })
        .unwrap();
        assert!(exec.chip8().keypad()[0xB]);
        exec.execute(Command::Key {
            key: u4::new(0xB),
            state: KeyState::Up,
        })
        .unwrap();
        assert!(!exec.chip8().keypad()[0xB]);
    }

    #[test]
    fn mem_dump_truncates_at_end_of_memory() {
        let exec = executor(&[0x1234]);
        match exec.handle_mem(0x200, 4).unwrap() {
            CommandResult::MemDump { offset, data } => {
                assert_eq!(offset, 0x200);
                assert_eq!(data, vec![0x12, 0x34, 0, 0]);
            }
            _ => panic!("expected dump"),
        }
        match exec.handle_mem(0xFFC, 64).unwrap() {
            CommandResult::MemDump { data, .. } => assert_eq!(data.len(), 4),
            _ => panic!("expected dump"),
        }
    }

    #[test]
    fn disasm_decodes_from_pc() {
        let mut exec = executor(&[0x00E0, 0x6A05, 0x1200]);
        match exec.execute(Command::Disasm { start: None, count: 3 }).unwrap() {
            CommandResult::Disasm { instructions } => {
                let text: Vec<String> = instructions
                    .iter()
                    .map(|(addr, _, op)| format!("{addr:03X} {op}"))
                    .collect();
                assert_eq!(text, vec!["200 CLS", "202 LD VA, 0x05", "204 JP 0x200"]);
            }
            _ => panic!("expected disassembly"),
        }
    }

    #[test]
    fn disasm_past_memory_is_an_error() {
        let mut exec = executor(&[]);
        let err = exec
            .execute(Command::Disasm {
                start: Some(0xFFF),
                count: 1,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Chip8Error(Chip8Error::MemoryOutOfBounds { .. })
        ));
    }

    #[test]
    fn engine_errors_surface_as_command_errors() {
        let mut exec = executor(&[0x00EE]);
        let err = exec.execute(Command::Step { count: 1 }).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Chip8Error(Chip8Error::StackUnderflow { pc: 0x200 })
        ));
    }
}
