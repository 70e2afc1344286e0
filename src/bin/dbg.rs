use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use chip8_engine::{
    debugger::{Cli, Command, CommandResult, Executor, view},
    emu::{Chip8, Chip8Runner, Chip8RunnerResult},
};

struct App {
    executor: Executor,
    last_command: Option<Command>,
    should_quit: bool,
}

impl App {
    fn new(rom: &[u8], seed: Option<u64>) -> anyhow::Result<Self> {
        let mut chip8 = match seed {
            Some(seed) => Chip8::with_seed(seed),
            None => Chip8::new(),
        };
        chip8
            .load(rom)
            .context("Failed to load ROM into CHIP-8 memory")?;

        Ok(Self {
            executor: Executor::new(Chip8Runner::new(chip8)),
            last_command: None,
            should_quit: false,
        })
    }

    fn run(&mut self, input: impl BufRead, mut out: impl Write) -> anyhow::Result<()> {
        let mut lines = input.lines();

        while !self.should_quit {
            write!(out, "[{:03X}] > ", self.executor.get_pc())?;
            out.flush()?;

            let Some(line) = lines.next() else {
                // EOF
                break;
            };
            let line = line.context("Failed to read command")?;

            let output = self.handle_line(&line);
            if !output.is_empty() {
                writeln!(out, "{}", output)?;
            }
        }

        Ok(())
    }

    /// An empty line repeats the previous command.
    fn handle_line(&mut self, line: &str) -> String {
        let command = if line.trim().is_empty() {
            match self.last_command.clone() {
                Some(command) => command,
                None => return String::new(),
            }
        } else {
            match Cli::try_parse_from(line.split_whitespace()) {
                Ok(cli) => cli.command,
                Err(e) => {
                    self.last_command = None;
                    return e.to_string();
                }
            }
        };

        self.last_command = Some(command.clone());
        self.execute_command(command)
    }

    fn execute_command(&mut self, command: Command) -> String {
        match self.executor.execute(command) {
            Ok(result) => match result {
                CommandResult::Ok => "OK".to_string(),
                CommandResult::Quit => {
                    self.should_quit = true;
                    String::new()
                }
                CommandResult::Stopped(Chip8RunnerResult::HitBreakpoint) => {
                    format!("Hit breakpoint at {:03X}", self.executor.get_pc())
                }
                CommandResult::Stopped(Chip8RunnerResult::Ok) => {
                    format!("Cycle budget spent, stopped at {:03X}", self.executor.get_pc())
                }
                CommandResult::BreakpointList { breakpoints } => {
                    let list: Vec<String> =
                        breakpoints.iter().map(|bp| format!("{:03X}", bp)).collect();
                    format!("Breakpoints: [{}]", list.join(", "))
                }
                CommandResult::MemDump { offset, data } => view::format_mem_dump(offset, &data),
                CommandResult::Disasm { instructions } => view::format_disasm(&instructions),
                CommandResult::ShowRegisters => view::format_registers(self.executor.chip8()),
                CommandResult::ShowStack => view::format_stack(self.executor.get_stack()),
                CommandResult::ShowScreen => view::format_screen(self.executor.get_display()),
            },
            Err(e) => e.to_string(),
        }
    }
}

/// Line-oriented CHIP-8 step debugger.
///
/// Reads commands from stdin; type `help` for the command list.
#[derive(Parser)]
struct Args {
    /// Path to the ROM file to load
    rom_path: PathBuf,

    /// Seed for the random number generator used by Cxnn
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();

    let rom = std::fs::read(&args.rom_path)
        .with_context(|| format!("Failed to read ROM file {}", args.rom_path.display()))?;
    let mut app = App::new(&rom, args.seed).context("Failed to initialize application")?;

    app.run(io::stdin().lock(), io::stdout().lock())
}
