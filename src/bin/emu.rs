use std::{
    collections::HashSet,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use chip8_engine::{
    debugger::view,
    emu::{CPU_HZ, Chip8, Chip8Runner},
    u4,
};

/// Target time between two runner updates (roughly 60 frames per second).
const FRAME_TIME: Duration = Duration::from_micros(16_667);

/// Headless CHIP-8 emulator.
///
/// Loads a ROM, runs it without a window and prints the final
/// framebuffer and registers.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = CPU_HZ)]
    hz: f32,

    /// Wall-clock seconds to run for
    #[arg(long, default_value_t = 5.0)]
    seconds: f32,

    /// Run exactly this many cycles as fast as possible instead of pacing
    #[arg(long, conflicts_with = "seconds")]
    cycles: Option<usize>,

    /// Seed for the random number generator used by Cxnn
    #[arg(long)]
    seed: Option<u64>,

    /// Keys held down for the whole run, as hex digits (e.g. `--keys 5 a`)
    #[arg(long, num_args = 1..)]
    keys: Vec<u4>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // RUST_LOG, when set, overrides the verbosity flags
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run_paced(runner: &mut Chip8Runner, duration: Duration) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut last_frame_instant = start;
    let mut frames = 0usize;

    while start.elapsed() < duration {
        let now = Instant::now();
        let dt = (now - last_frame_instant).as_secs_f32();
        last_frame_instant = now;

        runner.update(dt).context("Chip8 Execution error")?;

        if runner.chip8_mut().take_redraw() {
            frames += 1;
            log::debug!(
                "Frame {} ready at PC {:#05X}",
                frames,
                runner.chip8_ref().pc()
            );
        }

        if runner.should_beep() {
            log::trace!("Beep (sound timer {})", runner.chip8_ref().sound_timer());
        }

        thread::sleep(FRAME_TIME);
    }

    log::info!(
        "Produced {} frames in {:.2}s",
        frames,
        start.elapsed().as_secs_f32()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let rom = std::fs::read(&args.rom_path)
        .with_context(|| format!("Failed to read ROM file {}", args.rom_path.display()))?;

    let mut chip8 = match args.seed {
        Some(seed) => Chip8::with_seed(seed),
        None => Chip8::new(),
    };
    chip8
        .load(&rom)
        .context("Failed to load ROM into CHIP-8 memory")?;

    for &key in &args.keys {
        chip8.set_key(key, true);
    }

    let mut runner = Chip8Runner::with_hz(chip8, args.hz);

    match args.cycles {
        Some(cycles) => {
            runner
                .run_cycles(cycles, &HashSet::new())
                .context("Chip8 Execution error")?;
        }
        None => run_paced(&mut runner, Duration::from_secs_f32(args.seconds.max(0.0)))?,
    }

    let chip8 = runner.chip8_ref();
    println!("{}", view::format_screen(chip8.framebuffer()));
    println!("{}", view::format_registers(chip8));
    println!("{}", view::format_stack(chip8.stack()));

    Ok(())
}
