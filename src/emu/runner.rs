use super::{Chip8, Chip8Error, Chip8Result};
use crate::u4;
use std::collections::HashSet;

/// Default instruction rate.
pub const CPU_HZ: f32 = 700.0;

/// High-level emulator runner that paces CPU cycles by elapsed wall-clock time.
pub struct Chip8Runner {
    chip8: Chip8,
    cpu_time_step: f32,
    cpu_dt_accumulator: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip8RunnerResult {
    HitBreakpoint,
    Ok,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8) -> Self {
        Self::with_hz(chip8, CPU_HZ)
    }

    /// Creates a runner executing `hz` cycles per second (at least one).
    pub fn with_hz(chip8: Chip8, hz: f32) -> Self {
        Self {
            chip8,
            cpu_time_step: 1.0 / hz.max(1.0),
            cpu_dt_accumulator: 0.0,
        }
    }

    /// Update emulator by delta time.
    ///
    /// Runs as many CPU cycles as needed based on the elapsed time `dt`.
    /// Returns early if a frame has to be rendered before the next CPU cycle.
    pub fn update(&mut self, dt: f32) -> Result<Chip8RunnerResult, Chip8Error> {
        self.update_with_breakpoints(dt, None)
    }

    /// Like `update` but checks for breakpoints after each CPU cycle.
    pub fn update_with_breakpoints(
        &mut self,
        dt: f32,
        breakpoints: Option<&HashSet<u16>>,
    ) -> Result<Chip8RunnerResult, Chip8Error> {
        self.cpu_dt_accumulator += dt;

        while self.cpu_dt_accumulator >= self.cpu_time_step {
            self.cpu_dt_accumulator -= self.cpu_time_step;

            let cpu_result = self.chip8.step()?;

            if let Some(breakpoints) = &breakpoints
                && breakpoints.contains(&self.chip8.pc)
            {
                self.cpu_dt_accumulator = 0.0;
                return Ok(Chip8RunnerResult::HitBreakpoint);
            }

            match cpu_result {
                Chip8Result::WaitForNextFrame => {
                    // If we need to wait for the next frame we stop executing cycles.
                    // We clear the accumulator to avoid "catching up" in the next frame.
                    self.cpu_dt_accumulator = 0.0;
                    break;
                }
                Chip8Result::Continue => {}
            }
        }

        Ok(Chip8RunnerResult::Ok)
    }

    /// Executes up to `count` cycles back to back, ignoring pacing.
    ///
    /// Stops as soon as PC lands on one of `breakpoints`.
    pub fn run_cycles(
        &mut self,
        count: usize,
        breakpoints: &HashSet<u16>,
    ) -> Result<Chip8RunnerResult, Chip8Error> {
        for _ in 0..count {
            self.chip8.step()?;

            if breakpoints.contains(&self.chip8.pc) {
                return Ok(Chip8RunnerResult::HitBreakpoint);
            }
        }

        Ok(Chip8RunnerResult::Ok)
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.chip8.should_beep()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.chip8.set_key(key, pressed)
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }
}
