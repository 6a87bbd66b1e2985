/// # interpreter
///
/// The host side of the emulator: owns a `Machine` and drives it against a
/// display and an input device.
///
/// Each step of the main loop runs, in order:
///  1. poll the keypad and hand it to the machine
///  2. run one machine cycle, flagged as a timer tick on every Nth cycle
///  3. if the cycle changed the framebuffer, draw it
///  4. sleep out the rest of the cycle period
///
/// so the machine never runs concurrently with drawing or input. Nothing here
/// is authentic COSMAC timing: instructions run as fast as possible and then
/// sleep to match the configured clock.
use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::Input;
use crate::machine::Machine;
use log::{error, info};
use std::io;
use std::time::{Duration, Instant};

/// CPU cycles per second
pub const DEFAULT_CPU_HZ: u32 = 500;

/// 500Hz / 8 is close enough to the 60Hz timers
pub const DEFAULT_CYCLES_PER_TIMER_TICK: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// 0 means run flat out
    pub cpu_hz: u32,
    pub cycles_per_timer_tick: u32,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            cpu_hz: DEFAULT_CPU_HZ,
            cycles_per_timer_tick: DEFAULT_CYCLES_PER_TIMER_TICK,
        }
    }
}

impl InterpreterConfig {
    fn cycle_period(&self) -> Duration {
        match self.cpu_hz {
            0 => Duration::ZERO,
            hz => Duration::from_secs(1) / hz,
        }
    }

    /// is the `cycle`th cycle (counting from 0) a timer tick
    fn is_timer_tick(&self, cycle: u64) -> bool {
        let ratio = self.cycles_per_timer_tick.max(1) as u64;
        (cycle + 1) % ratio == 0
    }
}

pub struct Chip8Interpreter<'a> {
    machine: Machine,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    config: InterpreterConfig,
    cycles: u64,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut impl Display,
        input: &'a mut impl Input,
        config: InterpreterConfig,
    ) -> Chip8Interpreter<'a> {
        Self::with_machine(Machine::new(), display, input, config)
    }

    /// drive an already-built machine, e.g. one with a fixed random seed
    pub fn with_machine(
        machine: Machine,
        display: &'a mut impl Display,
        input: &'a mut impl Input,
        config: InterpreterConfig,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            machine,
            display,
            input,
            config,
            cycles: 0,
        }
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        self.machine.load_program_from(reader)
    }

    /// start the loaded program again from scratch
    pub fn reset(&mut self) -> Result<(), Chip8Error> {
        self.cycles = 0;
        self.machine.reset()?;
        self.display.draw(self.machine.framebuffer())?;
        Ok(())
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// how many cycles have completed
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// one pass of input, cycle and redraw
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        let keys = self.input.poll_keys()?;
        self.machine.set_keys(keys);

        let tick = self.config.is_timer_tick(self.cycles);
        self.machine.execute_cycle(tick)?;
        self.cycles += 1;

        if self.machine.requires_redraw() {
            self.display.draw(self.machine.framebuffer())?;
        }
        Ok(())
    }

    /// run until the input asks to quit or `max_cycles` more cycles have
    /// run, returning how many cycles this call ran
    pub fn main_loop(&mut self, max_cycles: Option<u64>) -> Result<u64, Chip8Error> {
        let period = self.config.cycle_period();
        info!(
            "running at {}Hz, timers every {} cycles",
            self.config.cpu_hz, self.config.cycles_per_timer_tick
        );
        self.display.draw(self.machine.framebuffer())?;

        let mut ran = 0;
        while max_cycles.map_or(true, |max| ran < max) {
            if self.input.quit_requested() {
                info!("quit requested");
                break;
            }
            let started = Instant::now();
            if let Err(e) = self.step() {
                error!(
                    "halted after {} cycles at {:#05x}: {}",
                    self.cycles,
                    self.machine.pc(),
                    e
                );
                return Err(e);
            }
            ran += 1;
            if let Some(rest) = period.checked_sub(started.elapsed()) {
                spin_sleep::sleep(rest);
            }
        }
        info!("stopped after {} cycles", self.cycles);
        Ok(ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;

    fn flat_out() -> InterpreterConfig {
        InterpreterConfig {
            cpu_hz: 0,
            ..InterpreterConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let c = InterpreterConfig::default();
        assert_eq!(c.cpu_hz, 500);
        assert_eq!(c.cycle_period(), Duration::from_millis(2));
        assert_eq!(flat_out().cycle_period(), Duration::ZERO);
    }

    #[test]
    fn test_timer_tick_every_nth_cycle() {
        let c = InterpreterConfig::default();
        let ticks: Vec<u64> = (0..32).filter(|n| c.is_timer_tick(*n)).collect();
        assert_eq!(ticks, vec![7, 15, 23, 31]);

        let every = InterpreterConfig {
            cycles_per_timer_tick: 0,
            ..c
        };
        assert!((0..4).all(|n| every.is_timer_tick(n)));
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut input, flat_out());
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(i.load_program(&mut prog)?, 2);
        Ok(())
    }

    #[test]
    fn test_main_loop_runs_max_cycles() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        {
            // 200: cls; 202: jump 200
            let mut i = Chip8Interpreter::new(&mut display, &mut input, flat_out());
            i.load_program(&mut &[0x00u8, 0xe0, 0x12, 0x00][..])?;
            assert_eq!(i.main_loop(Some(10))?, 10);
            assert_eq!(i.cycles(), 10);
            assert_eq!(i.machine().pc(), 0x200);
        }
        // one initial frame, then one per cls
        assert_eq!(display.frames_drawn, 6);
        assert_eq!(input.polls(), 10);
        Ok(())
    }

    #[test]
    fn test_main_loop_stops_on_quit() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]).quit_after(3);
        let mut i = Chip8Interpreter::new(&mut display, &mut input, flat_out());
        i.load_program(&mut &[0x12u8, 0x00][..])?;
        assert_eq!(i.main_loop(None)?, 3);
        Ok(())
    }

    #[test]
    fn test_timers_follow_cycle_ratio() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut i = Chip8Interpreter::new(&mut display, &mut input, flat_out());
        // v0 = 3; delay = v0; loop
        i.load_program(&mut &[0x60u8, 0x03, 0xf0, 0x15, 0x12, 0x04][..])?;
        i.main_loop(Some(8))?;
        assert_eq!(i.machine().delay_timer(), 2);
        i.main_loop(Some(16))?;
        assert_eq!(i.machine().delay_timer(), 0);
        Ok(())
    }

    #[test]
    fn test_keys_reach_machine() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[0x4]);
        let mut i = Chip8Interpreter::new(&mut display, &mut input, flat_out());
        // wait for key into v5
        i.load_program(&mut &[0xf5u8, 0x0a][..])?;
        i.step()?;
        assert_eq!(i.machine().register(5), 0x4);
        assert_eq!(i.machine().pc(), 0x202);
        Ok(())
    }

    #[test]
    fn test_machine_error_halts_loop() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut i = Chip8Interpreter::with_machine(
            Machine::with_seed(7),
            &mut display,
            &mut input,
            flat_out(),
        );
        // v1 = 1, then falls into zeroed memory
        i.load_program(&mut &[0x61u8, 0x01][..])?;
        match i.main_loop(Some(100)) {
            Err(Chip8Error::UnknownOpcode { opcode: 0, addr: 0x202 }) => {}
            other => panic!("expected UnknownOpcode, got {:?}", other),
        }
        assert_eq!(i.cycles(), 1);
        Ok(())
    }

    #[test]
    fn test_reset_redraws_and_restarts() -> Result<(), Chip8Error> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        {
            let mut i = Chip8Interpreter::new(&mut display, &mut input, flat_out());
            i.load_program(&mut &[0x6au8, 0x02, 0x12, 0x02][..])?;
            i.main_loop(Some(4))?;
            assert_eq!(i.machine().register(0xa), 2);
            i.reset()?;
            assert_eq!(i.cycles(), 0);
            assert_eq!(i.machine().register(0xa), 0);
            assert_eq!(i.machine().pc(), 0x200);
        }
        assert!(display.last_frame.map_or(false, |f| f.is_clear()));
        Ok(())
    }
}
