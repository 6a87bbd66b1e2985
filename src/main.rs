use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use chip8::display::MonoTermDisplay;
use chip8::input::StdinInput;
use chip8::interpreter::{
    Chip8Interpreter, InterpreterConfig, DEFAULT_CPU_HZ, DEFAULT_CYCLES_PER_TIMER_TICK,
};
use chip8::Machine;

/// Run a CHIP-8 program in the terminal. Esc quits.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    #[arg(long, default_value_t = DEFAULT_CPU_HZ, help = "CPU cycles per second, 0 to run flat out")]
    cpu_hz: u32,

    #[arg(long, default_value_t = DEFAULT_CYCLES_PER_TIMER_TICK, help = "CPU cycles per timer tick")]
    timer_ratio: u32,

    #[arg(long, help = "Stop after this many cycles")]
    cycles: Option<u64>,

    #[arg(long, help = "Seed for the random number instruction")]
    seed: Option<u64>,

    // the canvas owns the terminal, so anything chattier than error draws over it
    #[arg(long, default_value_t = LevelFilter::Error, help = "Log level (off, error, warn, info, debug, trace); logs share the terminal with the display")]
    log_level: LevelFilter,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    SimpleLogger::new().with_level(args.log_level).init()?;

    // open the rom before touching the terminal so a bad path reads cleanly
    let mut f = File::open(&args.rom)?;

    let config = InterpreterConfig {
        cpu_hz: args.cpu_hz,
        cycles_per_timer_tick: args.timer_ratio,
    };
    let machine = match args.seed {
        Some(seed) => Machine::with_seed(seed),
        None => Machine::new(),
    };

    let result = {
        let mut display = MonoTermDisplay::new()?;
        let mut input = StdinInput::new()?;
        let mut interpreter = Chip8Interpreter::with_machine(machine, &mut display, &mut input, config);
        interpreter.load_program(&mut f)?;
        interpreter.main_loop(args.cycles)
    };

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..2 {
        println!();
    }
    result?;
    Ok(())
}
