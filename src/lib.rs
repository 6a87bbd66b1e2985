//! ## Design
//!
//! * a single CHIP-8 virtual CPU; no Super-CHIP or XO-CHIP extensions
//! * the machine is pure state plus a single-step primitive; it knows nothing
//!   about wallclock time, terminals or keyboards
//! * the host decides cadence: it runs one cycle at a time and says which
//!   cycles land on a timer tick
//! * abstract display so can plug alternatives; starting with TUI in-console
//! * input device, with trait for reading key-presses
//! * every machine error halts the run; nothing is silently skipped
//!
//! Model
//!
//! main
//!  |-- display, input, config
//!  |-- interpreter(display, input, config)
//!  |    `-- machine
//!  |         |-- memory (program at 0x200, font at 0x050)
//!  |         |-- V0-VF, I, PC, call stack, timers
//!  |         |-- framebuffer
//!  |         `-- keypad
//!  `-- main loop
//!       |-- keys = input.poll_keys(); machine.set_keys(keys)
//!       |-- machine.execute_cycle(cycle % ratio == 0)?
//!       |-- if machine.requires_redraw() { display.draw(machine.framebuffer()) }
//!       `-- sleep out the rest of the cycle period
pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;

pub use error::Chip8Error;
pub use machine::Machine;
