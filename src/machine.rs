//! # machine
//!
//! The CHIP-8 virtual CPU: memory, V0-VF, I, PC, the call stack, the
//! framebuffer, the keypad and the two timers, plus the single-step
//! fetch/decode/execute primitive.
//!
//! A cycle either applies the whole of one instruction or fails before
//! changing anything, so a failed cycle leaves the machine exactly as it
//! was. The host owns cadence: it calls `execute_cycle` and tells it
//! whether that cycle lands on a 60Hz timer tick.
use crate::display::{Framebuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::Chip8Error;
use crate::input::Keypad;
use crate::instruction::{Instruction, Reg};
use crate::memory::{Chip8MemoryMap, MemoryMap, CHIP8_MAX_PROGRAM_BYTES, CHIP8_PROGRAM_ADDR};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{self, Read};

/// how many return addresses fit on the call stack
pub const STACK_DEPTH: usize = 16;

/// every instruction is two bytes
const INSTRUCTION_WIDTH: u16 = 2;

const MAX_ADDR: u16 = 0x0fff;

const FLAG: usize = 0xf;

/// Everything a running program can observe or change. Two machines in the
/// same state behave identically (bar CXNN's random numbers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    memory: Chip8MemoryMap,
    v: [u8; 16],
    i: u16,
    pc: u16,
    stack: [u16; STACK_DEPTH],
    sp: usize,
    framebuffer: Framebuffer,
    keypad: Keypad,
    delay_timer: u8,
    sound_timer: u8,
    redraw: bool,
    waiting_for_key: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState {
            memory: Chip8MemoryMap::new(),
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
            stack: [0; STACK_DEPTH],
            sp: 0,
            framebuffer: Framebuffer::new(),
            keypad: Keypad::new(),
            delay_timer: 0,
            sound_timer: 0,
            redraw: false,
            waiting_for_key: false,
        }
    }
}

pub struct Machine {
    state: MachineState,
    rom: Option<Vec<u8>>,
    rng: StdRng,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// a machine whose CXNN sequence is reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Machine {
            state: MachineState::default(),
            rom: None,
            rng,
        }
    }

    /// copy a program image into memory at 0x200, replacing any previous one.
    /// The image is kept so `reset` can reload it.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        self.state.memory.load_program(program)?;
        self.rom = Some(program.to_vec());
        debug!("loaded {} byte program at {:#05x}", program.len(), CHIP8_PROGRAM_ADDR);
        Ok(())
    }

    /// load a program from anything readable, e.g. a ROM file. Reads at
    /// most one byte past the largest program, so an endless reader still
    /// fails with `RomTooLarge`
    pub fn load_program_from(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut program = Vec::new();
        let limit = CHIP8_MAX_PROGRAM_BYTES as u64 + 1;
        let len = reader.by_ref().take(limit).read_to_end(&mut program)?;
        self.load_program(&program)?;
        Ok(len)
    }

    /// put every register, timer, pixel and byte back as it was straight
    /// after the program was loaded
    pub fn reset(&mut self) -> Result<(), Chip8Error> {
        let rom = self.rom.as_ref().ok_or(Chip8Error::NoProgramLoaded)?;
        let mut state = MachineState::default();
        state.memory.load_program(rom)?;
        self.state = state;
        debug!("reset, reloaded {} byte program", rom.len());
        Ok(())
    }

    /// fetch, decode and execute one instruction. If `timer_tick` is set the
    /// delay and sound timers count down once after the instruction.
    pub fn execute_cycle(&mut self, timer_tick: bool) -> Result<(), Chip8Error> {
        self.state.redraw = false;
        self.state.waiting_for_key = false;

        let pc = self.state.pc;
        let opcode = self.state.memory.get_word(pc)?;
        let instruction = Instruction::decode(opcode, pc)?;
        trace!("{:#05x}: {:04x} {:?}", pc, opcode, instruction);

        self.state.pc = self.execute(instruction)?;
        if timer_tick {
            self.tick_timers();
        }
        Ok(())
    }

    /// count both timers down by one, stopping at zero
    pub fn tick_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// apply one instruction, returning the next PC. Anything that can fail
    /// is checked before state is written.
    fn execute(&mut self, instruction: Instruction) -> Result<u16, Chip8Error> {
        use Instruction::*;

        let s = &mut self.state;
        let pc = s.pc;
        let next = pc + INSTRUCTION_WIDTH;
        // anything that falls through to the next instruction must not run
        // off the end of memory
        if !matches!(
            instruction,
            Jump(_) | Call(_) | JumpOffset(_) | Return | WaitKey(_)
        ) {
            check_pc(next)?;
        }
        let skip = |cond: bool| {
            if cond {
                check_pc(next + INSTRUCTION_WIDTH)
            } else {
                Ok(next)
            }
        };

        let new_pc = match instruction {
            // flow control
            ClearScreen => {
                s.framebuffer.clear();
                s.redraw = true;
                next
            }
            Return => {
                if s.sp == 0 {
                    return Err(Chip8Error::StackUnderflow { addr: pc });
                }
                // the call site was saved, so resume one instruction past it
                let target = check_pc(s.stack[s.sp - 1] + INSTRUCTION_WIDTH)?;
                s.sp -= 1;
                target
            }
            Jump(addr) => addr,
            Call(addr) => {
                if s.sp == STACK_DEPTH {
                    return Err(Chip8Error::StackOverflow { addr: pc });
                }
                s.stack[s.sp] = pc;
                s.sp += 1;
                addr
            }
            JumpOffset(addr) => check_pc(addr + s.v[0] as u16)?,
            SkipEqImm(x, nn) => skip(s.v[x] == nn)?,
            SkipNeImm(x, nn) => skip(s.v[x] != nn)?,
            SkipEqReg(x, y) => skip(s.v[x] == s.v[y])?,
            SkipNeReg(x, y) => skip(s.v[x] != s.v[y])?,

            // registers and arithmetic
            LoadImm(x, nn) => {
                s.v[x] = nn;
                next
            }
            AddImm(x, nn) => {
                s.v[x] = s.v[x].wrapping_add(nn);
                next
            }
            Move(x, y) => {
                s.v[x] = s.v[y];
                next
            }
            Or(x, y) => {
                s.v[x] |= s.v[y];
                next
            }
            And(x, y) => {
                s.v[x] &= s.v[y];
                next
            }
            Xor(x, y) => {
                s.v[x] ^= s.v[y];
                next
            }
            AddReg(x, y) => {
                let (sum, carry) = s.v[x].overflowing_add(s.v[y]);
                set_with_flag(&mut s.v, x, sum, carry as u8);
                next
            }
            Sub(x, y) => {
                let (diff, borrow) = s.v[x].overflowing_sub(s.v[y]);
                set_with_flag(&mut s.v, x, diff, !borrow as u8);
                next
            }
            SubNeg(x, y) => {
                let (diff, borrow) = s.v[y].overflowing_sub(s.v[x]);
                set_with_flag(&mut s.v, x, diff, !borrow as u8);
                next
            }
            ShiftRight(x) => {
                let vx = s.v[x];
                set_with_flag(&mut s.v, x, vx >> 1, vx & 0x01);
                next
            }
            ShiftLeft(x) => {
                let vx = s.v[x];
                set_with_flag(&mut s.v, x, vx << 1, vx >> 7);
                next
            }
            Random(x, nn) => {
                s.v[x] = self.rng.gen::<u8>() & nn;
                next
            }

            // memory and index
            LoadIndex(addr) => {
                s.i = addr;
                next
            }
            AddIndex(x) => {
                let sum = s.i.wrapping_add(s.v[x] as u16);
                s.i = sum;
                s.v[FLAG] = (sum > MAX_ADDR) as u8;
                next
            }
            FontChar(x) => {
                s.i = Chip8MemoryMap::font_addr(s.v[x]);
                next
            }
            Bcd(x) => {
                let vx = s.v[x];
                s.memory.write(&[vx / 100, vx / 10 % 10, vx % 10], s.i)?;
                next
            }
            StoreRegs(x) => {
                s.memory.write(&s.v[..=x], s.i)?;
                next
            }
            LoadRegs(x) => {
                let bytes = s.memory.get_ro_slice(s.i, x + 1)?;
                s.v[..=x].copy_from_slice(bytes);
                next
            }

            // display
            Draw(x, y, n) => {
                let sprite = s.memory.get_ro_slice(s.i, n as usize)?;
                // the start point wraps onto the screen, the sprite itself doesn't
                let col = s.v[x] as usize % DISPLAY_WIDTH;
                let row = s.v[y] as usize % DISPLAY_HEIGHT;
                let collision = s.framebuffer.blit(col, row, sprite);
                s.v[FLAG] = collision as u8;
                s.redraw = true;
                next
            }

            // timers and keys
            GetDelay(x) => {
                s.v[x] = s.delay_timer;
                next
            }
            SetDelay(x) => {
                s.delay_timer = s.v[x];
                next
            }
            SetSound(x) => {
                s.sound_timer = s.v[x];
                next
            }
            SkipKeyDown(x) => skip(key_down(&s.keypad, s.v[x])?)?,
            SkipKeyUp(x) => skip(!key_down(&s.keypad, s.v[x])?)?,
            WaitKey(x) => match s.keypad.first_down() {
                Some(key) => {
                    let resume = check_pc(next)?;
                    s.v[x] = key;
                    resume
                }
                None => {
                    // re-run this instruction next cycle until a key is down
                    s.waiting_for_key = true;
                    pc
                }
            },
        };
        Ok(new_pc)
    }

    /// true when the last cycle changed the framebuffer
    pub fn requires_redraw(&self) -> bool {
        self.state.redraw
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.state.framebuffer
    }

    /// keys as the next cycle will see them
    pub fn set_keys(&mut self, keypad: Keypad) {
        self.state.keypad = keypad;
    }

    pub fn keys(&self) -> Keypad {
        self.state.keypad
    }

    /// true when the last cycle was an FX0A with no key down
    pub fn waiting_for_key(&self) -> bool {
        self.state.waiting_for_key
    }

    pub fn pc(&self) -> u16 {
        self.state.pc
    }

    pub fn index(&self) -> u16 {
        self.state.i
    }

    pub fn register(&self, x: Reg) -> u8 {
        self.state.v[x & 0x0f]
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.state.v
    }

    pub fn stack_depth(&self) -> usize {
        self.state.sp
    }

    pub fn delay_timer(&self) -> u8 {
        self.state.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.state.sound_timer
    }

    /// a beeper would sound while this is true
    pub fn is_sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.state.memory
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }
}

/// PC must stay inside 0x000-0xfff
fn check_pc(target: u16) -> Result<u16, Chip8Error> {
    if target > MAX_ADDR {
        return Err(Chip8Error::MemoryOutOfBounds {
            addr: target as usize,
        });
    }
    Ok(target)
}

/// keys only go up to 0xf; a register holding anything bigger is an error
fn key_down(keypad: &Keypad, key: u8) -> Result<bool, Chip8Error> {
    keypad
        .is_down(key)
        .ok_or(Chip8Error::KeyOutOfRange { key })
}

/// write an arithmetic result then its flag; if x is VF the flag wins
fn set_with_flag(v: &mut [u8; 16], x: Reg, value: u8, flag: u8) {
    v[x] = value;
    v[FLAG] = flag;
}
