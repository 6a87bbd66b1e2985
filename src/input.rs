use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::warn;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// the 16 key-down flags of the COSMAC hex keypad, 0x0-0xf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Keypad([bool; 16]);

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// keypad with exactly these keys held down
    pub fn with_keys(keys: &[u8]) -> Self {
        let mut k = Self::new();
        for key in keys {
            k.press(*key);
        }
        k
    }

    /// None if `key` isn't one of 0x0-0xf
    pub fn is_down(&self, key: u8) -> Option<bool> {
        self.0.get(key as usize).copied()
    }

    /// returns false (and does nothing) for keys past 0xf
    pub fn press(&mut self, key: u8) -> bool {
        self.set(key, true)
    }

    pub fn release(&mut self, key: u8) -> bool {
        self.set(key, false)
    }

    fn set(&mut self, key: u8, down: bool) -> bool {
        match self.0.get_mut(key as usize) {
            Some(k) => {
                *k = down;
                true
            }
            None => false,
        }
    }

    /// lowest-numbered key held down, if any
    pub fn first_down(&self) -> Option<u8> {
        self.0.iter().position(|down| *down).map(|key| key as u8)
    }
}

/// left-hand side of qwerty keyboard to COSMAC keypad
///   1 2 3 C      1 2 3 4
///   4 5 6 D  <-  q w e r
///   7 8 9 E      a s d f
///   A 0 B F      z x c v
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals only report presses (and autorepeat), never releases, so a key
/// counts as held for this long after its last press event
const KEY_HOLD: Duration = Duration::from_millis(200);

/// reads keypresses; polled by the interpreter between cycles
pub trait Input {
    /// the keypad as it should be seen by the next cycle
    fn poll_keys(&mut self) -> Result<Keypad, io::Error>;

    /// has the user asked to leave the emulator
    fn quit_requested(&self) -> bool {
        false
    }
}

/// simple implementation of Input, using crossterm key events from the
/// terminal
pub struct StdinInput {
    keymap: HashMap<char, u8>,
    last_pressed: [Option<Instant>; 16],
    quit: bool,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            last_pressed: [None; 16],
            quit: false,
        })
    }

    fn read_events(&mut self) -> Result<(), io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(KeyEvent {
                    code: KeyCode::Esc, ..
                }) => self.quit = true,
                Event::Key(KeyEvent {
                    code: KeyCode::Char('c'),
                    modifiers,
                    ..
                }) if modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
                Event::Key(KeyEvent {
                    code: KeyCode::Char(key),
                    ..
                }) => match self.keymap.get(&key.to_ascii_lowercase()) {
                    Some(mapped_key) => {
                        self.last_pressed[*mapped_key as usize] = Some(Instant::now())
                    }
                    None => warn!("can't map {:?} to a COSMAC key", key),
                },
                // resizes, mouse and other keys mean nothing to a chip-8
                _ => {}
            }
        }
        Ok(())
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll_keys(&mut self) -> Result<Keypad, io::Error> {
        self.read_events()?;
        let now = Instant::now();
        let mut keypad = Keypad::new();
        for (key, pressed) in self.last_pressed.iter().enumerate() {
            if let Some(at) = pressed {
                if now.duration_since(*at) < KEY_HOLD {
                    keypad.press(key as u8);
                }
            }
        }
        Ok(keypad)
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// dummy Input implementation for testing: a fixed keypad, optionally
/// asking to quit after a number of polls
pub struct DummyInput {
    keypad: Keypad,
    polls: usize,
    quit_after: Option<usize>,
}

impl DummyInput {
    pub fn new(keys: &[u8]) -> Self {
        DummyInput {
            keypad: Keypad::with_keys(keys),
            polls: 0,
            quit_after: None,
        }
    }

    pub fn quit_after(mut self, polls: usize) -> Self {
        self.quit_after = Some(polls);
        self
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Input for DummyInput {
    fn poll_keys(&mut self) -> Result<Keypad, io::Error> {
        self.polls += 1;
        Ok(self.keypad)
    }

    fn quit_requested(&self) -> bool {
        matches!(self.quit_after, Some(n) if self.polls >= n)
    }
}
