use std::fmt;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// The 64x32 monochrome framebuffer. Only reachable through bounds-checked
/// accessors; coordinates off the grid are reported, never wrapped.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer {
            pixels: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        }
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// pixel state, or None if (x, y) is off the grid
    pub fn get(&self, x: usize, y: usize) -> Option<bool> {
        self.pixels.get(y).and_then(|row| row.get(x)).copied()
    }

    /// set a pixel; returns false (and does nothing) if (x, y) is off the grid
    pub fn set(&mut self, x: usize, y: usize, on: bool) -> bool {
        match self.pixels.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(px) => {
                *px = on;
                true
            }
            None => false,
        }
    }

    /// flip a pixel, returning what it was before; None if off the grid
    pub fn toggle(&mut self, x: usize, y: usize) -> Option<bool> {
        let px = self.pixels.get_mut(y)?.get_mut(x)?;
        let was = *px;
        *px = !was;
        Some(was)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_clear(&self) -> bool {
        self.pixels.iter().flatten().all(|px| !px)
    }

    /// XOR a sprite onto the grid with its top-left corner at (x, y). Each
    /// byte is one row, MSB leftmost. Pixels past the right or bottom edge
    /// are dropped. Returns true if any lit pixel was turned off.
    pub fn blit(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, bits) in sprite.iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }
                if let Some(true) = self.toggle(x + col, y + row) {
                    collision = true;
                }
            }
        }
        collision
    }

    /// (x, y) of every lit pixel, row by row
    pub fn lit_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pixels.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, px)| **px)
                .map(move |(x, _)| (x, y))
        })
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.pixels.iter() {
            let line: String = row.iter().map(|px| if *px { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// draw a completed frame
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error>;
}

// store useful metadata about the terminal canvas
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coords have y growing upward, so flip the row index
    fn points_from_frame(&self, frame: &Framebuffer) -> Vec<(f64, f64)> {
        frame
            .lit_pixels()
            .map(|(x, y)| (x as f64, -1.0 * y as f64))
            .collect()
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        let coords = self.resolution.points_from_frame(frame);
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();
        // for now this assumes a 1:1 ratio between terminal cells and chip8
        // pixels, plus a one-cell border
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );

        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &coords,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; remembers the last frame and
/// how many times it was asked to draw
#[derive(Default)]
pub struct DummyDisplay {
    pub frames_drawn: usize,
    pub last_frame: Option<Framebuffer>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        self.frames_drawn += 1;
        self.last_frame = Some(*frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_points_only_lit_pixels() {
        let r = Resolution(64, 32);
        let mut fb = Framebuffer::new();
        fb.set(3, 2, true);
        fb.set(63, 31, true);
        assert_eq!(r.points_from_frame(&fb), vec![(3.0, -2.0), (63.0, -31.0)]);
    }

    // Framebuffer tests
    #[test]
    fn test_new_framebuffer_clear() {
        let fb = Framebuffer::new();
        assert!(fb.is_clear());
        assert_eq!(fb.lit_pixels().count(), 0);
    }

    #[test]
    fn test_accessors_bounds_checked() {
        let mut fb = Framebuffer::new();
        assert_eq!(fb.get(63, 31), Some(false));
        assert_eq!(fb.get(64, 0), None);
        assert_eq!(fb.get(0, 32), None);
        assert!(!fb.set(64, 31, true));
        assert_eq!(fb.toggle(0, 32), None);
        assert!(fb.is_clear());
    }

    #[test]
    fn test_toggle_returns_previous() {
        let mut fb = Framebuffer::new();
        assert_eq!(fb.toggle(5, 5), Some(false));
        assert_eq!(fb.get(5, 5), Some(true));
        assert_eq!(fb.toggle(5, 5), Some(true));
        assert_eq!(fb.get(5, 5), Some(false));
    }

    #[test]
    fn test_blit_msb_first() {
        let mut fb = Framebuffer::new();
        assert!(!fb.blit(10, 4, &[0b1000_0001, 0b0100_0000]));
        assert_eq!(
            fb.lit_pixels().collect::<Vec<_>>(),
            vec![(10, 4), (17, 4), (11, 5)]
        );
    }

    #[test]
    fn test_blit_drops_offscreen_pixels() {
        let mut fb = Framebuffer::new();
        // 4 px hang off the right, 1 row hangs off the bottom
        fb.blit(60, 31, &[0xff, 0xff]);
        assert_eq!(
            fb.lit_pixels().collect::<Vec<_>>(),
            vec![(60, 31), (61, 31), (62, 31), (63, 31)]
        );
        // nothing wrapped round to the left or top
        assert_eq!(fb.get(0, 31), Some(false));
        assert_eq!(fb.get(60, 0), Some(false));
    }

    #[test]
    fn test_blit_collision() {
        let mut fb = Framebuffer::new();
        assert!(!fb.blit(0, 0, &[0xf0]));
        assert!(!fb.blit(4, 0, &[0xf0]));
        assert!(fb.blit(2, 0, &[0x80]));
        assert_eq!(fb.get(2, 0), Some(false));
    }

    #[test]
    fn test_clear() {
        let mut fb = Framebuffer::new();
        fb.blit(0, 0, &[0xff; 15]);
        assert!(!fb.is_clear());
        fb.clear();
        assert!(fb.is_clear());
    }

    #[test]
    fn test_debug_renders_rows() {
        let mut fb = Framebuffer::new();
        fb.set(1, 0, true);
        let dump = format!("{:?}", fb);
        let first = dump.lines().next().unwrap();
        assert_eq!(&first[..3], ".#.");
        assert_eq!(dump.lines().count(), 32);
    }

    #[test]
    fn test_dummy_display_keeps_last_frame() -> Result<(), io::Error> {
        let mut d = DummyDisplay::new();
        let mut fb = Framebuffer::new();
        fb.set(7, 7, true);
        d.draw(&fb)?;
        assert_eq!(d.frames_drawn, 1);
        assert_eq!(d.last_frame, Some(fb));
        Ok(())
    }
}
