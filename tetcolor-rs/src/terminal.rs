//! Terminal rendering: the bordered field, the pause frame and the status
//! line, drawn with crossterm.
//!
//! ## Layout
//!
//! ```text
//!         +--------------+      row 0
//!         |    ████      |      rows 1..=height, two columns per cell
//!         |  ██████  ██  |
//!         +--------------+      row height + 1
//!   running  level 0  turn 12   row height + 2
//!   ←→ move  ↑ rotate  ...      row height + 3
//! ```
//!
//! The field is centred horizontally.  Cell values `0..=5` are drawn as
//! coloured blocks, [`EMPTY_CELL`] as blank, and anything else as `??` so
//! an out-of-range value from the script is visible rather than fatal.

use std::io::{self, Write};

use crossterm::{
    cursor, queue,
    style::{Attribute, Color, ContentStyle, Print, ResetColor, SetStyle},
    terminal::{self, ClearType},
};

use crate::game::{Game, EMPTY_CELL};

/// Colours for cell values 0..=5.
const CELL_COLORS: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Blue,
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
];

const CELL: &str = "  ";
const UNKNOWN_CELL: &str = "??";
const KEY_HINT: &str = "arrows/hjkl move  space drop  p pause  enter start/stop  q quit";

// ── Cell styling ──────────────────────────────────────────────────────────────

/// Text and style for one cell value.
pub fn cell_glyph(cell: i8) -> (&'static str, ContentStyle) {
    let mut style = ContentStyle::new();
    match cell {
        EMPTY_CELL => (CELL, style),
        0..=5 => {
            style.background_color = Some(CELL_COLORS[cell as usize]);
            (CELL, style)
        }
        _ => {
            style.attributes.set(Attribute::Reverse);
            (UNKNOWN_CELL, style)
        }
    }
}

/// Text of the status line for the current session, if any.
pub fn status_text(game: Option<&Game>) -> String {
    match game {
        None => String::from("Press Enter to start"),
        Some(g) => format!(
            "{}  level {}  turn {}",
            g.state().name(),
            g.level(),
            g.turn_number()
        ),
    }
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// Wraps an output stream with crossterm commands and tracks terminal
/// geometry.
pub struct Terminal {
    /// Terminal width in columns.
    pub width: u16,
    /// Terminal height in rows.
    pub height: u16,
    out: Box<dyn Write>,
}

impl Terminal {
    /// Create a [`Terminal`] writing to the given writer.
    ///
    /// Queries the current terminal size; falls back to 80×24 if unavailable.
    pub fn new(out: impl Write + 'static) -> Self {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        Self::with_size(out, width, height)
    }

    pub fn with_size(out: impl Write + 'static, width: u16, height: u16) -> Self {
        Self { width, height, out: Box::new(out) }
    }

    /// Enable raw mode and switch to the alternate screen.  Returns a guard
    /// that undoes both on drop.
    pub fn enter_raw_mode() -> io::Result<RawModeGuard> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(RawModeGuard(()))
    }

    /// Update stored dimensions after a `SIGWINCH` / resize event.
    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Column of the left border for a field `field_width` cells wide.
    pub fn field_left(&self, field_width: usize) -> u16 {
        let outer = (field_width * CELL.len() + 2).min(u16::MAX as usize) as u16;
        self.width.saturating_sub(outer) / 2
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    /// Redraw everything for `game` (or the idle screen when `None`).
    ///
    /// `idle_size` gives the frame dimensions to draw without a game.
    pub fn render(&mut self, game: Option<&Game>, idle_size: (usize, usize)) -> io::Result<()> {
        queue!(self.out, terminal::Clear(ClearType::All))?;

        let (w, h) = game.map_or(idle_size, |g| (g.width(), g.height()));
        self.render_frame(w, h)?;
        if let Some(g) = game {
            if !g.is_paused() {
                self.render_field(g)?;
            }
        }

        let status_row = (h + 2).min(u16::MAX as usize) as u16;
        self.render_line(status_row, &status_text(game))?;
        self.render_line(status_row.saturating_add(1), KEY_HINT)?;
        self.flush()
    }

    /// Draw the border around a `w` × `h` field.
    pub fn render_frame(&mut self, w: usize, h: usize) -> io::Result<()> {
        let left = self.field_left(w);
        let horizontal = format!("+{}+", "-".repeat(w * CELL.len()));
        let blank = " ".repeat(w * CELL.len());

        queue!(self.out, cursor::MoveTo(left, 0), Print(&horizontal))?;
        for row in 1..=h {
            queue!(
                self.out,
                cursor::MoveTo(left, row as u16),
                Print("|"),
                Print(&blank),
                Print("|")
            )?;
        }
        queue!(self.out, cursor::MoveTo(left, (h + 1) as u16), Print(&horizontal))
    }

    /// Draw the cells of the field inside the frame.
    pub fn render_field(&mut self, game: &Game) -> io::Result<()> {
        let left = self.field_left(game.width()) + 1;
        for (row, cells) in game.field().chunks(game.width().max(1)).enumerate() {
            queue!(self.out, cursor::MoveTo(left, row as u16 + 1))?;
            for &cell in cells {
                let (text, style) = cell_glyph(cell);
                queue!(self.out, SetStyle(style), Print(text), ResetColor)?;
            }
        }
        Ok(())
    }

    /// Write `text` on `row`, clearing the rest of the line.
    pub fn render_line(&mut self, row: u16, text: &str) -> io::Result<()> {
        let display: String = text.chars().take(self.width as usize).collect();
        queue!(
            self.out,
            cursor::MoveTo(0, row),
            terminal::Clear(ClearType::UntilNewLine),
            Print(display)
        )
    }

    /// Flush the internal output buffer to the terminal.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

// ── RawModeGuard ──────────────────────────────────────────────────────────────

/// RAII guard: leaves the alternate screen and disables raw mode when
/// dropped.
pub struct RawModeGuard(());

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
