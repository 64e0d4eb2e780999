//! Terminal display.
//!
//! Each character cell shows two surface pixels stacked vertically: the upper
//! half block glyph takes the top pixel as foreground and the bottom pixel as
//! background.

use std::io::{self, BufWriter, Stdout, Write, stdout};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{self, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    },
};
use easel::{BoxError, Color, Host, Surface, Viewport};

const HALF_BLOCK: char = '\u{2580}';

/// Surface size that fills a terminal of `cols` x `rows` cells.
#[must_use]
pub fn viewport_for(cols: u16, rows: u16) -> Viewport {
    Viewport::new(u32::from(cols), u32::from(rows) * 2)
}

/// Owns the terminal for as long as a guest runs; restored on drop.
pub struct TerminalHost {
    out: BufWriter<Stdout>,
    viewport: Viewport,
    reports_releases: bool,
}

impl TerminalHost {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut out = BufWriter::new(stdout());
        execute!(out, EnterAlternateScreen, Hide)?;

        let reports_releases = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if reports_releases {
            execute!(
                out,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
        }

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            viewport: viewport_for(cols, rows),
            reports_releases,
        })
    }

    /// Whether the terminal sends key release events.
    #[must_use]
    pub const fn reports_releases(&self) -> bool {
        self.reports_releases
    }
}

impl Drop for TerminalHost {
    fn drop(&mut self) {
        if self.reports_releases {
            let _ = execute!(self.out, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(self.out, ResetColor, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

impl Host for TerminalHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn present(&mut self, surface: &Surface) -> Result<(), BoxError> {
        render_half_blocks(&mut self.out, surface)?;
        self.out.flush()?;
        Ok(())
    }
}

const fn term_color(color: Color) -> style::Color {
    style::Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

/// Queue one frame of `surface` onto `out`. Color changes are only emitted
/// when a cell differs from the previous one.
pub fn render_half_blocks(out: &mut impl Write, surface: &Surface) -> io::Result<()> {
    let background = surface.background();
    let mut current: Option<(Color, Color)> = None;

    for row in 0..surface.height().div_ceil(2) {
        let Ok(line) = u16::try_from(row) else {
            break;
        };
        queue!(out, MoveTo(0, line))?;
        for x in 0..surface.width() {
            let top = surface.pixel(x, row * 2).unwrap_or(background);
            let bottom = surface.pixel(x, row * 2 + 1).unwrap_or(background);
            if current != Some((top, bottom)) {
                queue!(
                    out,
                    SetForegroundColor(term_color(top)),
                    SetBackgroundColor(term_color(bottom))
                )?;
                current = Some((top, bottom));
            }
            queue!(out, Print(HALF_BLOCK))?;
        }
    }
    queue!(out, ResetColor)
}
