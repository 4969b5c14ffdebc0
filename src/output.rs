//! Output formatting for verified grep hits

use crate::query::GrepHit;
use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

/// Destination for grep hits
pub trait HitPrinter {
    fn print_hit(&mut self, hit: &GrepHit) -> io::Result<()>;

    /// Flush anything buffered once the last hit is printed
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Colored `path:line:column:text`: magenta path, green line number and the
/// match in bold red. Whether escapes are emitted is up to the writer
/// (`StandardStream` with a `ColorChoice`, `Buffer::ansi`, ...).
pub struct ColorPrinter<W: WriteColor> {
    out: W,
}

impl<W: WriteColor> ColorPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: WriteColor> HitPrinter for ColorPrinter<W> {
    fn print_hit(&mut self, hit: &GrepHit) -> io::Result<()> {
        let out = &mut self.out;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", hit.path)?;
        out.reset()?;
        write!(out, ":")?;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", hit.line_number)?;
        out.reset()?;
        write!(out, ":{}:", hit.column)?;

        let (before, matched, after) = hit.split();
        write!(out, "{}", String::from_utf8_lossy(before))?;
        if !matched.is_empty() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "{}", String::from_utf8_lossy(matched))?;
            out.reset()?;
        }
        writeln!(out, "{}", String::from_utf8_lossy(after))
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Uncolored `path:line:column:text` on any writer
pub struct PlainPrinter<W: Write> {
    out: W,
}

impl<W: Write> PlainPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> HitPrinter for PlainPrinter<W> {
    fn print_hit(&mut self, hit: &GrepHit) -> io::Result<()> {
        writeln!(
            self.out,
            "{}:{}:{}:{}",
            hit.path,
            hit.line_number,
            hit.column,
            String::from_utf8_lossy(&hit.line)
        )
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
