//! Human-readable and JSON rendering of search results.

use crate::query::results::SearchResult;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print a result set in the default terminal format.
pub fn print_results(result: &SearchResult, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);

    if !result.autocomplete.is_empty() {
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(stdout, "suggestions:")?;
        stdout.reset()?;
        for s in &result.autocomplete {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(stdout, "  {}", s.text)?;
            stdout.reset()?;
            if s.elided {
                write!(stdout, "…")?;
            }
            writeln!(stdout, "  ({} / {} in subtree)", s.instances, s.agg_instances)?;
        }
    }

    for file in &result.files {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        write!(stdout, "{}", file.path)?;
        stdout.reset()?;
        writeln!(stdout, ": {} matches", file.matches)?;

        for line in &file.lines {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(stdout, "  {}", line.line)?;
            stdout.reset()?;
            match &line.text {
                Some(text) => writeln!(stdout, ": {}", text)?,
                None => writeln!(stdout, " (x{})", line.count)?,
            }
        }
    }

    if result.is_empty() {
        writeln!(stdout, "no matches")?;
    }

    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    writeln!(stdout, "({} ms)", result.duration_ms)?;
    stdout.reset()?;
    Ok(())
}

/// Print a result set as pretty JSON.
pub fn print_results_json(result: &SearchResult) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    serde_json::to_writer_pretty(&mut lock, result)?;
    writeln!(lock)?;
    Ok(())
}
