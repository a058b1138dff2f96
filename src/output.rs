//! Terminal formatting for search results, suggestions and library listings

use crate::library::LibraryEntry;
use crate::search::{MatchType, SearchResult};
use crate::suggest::Suggestion;
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print search results as `path:page (match type)` lines
pub fn print_search_results(results: &[SearchResult], color: bool) -> io::Result<()> {
    write_search_results(&mut stdout(color), results)
}

pub fn write_search_results<W: WriteColor>(out: &mut W, results: &[SearchResult]) -> io::Result<()> {
    for r in results {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", r.document_path.display())?;
        out.reset()?;
        write!(out, ":")?;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", r.page)?;
        out.reset()?;

        // Normalized hits are the ones worth a second look
        let tint = match r.match_type {
            MatchType::Exact => Color::Cyan,
            MatchType::Normalized => Color::Yellow,
        };
        write!(out, " (")?;
        out.set_color(ColorSpec::new().set_fg(Some(tint)))?;
        write!(out, "{}", r.match_type)?;
        out.reset()?;
        writeln!(out, ")")?;
    }

    Ok(())
}

/// Print suggestions, one per line, with the documents containing them
pub fn print_suggestions(suggestions: &[Suggestion], color: bool) -> io::Result<()> {
    write_suggestions(&mut stdout(color), suggestions)
}

pub fn write_suggestions<W: WriteColor>(out: &mut W, suggestions: &[Suggestion]) -> io::Result<()> {
    for s in suggestions {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", s.text)?;
        out.reset()?;

        let noun = if s.document_count == 1 { "document" } else { "documents" };
        write!(out, "  {} {}", s.document_count, noun)?;

        if !s.documents.is_empty() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(out, "  {}", s.documents.join(", "))?;
            out.reset()?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Print library documents with their sizes
pub fn print_library(entries: &[LibraryEntry], color: bool) -> io::Result<()> {
    let mut out = stdout(color);

    for entry in entries {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", entry.name)?;
        out.reset()?;
        writeln!(out, "  {}", format_size(entry.size))?;
    }

    Ok(())
}

/// Print any record as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(io::Error::other)?;
    writeln!(out)
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
