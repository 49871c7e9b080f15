//! Located diagnostics built lazily from text fragments and source ranges.
//!
//! A [`Diagnostic`] is a sequence of fragments: plain text interleaved with
//! source locations. Nothing touches the source buffer until [`Diagnostic::render`]
//! is called, which turns each location into a row-marked, ANSI-highlighted
//! code snippet. Multi-line selections are split at their newlines and every
//! line gets its own marker.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::location::{LineIndex, Location};

const BOLD_BLUE: &str = "\x1b[1;34m";
const MAGENTA: &str = "\x1b[1;35m";
const RESET: &str = "\x1b[0m";

/// `error: ` rendered bold red / white.
const ERROR_SIGNIFIER: &str = "\x1b[1;31merror\x1b[37m:\x1b[0m ";

#[derive(Debug, Clone)]
enum Fragment {
    Text(Cow<'static, str>),
    Snippet(Location),
}

/// An error message that can pretty-print source code snippets.
///
/// The message text is under full control of the caller; snippets should be
/// appended directly after a newline so the row markers line up.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    fragments: SmallVec<[Fragment; 4]>,
    /// Character used to underline selected text, if any.
    underline: Option<char>,
}

impl Diagnostic {
    /// Creates a diagnostic starting with the `error: ` signifier.
    #[must_use]
    pub fn error() -> Self {
        Self::bare().text(ERROR_SIGNIFIER)
    }

    /// Creates a diagnostic with no leading signifier.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            fragments: SmallVec::new(),
            underline: None,
        }
    }

    /// Sets the character used to underline snippet selections.
    #[must_use]
    pub fn underlined(mut self, c: char) -> Self {
        self.underline = Some(c);
        self
    }

    /// Appends a text fragment.
    #[must_use]
    pub fn text(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.fragments.push(Fragment::Text(text.into()));
        self
    }

    /// Appends a source snippet fragment. The rendered snippet always ends
    /// with a newline.
    #[must_use]
    pub fn snippet(mut self, loc: Location) -> Self {
        self.fragments.push(Fragment::Snippet(loc));
        self
    }

    /// Concatenation of the plain-text fragments, used by tests and by
    /// callers that need the message without rendering snippets.
    #[must_use]
    pub fn message(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            if let Fragment::Text(text) = fragment {
                out.push_str(text);
            }
        }
        out
    }

    /// Renders the full message against the original source buffer.
    #[must_use]
    pub fn render(&self, source: &str, index: &LineIndex) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => out.push_str(text),
                Fragment::Snippet(loc) => self.render_snippet(&mut out, *loc, source, index),
            }
        }
        out
    }

    fn render_snippet(&self, out: &mut String, loc: Location, source: &str, index: &LineIndex) {
        let Some(line_begin) = index.row_start(loc.row) else {
            // Sentinel or out-of-range location: nothing to show.
            return;
        };
        let select_begin = (line_begin + usize::from(loc.col).saturating_sub(1)).min(source.len());
        let select_end = (select_begin + loc.size as usize).min(source.len());
        let selection = &source[select_begin..select_end];

        let newlines: Vec<usize> = selection
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b'\n').then_some(select_begin + i))
            .collect();

        if newlines.is_empty() {
            let marker = loc.row.to_string();
            self.render_line(out, &marker, source, line_begin, select_begin, select_end);
            return;
        }

        // The selection spans several rows: one marker per row, right-aligned
        // to the widest marker.
        let last_row = usize::from(loc.row) + newlines.len();
        let width = last_row.to_string().len();
        let mut begin = line_begin;
        let mut sel_start = select_begin;
        for (i, &nl) in newlines.iter().enumerate() {
            let marker = format!("{:>width$}", usize::from(loc.row) + i);
            self.render_line(out, &marker, source, begin, sel_start, nl);
            begin = nl + 1;
            sel_start = begin;
        }
        let marker = format!("{last_row:>width$}");
        self.render_line(out, &marker, source, begin, begin, select_end);
    }

    fn render_line(
        &self,
        out: &mut String,
        marker: &str,
        source: &str,
        line_begin: usize,
        select_begin: usize,
        select_end: usize,
    ) {
        let line_end = source[select_end..]
            .find('\n')
            .map_or(source.len(), |i| select_end + i);
        out.push_str(BOLD_BLUE);
        out.push_str(marker);
        out.push_str(" | ");
        out.push_str(RESET);
        out.push_str(&source[line_begin..select_begin]);
        out.push_str(MAGENTA);
        out.push_str(&source[select_begin..select_end]);
        out.push_str(RESET);
        out.push_str(&source[select_end..line_end]);
        out.push('\n');
        if let Some(c) = self.underline {
            for _ in 0..marker.len() + 3 + source[line_begin..select_begin].chars().count() {
                out.push(' ');
            }
            for _ in 0..source[select_begin..select_end].chars().count() {
                out.push(c);
            }
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_skips_snippets() {
        let d = Diagnostic::bare()
            .text("something went wrong\n")
            .snippet(Location::new(1, 1, 3));
        assert_eq!(d.message(), "something went wrong\n");
    }

    #[test]
    fn renders_single_line_selection() {
        let source = "let x = 42;\n";
        let mut index = LineIndex::new();
        index.add(2, 12);
        let d = Diagnostic::bare().snippet(Location::new(1, 9, 2));
        let rendered = d.render(source, &index);
        assert!(rendered.contains("1 | "));
        assert!(rendered.contains("42"));
    }

    #[test]
    fn renders_underline() {
        let source = "free(x)";
        let index = LineIndex::new();
        let d = Diagnostic::bare().underlined('^').snippet(Location::new(1, 6, 1));
        let rendered = d.render(source, &index);
        assert!(rendered.lines().nth(1).is_some_and(|l| l.trim_end().ends_with('^')));
    }
}
