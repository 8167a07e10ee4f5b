//! Selection model and copy extraction over a [`Buffer`].
//!
//! Positions are logical: a line number and a character offset within that
//! unfolded line, so a selection survives reflow unchanged. Use
//! [`TextPos::from_folded`] to convert a display row/column.

use crate::buffer::Buffer;

/// A character position in a buffer's logical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextPos {
    pub line: usize,
    pub offset: usize,
}

impl TextPos {
    #[must_use]
    pub const fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }

    /// Convert a folded `(row, column)` into a logical position.
    #[must_use]
    pub fn from_folded(buffer: &Buffer, row: usize, column: usize) -> Self {
        let (line, offset) = buffer.logical_position(row, column);
        Self { line, offset }
    }
}

/// Inclusive selection.
///
/// Invariant: after normalization, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: TextPos,
    pub end: TextPos,
}

impl Selection {
    #[must_use]
    pub const fn new(start: TextPos, end: TextPos) -> Self {
        Self { start, end }
    }

    /// Normalize start/end ordering.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }

    /// Select a whole logical line.
    #[must_use]
    pub fn line_at(line: usize, buffer: &Buffer) -> Self {
        let line = line.min(buffer.line_count().saturating_sub(1));
        let len = buffer.line(line).map_or(0, |l| l.content.len());
        Self::new(
            TextPos::new(line, 0),
            TextPos::new(line, len.saturating_sub(1)),
        )
    }

    /// Select a "word" at the given position.
    ///
    /// Contiguous run of word characters, or of whitespace if the position
    /// is on whitespace.
    #[must_use]
    pub fn word_at(pos: TextPos, buffer: &Buffer) -> Self {
        let Some(record) = buffer.line(pos.line) else {
            return Self::new(pos, pos);
        };
        let chars: Vec<char> = record.content.text().chars().collect();
        if chars.is_empty() {
            return Self::new(TextPos::new(pos.line, 0), TextPos::new(pos.line, 0));
        }
        let offset = pos.offset.min(chars.len() - 1);
        let target = classify_char(chars[offset]);

        let mut start = offset;
        while start > 0 && classify_char(chars[start - 1]) == target {
            start -= 1;
        }
        let mut end = offset;
        while end + 1 < chars.len() && classify_char(chars[end + 1]) == target {
            end += 1;
        }
        Self::new(TextPos::new(pos.line, start), TextPos::new(pos.line, end))
    }

    /// Extract the selected text. Lines are joined with `\n`; trailing
    /// spaces on each line are dropped.
    #[must_use]
    pub fn extract_text(&self, buffer: &Buffer) -> String {
        let sel = self.normalized();
        let last_line = sel.end.line.min(buffer.line_count().saturating_sub(1));
        let mut out = String::new();
        for line_no in sel.start.line..=last_line {
            let Some(record) = buffer.line(line_no) else {
                break;
            };
            let from = if line_no == sel.start.line {
                sel.start.offset
            } else {
                0
            };
            let to = if line_no == sel.end.line {
                sel.end.offset.saturating_add(1)
            } else {
                record.content.len()
            };
            let mut piece = record.content.slice(from, to).text().to_owned();
            trim_trailing_spaces(&mut piece);
            if line_no > sel.start.line {
                out.push('\n');
            }
            out.push_str(&piece);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Whitespace,
    Other,
}

fn classify_char(ch: char) -> CharClass {
    if ch.is_whitespace() {
        return CharClass::Whitespace;
    }
    if is_word_char(ch) {
        return CharClass::Word;
    }
    CharClass::Other
}

fn is_word_char(ch: char) -> bool {
    // Identifiers plus the punctuation found in paths and URLs.
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/' | '\\' | ':' | '@' | '~')
}

fn trim_trailing_spaces(s: &mut String) {
    while s.ends_with(' ') {
        s.pop();
    }
}
