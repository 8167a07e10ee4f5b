//! Styled text: a string plus style spans.
//!
//! All offsets are **character** indices (not bytes, not cells). Display
//! width is only consulted by [`StyledText::fold_offsets`], which decides
//! where a line wraps.

use unicode_width::UnicodeWidthChar;

use crate::style::Style;

/// A styled run over `start..end` (character indices).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub style: Style,
}

/// Text with non-overlapping, sorted style spans.
///
/// Characters outside every span carry the null style.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct StyledText {
    text: String,
    /// Character count of `text`.
    len: usize,
    spans: Vec<Span>,
}

/// Display width of one character in terminal cells.
///
/// Control characters count as zero cells.
#[inline]
#[must_use]
pub fn char_cells(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Display width of a string in terminal cells.
#[must_use]
pub fn cell_len(text: &str) -> usize {
    text.chars().map(char_cells).sum()
}

impl StyledText {
    /// Empty text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unstyled text.
    #[must_use]
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            len: text.chars().count(),
            spans: Vec::new(),
        }
    }

    /// Text carrying a single style. A null style produces no span.
    #[must_use]
    pub fn styled(text: &str, style: &Style) -> Self {
        let mut out = Self::plain(text);
        if out.len > 0 && !style.is_null() {
            out.spans.push(Span {
                start: 0,
                end: out.len,
                style: style.clone(),
            });
        }
        out
    }

    /// `count` spaces carrying `style`.
    #[must_use]
    pub fn blank(count: usize, style: &Style) -> Self {
        Self::styled(&" ".repeat(count), style)
    }

    /// The plain text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Display width in terminal cells.
    #[must_use]
    pub fn cell_len(&self) -> usize {
        cell_len(&self.text)
    }

    /// The style spans, sorted by start.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// The style of the character at `index`, if it has one.
    #[must_use]
    pub fn style_at(&self, index: usize) -> Option<&Style> {
        self.spans
            .iter()
            .find(|span| span.start <= index && index < span.end)
            .map(|span| &span.style)
    }

    /// Split into `(text, style)` runs covering the whole text in order.
    ///
    /// Unstyled stretches are reported with the null style.
    #[must_use]
    pub fn runs(&self) -> Vec<(String, Style)> {
        let mut out = Vec::new();
        let mut pos = 0;
        for span in &self.spans {
            if span.start > pos {
                out.push((self.char_slice(pos, span.start).to_owned(), Style::null()));
            }
            out.push((
                self.char_slice(span.start, span.end).to_owned(),
                span.style.clone(),
            ));
            pos = span.end;
        }
        if pos < self.len {
            out.push((self.char_slice(pos, self.len).to_owned(), Style::null()));
        }
        out
    }

    /// Copy out the characters `start..end`, clamped to the text.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len);
        let start = start.min(end);
        let spans = self
            .spans
            .iter()
            .filter(|span| span.end > start && span.start < end)
            .map(|span| Span {
                start: span.start.max(start) - start,
                end: span.end.min(end) - start,
                style: span.style.clone(),
            })
            .collect();
        Self {
            text: self.char_slice(start, end).to_owned(),
            len: end - start,
            spans,
        }
    }

    /// Append `other`, merging touching spans with equal styles.
    pub fn append(&mut self, other: &StyledText) {
        let offset = self.len;
        self.text.push_str(&other.text);
        self.len += other.len;
        for span in &other.spans {
            if let Some(last) = self.spans.last_mut()
                && last.end == span.start + offset
                && last.style == span.style
            {
                last.end = span.end + offset;
                continue;
            }
            self.spans.push(Span {
                start: span.start + offset,
                end: span.end + offset,
                style: span.style.clone(),
            });
        }
    }

    /// Concatenate parts in order.
    #[must_use]
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a StyledText>) -> Self {
        let mut out = Self::new();
        for part in parts {
            out.append(part);
        }
        out
    }

    /// Replace characters `start..end` with `insert`.
    ///
    /// Bounds are clamped; `start > end` is treated as an empty range.
    #[must_use]
    pub fn splice(&self, start: usize, end: usize, insert: &StyledText) -> Self {
        let start = start.min(self.len);
        let end = end.clamp(start, self.len);
        Self::concat([
            &self.slice(0, start),
            insert,
            &self.slice(end, self.len),
        ])
    }

    /// Pad with unstyled spaces up to `len` characters.
    pub fn pad_to(&mut self, len: usize) {
        if len > self.len {
            let pad = len - self.len;
            self.text.extend(std::iter::repeat_n(' ', pad));
            self.len = len;
        }
    }

    /// Character offsets at which each fold starts when wrapped at `width`
    /// cells. Always starts with `0`; a width of zero yields a single fold.
    ///
    /// Folds break at every multiple of `width` cells, so a line of `L` cells
    /// takes `max(1, ceil(L / width))` folds. A wide character covering a
    /// break starts the next fold instead of being split, and zero-width
    /// characters stay with the character before them. With `width == 1`
    /// a wide character covers two breaks and the count can fall short.
    #[must_use]
    pub fn fold_offsets(&self, width: usize) -> Vec<usize> {
        let mut offsets = vec![0];
        if width == 0 {
            return offsets;
        }
        let mut next_break = width;
        let mut cells = 0;
        for (index, ch) in self.text.chars().enumerate() {
            let w = char_cells(ch);
            cells += w;
            if w > 0 && cells > next_break {
                if offsets.last().is_some_and(|&last| index > last) {
                    offsets.push(index);
                }
                while next_break < cells {
                    next_break += width;
                }
            }
        }
        offsets
    }

    fn char_slice(&self, start: usize, end: usize) -> &str {
        let from = self.byte_offset(start);
        let to = self.byte_offset(end);
        &self.text[from..to]
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        if char_index >= self.len {
            return self.text.len();
        }
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(byte, _)| byte)
    }
}

impl From<&str> for StyledText {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}
