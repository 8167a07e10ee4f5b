//! Line buffer with line-wrap folding.
//!
//! A [`Buffer`] stores logical (unwrapped) lines as [`LineRecord`]s and keeps
//! a parallel list of [`LineFold`]s: one entry per physical display row. The
//! cursor lives in folded coordinates (`row`, `column` within that row) and is
//! remapped through logical `(line, offset)` whenever folds are recomputed.
//!
//! Invariants:
//! - `folded_lines` is exactly the in-order concatenation of every
//!   `lines[i].folds`.
//! - `line_to_fold[i]` is the number of folds before line `i`.
//! - every line has at least one fold.

use std::ops::Range;

use crate::command::ScrollDirection;
use crate::style::Style;
use crate::styled::StyledText;

/// One physical row: a slice of a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFold {
    /// Logical line this fold belongs to.
    pub line_no: usize,
    /// Index of this fold within its line.
    pub fold_index: usize,
    /// Character offset of the fold start within the line.
    pub char_offset: usize,
    pub content: StyledText,
    /// The line's update counter when this fold was computed.
    pub updates: u64,
}

/// One logical line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineRecord {
    pub content: StyledText,
    /// Style applied past the last character.
    pub fill: Style,
    pub folds: Vec<LineFold>,
    /// Buffer generation of this line's last mutation. Never reused for
    /// different content, so `(updates, row)` works as a render cache key.
    pub updates: u64,
}

impl LineRecord {
    fn blank(fill: &Style, updates: u64) -> Self {
        Self {
            content: StyledText::new(),
            fill: fill.clone(),
            folds: Vec::new(),
            updates,
        }
    }
}

/// Scroll region rows, 0-based and inclusive, relative to the screen.
/// `None` means the screen edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScrollMargin {
    pub top: Option<usize>,
    pub bottom: Option<usize>,
}

impl ScrollMargin {
    /// Resolve against a screen of `height` rows to inclusive `(top, bottom)`.
    #[must_use]
    pub fn resolve(self, height: usize) -> (usize, usize) {
        let last = height.saturating_sub(1);
        let bottom = self.bottom.unwrap_or(last).min(last);
        let top = self.top.unwrap_or(0).min(bottom);
        (top, bottom)
    }

    /// Whether the region spans at least two rows. A reset (both edges
    /// unset) is always valid.
    #[must_use]
    pub fn is_valid(self, height: usize) -> bool {
        if self.top.is_none() && self.bottom.is_none() {
            return true;
        }
        let last = height.saturating_sub(1);
        let bottom = self.bottom.unwrap_or(last).min(last);
        self.top.unwrap_or(0) < bottom
    }
}

/// Scrollback or alternate screen buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    lines: Vec<LineRecord>,
    line_to_fold: Vec<usize>,
    folded_lines: Vec<LineFold>,
    pub scroll_margin: ScrollMargin,
    cursor_line: usize,
    cursor_offset: usize,
    max_line_width: usize,
    updates: u64,
    width: usize,
    auto_wrap: bool,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(0, true)
    }
}

fn fold_line(line_no: usize, record: &LineRecord, width: usize) -> Vec<LineFold> {
    let offsets = record.content.fold_offsets(width);
    let len = record.content.len();
    offsets
        .iter()
        .enumerate()
        .map(|(fold_index, &start)| {
            let end = offsets.get(fold_index + 1).copied().unwrap_or(len);
            LineFold {
                line_no,
                fold_index,
                char_offset: start,
                content: record.content.slice(start, end),
                updates: record.updates,
            }
        })
        .collect()
}

impl Buffer {
    /// An empty buffer folding at `width` cells.
    #[must_use]
    pub fn new(width: usize, auto_wrap: bool) -> Self {
        Self {
            lines: Vec::new(),
            line_to_fold: Vec::new(),
            folded_lines: Vec::new(),
            scroll_margin: ScrollMargin::default(),
            cursor_line: 0,
            cursor_offset: 0,
            max_line_width: 0,
            updates: 0,
            width,
            auto_wrap,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, line_no: usize) -> Option<&LineRecord> {
        self.lines.get(line_no)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn folded_lines(&self) -> &[LineFold] {
        &self.folded_lines
    }

    #[must_use]
    pub fn line_to_fold(&self) -> &[usize] {
        &self.line_to_fold
    }

    /// Widest line seen, in cells.
    #[must_use]
    pub fn max_line_width(&self) -> usize {
        self.max_line_width
    }

    /// Buffer generation: bumped on every mutation.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn auto_wrap(&self) -> bool {
        self.auto_wrap
    }

    /// Width used for folding: zero (no folding) when auto-wrap is off.
    #[must_use]
    pub fn fold_width(&self) -> usize {
        if self.auto_wrap { self.width } else { 0 }
    }

    /// Cursor as `(row, column)` in folded coordinates.
    #[must_use]
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_line, self.cursor_offset)
    }

    pub fn set_cursor(&mut self, row: usize, column: usize) {
        self.cursor_line = row;
        self.cursor_offset = column;
    }

    /// Cursor as logical `(line, char offset)`.
    #[must_use]
    pub fn cursor_logical(&self) -> (usize, usize) {
        self.logical_position(self.cursor_line, self.cursor_offset)
    }

    /// First folded row of a screen `height` rows tall.
    ///
    /// The screen is the last `height` rows, counting rows the cursor has
    /// moved into but that have no line yet.
    #[must_use]
    pub fn screen_start(&self, height: usize) -> usize {
        self.folded_lines
            .len()
            .max(self.cursor_line + 1)
            .saturating_sub(height)
    }

    /// Logical line shown on folded `row`. Rows past the end map to the lines
    /// that would be created to reach them.
    #[must_use]
    pub fn row_line(&self, row: usize) -> usize {
        match self.folded_lines.get(row) {
            Some(fold) => fold.line_no,
            None => self.lines.len() + (row - self.folded_lines.len()),
        }
    }

    /// Map folded `(row, column)` to logical `(line, offset)`.
    #[must_use]
    pub fn logical_position(&self, row: usize, column: usize) -> (usize, usize) {
        match self.folded_lines.get(row) {
            Some(fold) => (fold.line_no, fold.char_offset + column),
            None => (self.row_line(row), column),
        }
    }

    /// Map logical `(line, offset)` to folded `(row, column)`.
    ///
    /// An offset at the exact end of a fold stays on that fold (pending
    /// wrap); only an offset past it moves to the next fold.
    #[must_use]
    pub fn locate(&self, line_no: usize, offset: usize) -> (usize, usize) {
        let Some(record) = self.lines.get(line_no) else {
            let beyond = line_no - self.lines.len();
            return (self.folded_lines.len() + beyond, offset);
        };
        let first = self.line_to_fold[line_no];
        let mut fold = 0;
        while let Some(next) = record.folds.get(fold + 1)
            && offset > next.char_offset
        {
            fold += 1;
        }
        if let Some(next) = record.folds.get(fold + 1)
            && offset == next.char_offset
            && offset > record.folds[fold].char_offset
            && record.folds[fold].content.cell_len() < self.fold_width()
        {
            // The fold ended early to keep a wide char whole; the offset
            // belongs to the next fold.
            fold += 1;
        }
        (first + fold, offset - record.folds[fold].char_offset)
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Bump the buffer generation and return it. New and rewritten records
    /// take this value, so a record's `updates` never repeats across contents.
    fn touch(&mut self) -> u64 {
        self.updates += 1;
        self.updates
    }

    /// Append a logical line.
    pub fn add_line(&mut self, content: StyledText, fill: Style) {
        let generation = self.touch();
        let line_no = self.lines.len();
        self.max_line_width = self.max_line_width.max(content.cell_len());
        let mut record = LineRecord {
            content,
            fill,
            folds: Vec::new(),
            updates: generation,
        };
        record.folds = fold_line(line_no, &record, self.fold_width());
        self.line_to_fold.push(self.folded_lines.len());
        self.folded_lines.extend(record.folds.iter().cloned());
        self.lines.push(record);
    }

    /// Append blank lines until folded `row` exists.
    pub fn ensure_row(&mut self, row: usize, fill: &Style) {
        while self.folded_lines.len() <= row {
            self.add_line(StyledText::new(), fill.clone());
        }
    }

    /// Replace the content of a logical line and refold it.
    ///
    /// Out-of-range line numbers are ignored.
    pub fn update_line(&mut self, line_no: usize, content: StyledText) {
        if line_no >= self.lines.len() {
            return;
        }
        let generation = self.touch();
        self.max_line_width = self.max_line_width.max(content.cell_len());
        let record = &mut self.lines[line_no];
        record.content = content;
        record.updates = generation;
        self.refold_lines(line_no..line_no + 1);
    }

    /// Set the trailing fill style of a logical line.
    pub fn set_fill(&mut self, line_no: usize, fill: Style) {
        if self.lines.get(line_no).is_none_or(|record| record.fill == fill) {
            return;
        }
        let generation = self.touch();
        let record = &mut self.lines[line_no];
        record.fill = fill;
        record.updates = generation;
        self.refold_lines(line_no..line_no + 1);
    }

    /// Recompute folds for `range` in place and patch the folded index.
    fn refold_lines(&mut self, range: Range<usize>) {
        let width = self.fold_width();
        let end = range.end.min(self.lines.len());
        let start = range.start.min(end);
        let fold_start = self
            .line_to_fold
            .get(start)
            .copied()
            .unwrap_or(self.folded_lines.len());
        let fold_end = self
            .line_to_fold
            .get(end)
            .copied()
            .unwrap_or(self.folded_lines.len());

        let mut replacement = Vec::new();
        for line_no in start..end {
            let folds = fold_line(line_no, &self.lines[line_no], width);
            replacement.extend(folds.iter().cloned());
            self.lines[line_no].folds = folds;
        }
        self.folded_lines.splice(fold_start..fold_end, replacement);

        let mut next = fold_start;
        for line_no in start..self.lines.len() {
            self.line_to_fold[line_no] = next;
            next += self.lines[line_no].folds.len();
        }
    }

    /// Refold every line from `start` on after lines were inserted or
    /// removed there. Lines before `start` must be unchanged.
    fn reindex_from(&mut self, start: usize) {
        let width = self.fold_width();
        let start = start.min(self.line_to_fold.len());
        let fold_start = self
            .line_to_fold
            .get(start)
            .copied()
            .unwrap_or(self.folded_lines.len());
        self.folded_lines.truncate(fold_start);
        self.line_to_fold.truncate(start);
        for (line_no, record) in self.lines.iter_mut().enumerate().skip(start) {
            record.folds = fold_line(line_no, record, width);
            self.max_line_width = self.max_line_width.max(record.content.cell_len());
            self.line_to_fold.push(self.folded_lines.len());
            self.folded_lines.extend(record.folds.iter().cloned());
        }
        self.touch();
    }

    /// Recompute every fold at `width`, keeping the cursor's logical position.
    ///
    /// Idempotent: reflowing twice at the same size yields identical folds.
    pub fn reflow(&mut self, width: usize, auto_wrap: bool) {
        let (line, offset) = self.cursor_logical();
        self.width = width;
        self.auto_wrap = auto_wrap;
        self.max_line_width = 0;
        self.line_to_fold.clear();
        self.folded_lines.clear();
        self.reindex_from(0);
        let (row, column) = self.locate(line, offset);
        self.set_cursor(row, column);
    }

    /// Remove every line and reset the cursor and margin.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.line_to_fold.clear();
        self.folded_lines.clear();
        self.cursor_line = 0;
        self.cursor_offset = 0;
        self.max_line_width = 0;
        self.touch();
    }

    /// Make folded `row` the first row of a logical line, splitting the line
    /// that wraps across it. Returns that line's index.
    ///
    /// Rows keep their positions; the cursor is left alone.
    pub fn split_at_row(&mut self, row: usize) -> usize {
        let Some(fold) = self.folded_lines.get(row) else {
            return self.row_line(row);
        };
        let (line_no, offset) = (fold.line_no, fold.char_offset);
        if fold.fold_index == 0 {
            return line_no;
        }
        // The halves differ, so each takes its own generation.
        let head_generation = self.touch();
        let tail_generation = self.touch();
        let record = &mut self.lines[line_no];
        let tail = LineRecord {
            content: record.content.slice(offset, record.content.len()),
            fill: record.fill.clone(),
            folds: Vec::new(),
            updates: tail_generation,
        };
        record.content = record.content.slice(0, offset);
        record.updates = head_generation;
        self.lines.insert(line_no + 1, tail);
        self.reindex_from(line_no);
        line_no + 1
    }

    /// Blank the logical lines in `range`. A line is replaced by one empty
    /// line per row it occupied, so rows below keep their positions.
    ///
    /// Returns the number of lines now standing where `range` was.
    pub fn blank_lines(&mut self, range: Range<usize>, fill: &Style) -> usize {
        let end = range.end.min(self.lines.len());
        let start = range.start.min(end);
        if start == end {
            return 0;
        }
        let generation = self.touch();
        let rows: usize = self.lines[start..end]
            .iter()
            .map(|record| record.folds.len())
            .sum();
        self.lines.splice(
            start..end,
            (0..rows).map(|_| LineRecord::blank(fill, generation)),
        );
        self.reindex_from(start);
        rows
    }

    /// Insert `count` blank lines before logical line `at`.
    fn insert_blank_lines(&mut self, at: usize, count: usize, fill: &Style) {
        if count == 0 {
            return;
        }
        let at = at.min(self.lines.len());
        let generation = self.touch();
        self.lines.splice(
            at..at,
            (0..count).map(|_| LineRecord::blank(fill, generation)),
        );
        self.reindex_from(at);
    }

    /// Remove folded `rows`, splitting lines that cross either edge. Rows
    /// below move up; a cursor inside the range lands on its first row.
    pub fn remove_rows(&mut self, rows: Range<usize>) {
        let end = rows.end.min(self.folded_lines.len());
        let start = rows.start.min(end);
        if start == end {
            return;
        }
        let first = self.split_at_row(start);
        let last = self.split_at_row(end);
        self.lines.drain(first..last);
        self.reindex_from(first);
        let removed = end - start;
        if self.cursor_line >= end {
            self.cursor_line -= removed;
        } else if self.cursor_line >= start {
            self.cursor_line = start;
        }
    }

    /// Remove the first `count` folded rows. The cursor moves up with the
    /// content.
    pub fn drain_rows(&mut self, count: usize) {
        self.remove_rows(0..count);
    }

    /// Shift folded rows `top..=bottom` by `count` rows in `direction`.
    ///
    /// Exactly `count` rows leave the region and as many blank rows enter
    /// at the trailing edge; rows outside the region are untouched and the
    /// cursor keeps its row. Lines wrapping across a region edge are split
    /// there.
    pub fn scroll_rows(
        &mut self,
        top: usize,
        bottom: usize,
        direction: ScrollDirection,
        count: usize,
        fill: &Style,
    ) {
        if top > bottom || count == 0 {
            return;
        }
        self.ensure_row(bottom, fill);
        let count = count.min(bottom + 1 - top);
        let (cut_start, cut_end) = match direction {
            ScrollDirection::Up => (top, top + count),
            ScrollDirection::Down => (bottom + 1 - count, bottom + 1),
        };
        // Splitting never moves rows, so split top-down and read the line
        // numbers afterwards.
        for row in [top, cut_start, cut_end, bottom + 1] {
            self.split_at_row(row);
        }
        let top_line = self.row_line(top);
        let cut_start_line = self.row_line(cut_start);
        let cut_end_line = self.row_line(cut_end);
        let end_line = self.row_line(bottom + 1).min(self.lines.len());

        let generation = self.touch();
        let removed = cut_end_line - cut_start_line;
        self.lines.drain(cut_start_line..cut_end_line);
        let at = match direction {
            ScrollDirection::Up => end_line - removed,
            ScrollDirection::Down => top_line,
        };
        self.lines.splice(
            at..at,
            (0..count).map(|_| LineRecord::blank(fill, generation)),
        );
        self.reindex_from(top_line);
    }

    /// Keep the rows below logical `line_no` in place after its fold count
    /// changed from `old_rows`: a grown line overwrites the rows under it,
    /// a shrunk one leaves blank rows behind.
    pub fn keep_rows_below(&mut self, line_no: usize, old_rows: usize, fill: &Style) {
        let Some(record) = self.lines.get(line_no) else {
            return;
        };
        let new_rows = record.folds.len();
        let next_row = self.line_to_fold[line_no] + new_rows;
        if new_rows > old_rows {
            self.remove_rows(next_row..next_row + (new_rows - old_rows));
        } else if new_rows < old_rows {
            self.insert_blank_lines(line_no + 1, old_rows - new_rows, fill);
            if self.cursor_line >= next_row {
                self.cursor_line += old_rows - new_rows;
            }
        }
    }

    /// Append blank lines until logical `line_no` exists.
    pub fn ensure_line(&mut self, line_no: usize, fill: &Style) {
        while self.lines.len() <= line_no {
            self.add_line(StyledText::new(), fill.clone());
        }
    }

    /// Every logical line's plain text, joined with `\n`.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|record| record.content.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check the fold index invariants. Test support.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.line_to_fold.len() != self.lines.len() {
            return false;
        }
        let mut expected = Vec::with_capacity(self.folded_lines.len());
        for (line_no, record) in self.lines.iter().enumerate() {
            if record.folds.is_empty() || self.line_to_fold[line_no] != expected.len() {
                return false;
            }
            if record.folds.iter().any(|fold| fold.line_no != line_no) {
                return false;
            }
            expected.extend(record.folds.iter());
        }
        expected.len() == self.folded_lines.len()
            && expected.iter().zip(&self.folded_lines).all(|(a, b)| *a == b)
    }
}
