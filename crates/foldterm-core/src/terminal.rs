//! Terminal state machine.
//!
//! [`TerminalState`] owns the scrollback and alternate buffers, the pen, the
//! DEC charset state, feature flags, and the decoding stream. Text goes in
//! through [`TerminalState::write`]; every decoded [`Command`] is applied to
//! the active buffer in input order.
//!
//! Coordinates: the cursor lives in folded rows of the active buffer.
//! Absolute rows, scroll margins, and clears are relative to the *screen*,
//! the last `height` folded rows.

use crate::buffer::{Buffer, ScrollMargin};
use crate::charset::DecState;
use crate::command::{
    ClearKind, Command, Cursor, FeatureUpdate, MouseFormat, MouseMode, MouseUpdate,
    ScrollDirection,
};
use crate::config::TerminalConfig;
use crate::keys;
use crate::stream::AnsiStream;
use crate::style::Style;
use crate::styled::StyledText;

/// Terminal mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Features {
    pub show_cursor: bool,
    pub alternate_screen: bool,
    pub bracketed_paste: bool,
    pub cursor_blink: bool,
    /// Cursor keys send application (`SS3`) sequences.
    pub cursor_keys: bool,
    /// Overwrite when writing inside a line; insert when false.
    pub replace_mode: bool,
    pub auto_wrap: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            show_cursor: true,
            alternate_screen: false,
            bracketed_paste: false,
            cursor_blink: false,
            cursor_keys: false,
            replace_mode: true,
            auto_wrap: true,
        }
    }
}

/// Mouse reporting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MouseState {
    pub mode: MouseMode,
    pub format: MouseFormat,
    pub focus_events: bool,
    pub alternate_scroll: bool,
}

/// A terminal session's complete state.
#[derive(Debug)]
pub struct TerminalState {
    config: TerminalConfig,
    width: usize,
    height: usize,
    pen: Style,
    features: Features,
    current_directory: Option<String>,
    title: Option<String>,
    scrollback: Buffer,
    alternate: Buffer,
    dec: DecState,
    mouse: MouseState,
    updates: u64,
    stream: AnsiStream,
}

impl Default for TerminalState {
    fn default() -> Self {
        Self::new(TerminalConfig::default())
    }
}

impl TerminalState {
    #[must_use]
    pub fn new(config: TerminalConfig) -> Self {
        let fold_width = config.fold_width(config.width);
        let features = Features {
            replace_mode: config.replace_mode,
            auto_wrap: config.auto_wrap,
            ..Features::default()
        };
        Self {
            width: config.width,
            height: config.height,
            pen: Style::null(),
            features,
            current_directory: None,
            title: None,
            scrollback: Buffer::new(fold_width, config.auto_wrap),
            alternate: Buffer::new(fold_width, config.auto_wrap),
            dec: DecState::new(),
            mouse: MouseState::default(),
            updates: 0,
            stream: AnsiStream::with_cache_capacity(config.decode_cache_capacity),
            config,
        }
    }

    /// A terminal of the given size with default settings.
    #[must_use]
    pub fn with_size(width: usize, height: usize) -> Self {
        Self::new(TerminalConfig::default().with_size(width, height))
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    #[must_use]
    pub fn pen(&self) -> &Style {
        &self.pen
    }

    #[must_use]
    pub fn features(&self) -> &Features {
        &self.features
    }

    #[must_use]
    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    #[must_use]
    pub fn dec(&self) -> &DecState {
        &self.dec
    }

    #[must_use]
    pub fn current_directory(&self) -> Option<&str> {
        self.current_directory.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Global generation counter, bumped once per applied command.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Well-formed sequences dropped as unrecognized so far.
    #[must_use]
    pub fn unrecognized(&self) -> u64 {
        self.stream.decoder().unrecognized()
    }

    /// The buffer commands currently apply to.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        if self.features.alternate_screen {
            &self.alternate
        } else {
            &self.scrollback
        }
    }

    fn buffer_mut(&mut self) -> &mut Buffer {
        if self.features.alternate_screen {
            &mut self.alternate
        } else {
            &mut self.scrollback
        }
    }

    #[must_use]
    pub fn scrollback_buffer(&self) -> &Buffer {
        &self.scrollback
    }

    #[must_use]
    pub fn alternate_buffer(&self) -> &Buffer {
        &self.alternate
    }

    /// Byte sequence for a key name under the current cursor-key mode.
    #[must_use]
    pub fn key_sequence(&self, key: &str) -> Option<&'static str> {
        keys::key_sequence(key, self.features.cursor_keys)
    }

    // ── Input ───────────────────────────────────────────────────────

    /// Feed a chunk of decoded text.
    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        for command in self.stream.feed(text) {
            self.apply(command);
        }
    }

    /// Apply one command to the active buffer.
    pub fn apply(&mut self, command: Command) {
        self.updates += 1;
        match command {
            Command::Style(style) => {
                self.stream.decoder_mut().set_pen(style.clone());
                self.pen = style;
            }
            Command::Cursor(cursor) => self.apply_cursor(cursor),
            Command::NewLine => {
                let cursor = Cursor {
                    delta_y: Some(1),
                    // Cooked mode: the line discipline adds the carriage return.
                    absolute_x: (!self.features.alternate_screen).then_some(0),
                    auto_scroll: true,
                    ..Cursor::default()
                };
                self.apply_cursor(cursor);
            }
            Command::Clear(kind) => self.clear(kind),
            Command::ScrollMargin { top, bottom } => {
                let height = self.height;
                let margin = ScrollMargin { top, bottom };
                if margin.is_valid(height) {
                    let buffer = self.buffer_mut();
                    buffer.scroll_margin = margin;
                    let origin = buffer.screen_start(height);
                    buffer.set_cursor(origin, 0);
                } else {
                    tracing::trace!(?top, ?bottom, "ignored empty scroll region");
                }
            }
            Command::Scroll { direction, lines } => self.scroll(direction, lines),
            Command::CharacterSet { designate, invoke } => {
                if let Some((slot, charset)) = designate {
                    self.dec.designate(slot, &charset);
                }
                if let Some(invoke) = invoke {
                    self.dec.invoke(invoke);
                }
            }
            Command::Features(update) => self.update_features(update),
            Command::MouseTracking(update) => self.update_mouse(update),
            Command::WorkingDirectory(path) => self.current_directory = Some(path),
            Command::Title(title) => self.title = Some(title),
        }
        if self.features.alternate_screen {
            self.fit_alternate();
        }
    }

    /// Hold the alternate buffer at `height` rows: rows pushed past the
    /// bottom scroll off the top, missing rows are added blank at the bottom.
    fn fit_alternate(&mut self) {
        let height = self.height;
        // Splitting a line before a wide char can refold its tail into one
        // more row, so drain until the excess is gone. Every pass shrinks
        // the buffer.
        loop {
            let rows = self.alternate.folded_lines().len();
            if rows <= height {
                break;
            }
            self.alternate.drain_rows(rows - height);
        }
        if self.alternate.folded_lines().len() < height {
            let fill = self.pen.fill();
            self.alternate.ensure_row(height - 1, &fill);
        }
    }

    // ── Cursor ──────────────────────────────────────────────────────

    fn apply_cursor(&mut self, cursor: Cursor) {
        let fill = self.pen.fill();
        let (row, _) = self.buffer().cursor();
        self.buffer_mut().ensure_row(row, &fill);

        let delta_y = self.auto_scroll(&cursor);

        let written = if cursor.text.is_some() || cursor.erase {
            self.write_text(&cursor, &fill)
        } else {
            None
        };

        let width = self.buffer().width();
        let buffer = self.buffer_mut();
        let (row, column) = buffer.cursor();
        match written {
            Some((line_no, offset)) => {
                let target = match (cursor.absolute_x, cursor.delta_x) {
                    (Some(x), dx) => x.saturating_add_signed(dx.unwrap_or(0)),
                    (None, Some(dx)) => offset.saturating_add_signed(dx),
                    (None, None) => offset,
                };
                let (row, column) = buffer.locate(line_no, target);
                buffer.set_cursor(row, column);
            }
            None => {
                let mut column = cursor.absolute_x.unwrap_or(column);
                if let Some(dx) = cursor.delta_x {
                    column = column.saturating_add_signed(dx);
                }
                if (cursor.absolute_x.is_some() || cursor.delta_x.is_some()) && width > 0 {
                    column = column.min(width - 1);
                }
                buffer.set_cursor(row, column);
            }
        }

        let height = self.height;
        let alternate = self.features.alternate_screen;
        let buffer = self.buffer_mut();
        let (mut row, column) = buffer.cursor();
        let start = buffer.screen_start(height);
        let last_row = start + height.saturating_sub(1);
        if let Some(y) = cursor.absolute_y {
            row = start + y.min(height.saturating_sub(1));
        }
        if let Some(dy) = delta_y {
            row = row.saturating_add_signed(dy);
            if dy > 0 && (!cursor.auto_scroll || alternate) {
                // Plain motion stops at the bottom of the screen; only line
                // feeds on the main screen grow the buffer.
                row = row.min(last_row);
            }
        }
        buffer.set_cursor(row, column);
    }

    /// Scroll instead of crossing the margin; returns the remaining motion.
    fn auto_scroll(&mut self, cursor: &Cursor) -> Option<isize> {
        let dy = cursor.delta_y?;
        if !cursor.auto_scroll || dy == 0 {
            return Some(dy);
        }
        let height = self.height;
        let alternate = self.features.alternate_screen;
        let buffer = self.buffer();
        let start = buffer.screen_start(height);
        let (top, bottom) = buffer.scroll_margin.resolve(height);
        let (top_row, bottom_row) = (start + top, start + bottom);
        let (row, _) = buffer.cursor();
        let explicit_bottom = buffer.scroll_margin.bottom.is_some();

        let row_i = isize::try_from(row).unwrap_or(isize::MAX);
        let target = row_i.saturating_add(dy);
        if dy < 0 && row >= top_row {
            let top_i = isize::try_from(top_row).unwrap_or(isize::MAX);
            if target < top_i {
                let excess = (top_i - target).unsigned_abs();
                self.scroll(ScrollDirection::Down, excess);
                return Some(top_i - row_i);
            }
        } else if dy > 0 && row <= bottom_row && (alternate || explicit_bottom) {
            let bottom_i = isize::try_from(bottom_row).unwrap_or(isize::MAX);
            if target > bottom_i {
                let excess = (target - bottom_i).unsigned_abs();
                self.scroll(ScrollDirection::Up, excess);
                return Some(bottom_i - row_i);
            }
        }
        Some(dy)
    }

    /// Write or erase text at the cursor. Returns the logical cursor position
    /// the write started from.
    fn write_text(&mut self, cursor: &Cursor, fill: &Style) -> Option<(usize, usize)> {
        let text = match (&cursor.text, cursor.replace_range) {
            (Some(text), None) => self.dec.translate(text),
            (Some(text), Some(_)) => text.clone(),
            (None, _) => String::new(),
        };
        let pen = self.pen.clone();
        let replace_mode = self.features.replace_mode;
        let alternate = self.features.alternate_screen;
        let buffer = self.buffer_mut();
        let (row, column) = buffer.cursor();
        let (line_no, offset) = buffer.logical_position(row, column);
        let record = buffer.line(line_no)?;
        let old_rows = record.folds.len();
        let mut content = record.content.clone();

        let insert = StyledText::styled(&text, &pen);
        if !text.is_empty() && content.len() < offset {
            content.pad_to(offset);
        }
        let updated = if let Some(range) = cursor.replace_range {
            let (start, end) = range.resolve(offset, content.len(), cursor.relative);
            if cursor.erase {
                Some(content.splice(start, end, &StyledText::blank(end - start, fill)))
            } else {
                Some(content.splice(start, end, &insert))
            }
        } else if text.is_empty() {
            None
        } else if offset >= content.len() {
            content.append(&insert);
            Some(content)
        } else if replace_mode {
            Some(content.splice(offset, offset + insert.len(), &insert))
        } else {
            Some(content.splice(offset, offset, &insert))
        };

        if let Some(updated) = updated {
            buffer.update_line(line_no, updated);
        }
        if cursor.fill_rest_of_line {
            buffer.set_fill(line_no, fill.clone());
        }
        if alternate {
            // A fixed grid: wrapping takes over the rows below.
            buffer.keep_rows_below(line_no, old_rows, fill);
        }
        // Folds may have changed under the cursor.
        let (row, column) = buffer.locate(line_no, offset);
        buffer.set_cursor(row, column);
        Some((line_no, offset))
    }

    // ── Clear / scroll ──────────────────────────────────────────────

    fn clear(&mut self, kind: ClearKind) {
        let height = self.height;
        let fill = self.pen.fill();
        let buffer = self.buffer_mut();
        let start = buffer.screen_start(height);
        let (row, column) = buffer.cursor();
        let (line_no, offset) = buffer.cursor_logical();
        match kind {
            ClearKind::Screen => {
                let screen_row = row.saturating_sub(start);
                buffer.clear();
                for _ in 0..height {
                    buffer.add_line(StyledText::new(), fill.clone());
                }
                buffer.set_cursor(screen_row.min(height.saturating_sub(1)), column);
            }
            ClearKind::ToEnd => {
                if let Some(record) = buffer.line(line_no) {
                    let kept = record.content.slice(0, offset);
                    buffer.update_line(line_no, kept);
                    buffer.set_fill(line_no, fill.clone());
                }
                let count = buffer.line_count();
                buffer.blank_lines(line_no + 1..count, &fill);
                let (row, column) = buffer.locate(line_no, offset);
                buffer.set_cursor(row, column);
            }
            ClearKind::ToBeginning => {
                let first = buffer.split_at_row(start);
                let (line_no, offset) = buffer.cursor_logical();
                let replaced = buffer.blank_lines(first..line_no, &fill);
                let line_no = if first < line_no {
                    first + replaced
                } else {
                    line_no
                };
                if let Some(record) = buffer.line(line_no) {
                    let end = (offset + 1).min(record.content.len());
                    let blanked = record
                        .content
                        .splice(0, end, &StyledText::blank(end, &fill));
                    buffer.update_line(line_no, blanked);
                }
                let (row, column) = buffer.locate(line_no, offset);
                buffer.set_cursor(row, column);
            }
            ClearKind::Scrollback => {
                let rows = start.min(buffer.folded_lines().len());
                buffer.drain_rows(rows);
            }
        }
    }

    /// Shift screen rows inside the scroll margin by `lines` in `direction`.
    pub fn scroll(&mut self, direction: ScrollDirection, lines: usize) {
        let height = self.height;
        let fill = self.pen.fill();
        let alternate = self.features.alternate_screen;
        let buffer = self.buffer_mut();
        let start = buffer.screen_start(height);
        let (top, bottom) = buffer.scroll_margin.resolve(height);
        let top_row = start + top;
        let mut bottom_row = start + bottom;
        if !alternate && buffer.scroll_margin.bottom.is_none() {
            // No explicit region on the main screen: do not grow the buffer.
            bottom_row = bottom_row.min(buffer.folded_lines().len().saturating_sub(1));
        }
        if bottom_row < top_row {
            return;
        }
        buffer.scroll_rows(top_row, bottom_row, direction, lines, &fill);
    }

    // ── Modes ───────────────────────────────────────────────────────

    fn update_features(&mut self, update: FeatureUpdate) {
        if let Some(value) = update.show_cursor {
            self.features.show_cursor = value;
        }
        if let Some(value) = update.bracketed_paste {
            self.features.bracketed_paste = value;
        }
        if let Some(value) = update.cursor_blink {
            self.features.cursor_blink = value;
        }
        if let Some(value) = update.cursor_keys {
            self.features.cursor_keys = value;
        }
        if let Some(value) = update.replace_mode {
            self.features.replace_mode = value;
        }
        if let Some(value) = update.auto_wrap
            && value != self.features.auto_wrap
        {
            self.features.auto_wrap = value;
            self.reflow();
        }
        if let Some(value) = update.alternate_screen
            && value != self.features.alternate_screen
        {
            self.switch_screen(value);
        }
    }

    fn switch_screen(&mut self, alternate: bool) {
        let height = self.height;
        if alternate {
            let (row, column) = self.scrollback.cursor();
            let screen_row = row.saturating_sub(self.scrollback.screen_start(height));
            let fill = self.pen.fill();
            self.alternate.clear();
            self.alternate.scroll_margin = ScrollMargin::default();
            for _ in 0..height {
                self.alternate.add_line(StyledText::new(), fill.clone());
            }
            self.alternate
                .set_cursor(screen_row.min(height.saturating_sub(1)), column);
        }
        self.features.alternate_screen = alternate;
        tracing::debug!(alternate, "switched screen buffer");
    }

    fn update_mouse(&mut self, update: MouseUpdate) {
        if let Some(mode) = update.mode {
            self.mouse.mode = mode;
        }
        if let Some(format) = update.format {
            self.mouse.format = format;
        }
        if let Some(value) = update.focus_events {
            self.mouse.focus_events = value;
        }
        if let Some(value) = update.alternate_scroll {
            self.mouse.alternate_scroll = value;
        }
    }

    // ── Geometry ────────────────────────────────────────────────────

    /// Change the terminal size and reflow both buffers.
    pub fn resize(&mut self, width: usize, height: usize) {
        let (old_width, old_height) = (self.width, self.height);
        self.width = width;
        self.height = height;
        self.reflow();
        tracing::debug!(
            old_width,
            old_height,
            width,
            height,
            folded = self.buffer().folded_lines().len(),
            "terminal resized"
        );
    }

    fn reflow(&mut self) {
        let fold_width = self.config.fold_width(self.width);
        let auto_wrap = self.features.auto_wrap;
        self.scrollback.reflow(fold_width, auto_wrap);
        self.alternate.reflow(fold_width, auto_wrap);
    }
}
