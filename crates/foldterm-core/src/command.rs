//! Terminal commands produced by the escape decoder.
//!
//! A [`Command`] is a closed set of semantic operations. The terminal state
//! machine matches on it exhaustively; adding a variant is a compile error
//! everywhere it must be handled.

use crate::charset::Invoke;
use crate::style::Style;

/// A decoded terminal command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the pen style.
    Style(Style),
    /// Cursor motion and/or text write, applied atomically.
    Cursor(Cursor),
    /// Line feed; rewritten by the terminal depending on screen mode.
    NewLine,
    Clear(ClearKind),
    /// Set the scroll margin (0-based screen rows, inclusive).
    ScrollMargin {
        top: Option<usize>,
        bottom: Option<usize>,
    },
    Scroll {
        direction: ScrollDirection,
        lines: usize,
    },
    /// Designate a charset into a slot and/or invoke a shift.
    CharacterSet {
        designate: Option<(usize, String)>,
        invoke: Option<Invoke>,
    },
    Features(FeatureUpdate),
    MouseTracking(MouseUpdate),
    /// The foreground process reported its working directory.
    WorkingDirectory(String),
    /// Window title (OSC 0 / OSC 2).
    Title(String),
}

/// Erase extent for [`Command::Clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearKind {
    /// Cursor to end of screen.
    ToEnd,
    /// Start of screen to cursor.
    ToBeginning,
    /// Whole screen.
    Screen,
    /// Scrollback above the screen.
    Scrollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    /// Content moves up; blank lines enter at the bottom.
    Up,
    /// Content moves down; blank lines enter at the top.
    Down,
}

/// Character range on the cursor line replaced by a [`Cursor`] write.
///
/// `None` bounds mean line start / line end. When the owning cursor is
/// `relative`, bounds are offsets from the cursor column; otherwise they are
/// absolute columns where negative values count back from the line end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReplaceRange {
    pub start: Option<isize>,
    pub end: Option<isize>,
}

impl ReplaceRange {
    #[must_use]
    pub const fn new(start: Option<isize>, end: Option<isize>) -> Self {
        Self { start, end }
    }

    /// Resolve to a clamped `start..end` character range on a line of
    /// `line_len` characters with the cursor at `column`.
    #[must_use]
    pub fn resolve(self, column: usize, line_len: usize, relative: bool) -> (usize, usize) {
        let bound = |value: Option<isize>, default: usize| -> usize {
            match value {
                None => default,
                Some(v) if relative => column.saturating_add_signed(v),
                Some(v) if v < 0 => line_len.saturating_sub(v.unsigned_abs()),
                Some(v) => v.unsigned_abs(),
            }
        };
        let start = bound(self.start, 0).min(line_len);
        let end = bound(self.end, line_len).clamp(start, line_len);
        (start, end)
    }
}

/// Cursor motion plus optional text write.
///
/// Every field defaults to "no change". The terminal applies, in order: line
/// creation, auto-scroll, the text write, horizontal motion, vertical motion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cursor {
    pub delta_x: Option<isize>,
    pub delta_y: Option<isize>,
    pub absolute_x: Option<usize>,
    /// Screen-relative row.
    pub absolute_y: Option<usize>,
    pub text: Option<String>,
    pub replace_range: Option<ReplaceRange>,
    /// `replace_range` bounds are relative to the cursor column.
    pub relative: bool,
    /// Set the line's trailing fill to the pen's background.
    pub fill_rest_of_line: bool,
    /// Scroll instead of moving past the scroll margin.
    pub auto_scroll: bool,
    /// Overwrite `replace_range` with blanks instead of `text`.
    pub erase: bool,
}

impl Cursor {
    /// Write `text` and advance the cursor past it.
    #[must_use]
    pub fn write(text: &str) -> Self {
        let advance = text.chars().count();
        Self {
            text: Some(text.to_owned()),
            delta_x: isize::try_from(advance).ok(),
            ..Self::default()
        }
    }

    /// Relative motion.
    #[must_use]
    pub fn delta(dx: isize, dy: isize) -> Self {
        Self {
            delta_x: (dx != 0).then_some(dx),
            delta_y: (dy != 0).then_some(dy),
            ..Self::default()
        }
    }

    /// Builder: absolute column.
    #[must_use]
    pub fn with_column(mut self, column: usize) -> Self {
        self.absolute_x = Some(column);
        self
    }

    /// Builder: absolute screen row.
    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.absolute_y = Some(row);
        self
    }
}

/// Tri-state feature flag changes; `None` leaves a flag as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureUpdate {
    pub show_cursor: Option<bool>,
    pub alternate_screen: Option<bool>,
    pub bracketed_paste: Option<bool>,
    pub cursor_blink: Option<bool>,
    pub cursor_keys: Option<bool>,
    pub replace_mode: Option<bool>,
    pub auto_wrap: Option<bool>,
}

impl FeatureUpdate {
    /// Whether no flag is touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Mouse reporting granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseMode {
    #[default]
    Off,
    /// Mode 9: press only.
    X10,
    /// Mode 1000: press and release.
    Normal,
    /// Mode 1002: plus motion while a button is held.
    ButtonEvent,
    /// Mode 1003: all motion.
    AnyEvent,
}

/// Mouse report wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseFormat {
    #[default]
    Default,
    /// Mode 1005.
    Utf8,
    /// Mode 1006.
    Sgr,
    /// Mode 1015.
    Urxvt,
}

/// Mouse tracking changes; `None` leaves a field as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MouseUpdate {
    pub mode: Option<MouseMode>,
    pub format: Option<MouseFormat>,
    pub focus_events: Option<bool>,
    pub alternate_scroll: Option<bool>,
}

impl MouseUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
