//! Pen style: SGR attribute flags, colors, and hyperlinks.
//!
//! A [`Style`] is what the terminal applies to newly written text. Styles are
//! cheap to clone (the hyperlink target is shared) and compare by value, so
//! they can key caches and be stored per text span.

use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// SGR text attribute flags.
    ///
    /// Maps directly to the ECMA-48 / VT100 SGR parameter values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SgrFlags: u16 {
        const BOLD             = 1 << 0;
        const DIM              = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const BLINK            = 1 << 4;
        const REVERSE          = 1 << 5;
        const CONCEAL          = 1 << 6;
        const STRIKE           = 1 << 7;
        const DOUBLE_UNDERLINE = 1 << 8;
        const OVERLINE         = 1 << 9;
    }
}

/// Color representation for styled text.
///
/// Supports the standard terminal color model hierarchy:
/// default → 16 named → 256 indexed → 24-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / SGR 49).
    #[default]
    Default,
    /// Named color index (0-15): standard 8 + bright 8.
    Named(u8),
    /// 256-color palette index (0-255).
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

/// RGB values of the 16 named ANSI colors.
const NAMED_RGB: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (128, 0, 0),
    (0, 128, 0),
    (128, 128, 0),
    (0, 0, 128),
    (128, 0, 128),
    (0, 128, 128),
    (192, 192, 192),
    (128, 128, 128),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (0, 0, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

/// Channel levels of the 6×6×6 color cube (palette entries 16-231).
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

impl Color {
    /// Resolve this color to RGB through the xterm 256-color palette.
    ///
    /// Returns `None` for [`Color::Default`], whose value is up to the host.
    #[must_use]
    pub fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Color::Default => None,
            Color::Named(n) => Some(NAMED_RGB[usize::from(n & 0x0F)]),
            Color::Indexed(n) => Some(palette_rgb(n)),
            Color::Rgb(r, g, b) => Some((r, g, b)),
        }
    }
}

/// RGB value of an entry in the xterm 256-color palette.
#[must_use]
pub fn palette_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=15 => NAMED_RGB[usize::from(index)],
        16..=231 => {
            let i = index - 16;
            (
                CUBE_LEVELS[usize::from(i / 36)],
                CUBE_LEVELS[usize::from((i / 6) % 6)],
                CUBE_LEVELS[usize::from(i % 6)],
            )
        }
        232..=255 => {
            let level = 8 + (index - 232) * 10;
            (level, level, level)
        }
    }
}

/// Text style: attribute flags, colors, and an optional OSC 8 hyperlink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub flags: SgrFlags,
    pub fg: Color,
    pub bg: Color,
    /// Hyperlink target set by OSC 8. `None` means no link.
    pub link: Option<Arc<str>>,
}

impl Style {
    /// The null style: no attributes, default colors, no link.
    #[must_use]
    pub fn null() -> Self {
        Self::default()
    }

    /// Whether this is the null style.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.flags.is_empty()
            && self.fg == Color::Default
            && self.bg == Color::Default
            && self.link.is_none()
    }

    /// Reset all attributes to default (SGR 0).
    ///
    /// The hyperlink is cleared as well.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Builder: add attribute flags.
    #[must_use]
    pub fn with_flags(mut self, flags: SgrFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Builder: set the foreground color.
    #[must_use]
    pub fn with_fg(mut self, fg: Color) -> Self {
        self.fg = fg;
        self
    }

    /// Builder: set the background color.
    #[must_use]
    pub fn with_bg(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }

    /// Builder: set or clear the hyperlink target.
    #[must_use]
    pub fn with_link(mut self, link: Option<&str>) -> Self {
        self.link = link.filter(|l| !l.is_empty()).map(Arc::from);
        self
    }

    /// The style used for blank cells erased with this pen.
    ///
    /// Erase operations keep the background color only.
    #[must_use]
    pub fn fill(&self) -> Self {
        Self {
            bg: self.bg,
            ..Self::default()
        }
    }
}
