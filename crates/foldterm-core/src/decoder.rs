//! Escape decoder: tokens → [`Command`]s.
//!
//! Decoding is a pure function of the token text except for SGR and OSC 8,
//! which update the pen style the decoder tracks. Both SGR parsing and
//! generic CSI dispatch are memoized in bounded LRU caches keyed on the raw
//! sequence, since shells repeat the same handful of sequences constantly.
//!
//! Nothing here fails: an unrecognized sequence decodes to no commands, is
//! logged at `debug`, and bumps [`Decoder::unrecognized`].

use std::num::NonZeroUsize;

use lru::LruCache;
use smallvec::{SmallVec, smallvec};

use crate::charset::Invoke;
use crate::command::{
    ClearKind, Command, Cursor, FeatureUpdate, MouseFormat, MouseMode, MouseUpdate, ReplaceRange,
    ScrollDirection,
};
use crate::style::{Color, SgrFlags, Style};
use crate::tokenizer::{ControlCode, EscapeKind, Token};

/// Commands decoded from one token. Almost always zero, one, or two.
pub type Commands = SmallVec<[Command; 2]>;

/// Default capacity of each decode cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// The effect of one SGR sequence on a pen style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SgrUpdate {
    /// Start from the null style (SGR 0 was present).
    pub reset: bool,
    pub set: SgrFlags,
    pub clear: SgrFlags,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

impl SgrUpdate {
    /// Apply to `style`, returning the new pen.
    #[must_use]
    pub fn apply(&self, style: &Style) -> Style {
        let mut out = if self.reset {
            Style::null()
        } else {
            style.clone()
        };
        out.flags = (out.flags | self.set) & !self.clear;
        if let Some(fg) = self.fg {
            out.fg = fg;
        }
        if let Some(bg) = self.bg {
            out.bg = bg;
        }
        out
    }

    fn set_flags(&mut self, flags: SgrFlags) {
        self.set |= flags;
        self.clear &= !flags;
    }

    fn clear_flags(&mut self, flags: SgrFlags) {
        self.clear |= flags;
        self.set &= !flags;
    }
}

/// Parse SGR parameters (the text between `CSI` and `m`).
///
/// Empty parameters mean `0`. Codes that do not parse or are unknown are
/// skipped. A `0` discards everything before it in the same sequence.
#[must_use]
pub fn parse_sgr(params: &str) -> SgrUpdate {
    let mut update = SgrUpdate::default();
    let mut codes = params.split(';').map(|part| {
        if part.is_empty() {
            Some(0)
        } else {
            part.parse::<u32>().ok().map(|v| v.min(u32::from(u16::MAX)))
        }
    });
    while let Some(code) = codes.next() {
        let Some(code) = code else {
            continue;
        };
        match code {
            0 => {
                update = SgrUpdate {
                    reset: true,
                    ..SgrUpdate::default()
                };
            }
            1 => update.set_flags(SgrFlags::BOLD),
            2 => update.set_flags(SgrFlags::DIM),
            3 => update.set_flags(SgrFlags::ITALIC),
            4 => update.set_flags(SgrFlags::UNDERLINE),
            5 | 6 => update.set_flags(SgrFlags::BLINK),
            7 => update.set_flags(SgrFlags::REVERSE),
            8 => update.set_flags(SgrFlags::CONCEAL),
            9 => update.set_flags(SgrFlags::STRIKE),
            21 => update.set_flags(SgrFlags::DOUBLE_UNDERLINE),
            22 => update.clear_flags(SgrFlags::BOLD | SgrFlags::DIM),
            23 => update.clear_flags(SgrFlags::ITALIC),
            24 => update.clear_flags(SgrFlags::UNDERLINE | SgrFlags::DOUBLE_UNDERLINE),
            25 => update.clear_flags(SgrFlags::BLINK),
            27 => update.clear_flags(SgrFlags::REVERSE),
            28 => update.clear_flags(SgrFlags::CONCEAL),
            29 => update.clear_flags(SgrFlags::STRIKE),
            53 => update.set_flags(SgrFlags::OVERLINE),
            55 => update.clear_flags(SgrFlags::OVERLINE),
            30..=37 => update.fg = Some(Color::Named(named(code - 30))),
            39 => update.fg = Some(Color::Default),
            40..=47 => update.bg = Some(Color::Named(named(code - 40))),
            49 => update.bg = Some(Color::Default),
            90..=97 => update.fg = Some(Color::Named(named(code - 90) + 8)),
            100..=107 => update.bg = Some(Color::Named(named(code - 100) + 8)),
            38 | 48 => {
                let color = extended_color(&mut codes);
                if code == 38 {
                    update.fg = color.or(update.fg);
                } else {
                    update.bg = color.or(update.bg);
                }
            }
            // 26, 51, 52, 54 and anything unknown: accepted, no effect.
            _ => {}
        }
    }
    update
}

fn named(offset: u32) -> u8 {
    u8::try_from(offset).unwrap_or(0)
}

fn clamp_u8(value: Option<u32>) -> u8 {
    u8::try_from(value.unwrap_or(0).min(255)).unwrap_or(u8::MAX)
}

/// Consume the `5;N` or `2;r;g;b` tail of an extended color.
fn extended_color(codes: &mut impl Iterator<Item = Option<u32>>) -> Option<Color> {
    match codes.next()?? {
        5 => Some(Color::Indexed(clamp_u8(codes.next()?))),
        2 => {
            let r = clamp_u8(codes.next()?);
            let g = clamp_u8(codes.next()?);
            let b = clamp_u8(codes.next()?);
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

// ── CSI parameter helpers ───────────────────────────────────────────

/// Parse `;`-separated numeric parameters. Empty fields are `None`.
/// Returns `None` if any field is not a number.
fn parse_csi_params(params: &str) -> Option<Vec<Option<u16>>> {
    if params.is_empty() {
        return Some(Vec::new());
    }
    params
        .split(';')
        .map(|part| {
            if part.is_empty() {
                Some(None)
            } else {
                let value = part.parse::<u32>().ok()?;
                Some(Some(u16::try_from(value).unwrap_or(u16::MAX)))
            }
        })
        .collect()
}

fn param(params: &[Option<u16>], index: usize) -> Option<u16> {
    params.get(index).copied().flatten()
}

fn count_or_one(value: Option<u16>) -> usize {
    usize::from(value.unwrap_or(1).max(1))
}

/// 1-based coordinate to 0-based; 0 is treated as 1.
fn coordinate(value: Option<u16>) -> usize {
    count_or_one(value) - 1
}

fn signed(count: usize) -> isize {
    isize::try_from(count).unwrap_or(isize::MAX)
}

// ── Decoder ─────────────────────────────────────────────────────────

/// Token → command decoder with pen tracking and memoization.
#[derive(Debug)]
pub struct Decoder {
    pen: Style,
    sgr_cache: LruCache<String, SgrUpdate>,
    csi_cache: LruCache<String, Option<Commands>>,
    unrecognized: u64,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a decoder whose caches hold `capacity` entries each
    /// (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            pen: Style::null(),
            sgr_cache: LruCache::new(capacity),
            csi_cache: LruCache::new(capacity),
            unrecognized: 0,
        }
    }

    /// The pen style as of the last decoded token.
    #[must_use]
    pub fn pen(&self) -> &Style {
        &self.pen
    }

    /// Overwrite the tracked pen.
    pub fn set_pen(&mut self, pen: Style) {
        self.pen = pen;
    }

    /// Number of well-formed sequences dropped as unrecognized.
    #[must_use]
    pub fn unrecognized(&self) -> u64 {
        self.unrecognized
    }

    /// Decode one token.
    pub fn decode(&mut self, token: &Token) -> Commands {
        match token {
            Token::Content(text) => {
                if text.is_empty() {
                    SmallVec::new()
                } else {
                    smallvec![Command::Cursor(Cursor::write(text))]
                }
            }
            Token::Separator(ch) => decode_separator(*ch),
            Token::Escape(kind, raw) => match kind {
                EscapeKind::Csi => self.decode_csi(raw),
                EscapeKind::Osc => self.decode_osc(raw),
                EscapeKind::CharsetDesignation => self.decode_designation(raw),
                EscapeKind::Control => self.decode_control(raw),
                EscapeKind::Dcs | EscapeKind::LineAttribute | EscapeKind::Space => {
                    self.report(*kind, raw)
                }
            },
        }
    }

    fn report(&mut self, kind: EscapeKind, raw: &str) -> Commands {
        self.unrecognized += 1;
        tracing::debug!(?kind, sequence = ?raw, "unrecognized escape sequence");
        SmallVec::new()
    }

    fn decode_csi(&mut self, raw: &str) -> Commands {
        let body = raw.strip_prefix('[').unwrap_or(raw);
        if let Some(params) = body.strip_suffix('m')
            && params.chars().all(|c| c.is_ascii_digit() || c == ';' || c == ':')
        {
            let update = match self.sgr_cache.get(params) {
                Some(update) => *update,
                None => {
                    let update = parse_sgr(params);
                    self.sgr_cache.put(params.to_owned(), update);
                    update
                }
            };
            self.pen = update.apply(&self.pen);
            return smallvec![Command::Style(self.pen.clone())];
        }

        let decoded = match self.csi_cache.get(body) {
            Some(cached) => cached.clone(),
            None => {
                let decoded = decode_csi(body);
                self.csi_cache.put(body.to_owned(), decoded.clone());
                decoded
            }
        };
        match decoded {
            Some(commands) => commands,
            None => self.report(EscapeKind::Csi, raw),
        }
    }

    fn decode_osc(&mut self, payload: &str) -> Commands {
        let (code, rest) = payload.split_once(';').unwrap_or((payload, ""));
        match code {
            "8" => {
                // 8 ; params ; uri. The URI may itself contain ';'.
                let uri = rest.split_once(';').map_or("", |(_, uri)| uri);
                self.pen = self.pen.clone().with_link(Some(uri));
                smallvec![Command::Style(self.pen.clone())]
            }
            "0" | "2" => smallvec![Command::Title(rest.to_owned())],
            // Icon name only.
            "1" => SmallVec::new(),
            "7" => smallvec![Command::WorkingDirectory(file_url_path(rest).to_owned())],
            "2025" => smallvec![Command::WorkingDirectory(rest.to_owned())],
            _ => self.report(EscapeKind::Osc, payload),
        }
    }

    fn decode_designation(&mut self, raw: &str) -> Commands {
        let mut chars = raw.chars();
        let slot = match chars.next() {
            Some('(') => 0,
            Some(')' | '-') => 1,
            Some('*' | '.') => 2,
            Some('+' | '/') => 3,
            _ => return self.report(EscapeKind::CharsetDesignation, raw),
        };
        smallvec![Command::CharacterSet {
            designate: Some((slot, chars.as_str().to_owned())),
            invoke: None,
        }]
    }

    fn decode_control(&mut self, raw: &str) -> Commands {
        let Some(code) = raw.chars().next().and_then(ControlCode::from_char) else {
            return self.report(EscapeKind::Control, raw);
        };
        let invoke = |invoke| smallvec![Command::CharacterSet { designate: None, invoke: Some(invoke) }];
        match code {
            ControlCode::Ind => smallvec![Command::Cursor(Cursor {
                delta_y: Some(1),
                auto_scroll: true,
                ..Cursor::default()
            })],
            ControlCode::Ri => smallvec![Command::Cursor(Cursor {
                delta_y: Some(-1),
                auto_scroll: true,
                ..Cursor::default()
            })],
            ControlCode::Nel => smallvec![Command::Cursor(Cursor {
                delta_y: Some(1),
                absolute_x: Some(0),
                auto_scroll: true,
                ..Cursor::default()
            })],
            ControlCode::Ls2 => invoke(Invoke::LockGl(2)),
            ControlCode::Ls3 => invoke(Invoke::LockGl(3)),
            ControlCode::Ls1r => invoke(Invoke::LockGr(1)),
            ControlCode::Ls2r => invoke(Invoke::LockGr(2)),
            ControlCode::Ls3r => invoke(Invoke::LockGr(3)),
            ControlCode::Ss2 => invoke(Invoke::SingleShift(2)),
            ControlCode::Ss3 => invoke(Invoke::SingleShift(3)),
            ControlCode::Hts
            | ControlCode::Spa
            | ControlCode::Epa
            | ControlCode::Sos
            | ControlCode::Decid
            | ControlCode::St
            | ControlCode::Pm
            | ControlCode::Apc
            | ControlCode::Ris
            | ControlCode::Decsc
            | ControlCode::Decrc
            | ControlCode::Deckpam
            | ControlCode::Deckpnm => {
                tracing::trace!(?code, "inert control code");
                SmallVec::new()
            }
        }
    }
}

fn decode_separator(ch: char) -> Commands {
    match ch {
        '\n' => smallvec![Command::NewLine],
        '\r' => smallvec![Command::Cursor(Cursor::default().with_column(0))],
        '\x08' => smallvec![Command::Cursor(Cursor::delta(-1, 0))],
        '\x0e' => smallvec![Command::CharacterSet {
            designate: None,
            invoke: Some(Invoke::LockGl(1)),
        }],
        '\x0f' => smallvec![Command::CharacterSet {
            designate: None,
            invoke: Some(Invoke::LockGl(0)),
        }],
        _ => SmallVec::new(),
    }
}

/// Path component of a `file://host/path` URL; other text is returned as is.
fn file_url_path(url: &str) -> &str {
    match url.strip_prefix("file://") {
        Some(rest) => rest.find('/').map_or("/", |slash| &rest[slash..]),
        None => url,
    }
}

/// Decode a non-SGR CSI body (`params intermediates final`, without `[`).
///
/// `None` means well-formed but unrecognized.
fn decode_csi(body: &str) -> Option<Commands> {
    let final_char = body.chars().last()?;
    let head = &body[..body.len() - final_char.len_utf8()];
    if head.chars().any(|c| ('\x20'..='\x2f').contains(&c)) {
        // Intermediates (DECSCUSR and friends) are not supported.
        return None;
    }

    if let Some(private) = head.strip_prefix('?') {
        let params = parse_csi_params(private)?;
        return match final_char {
            'h' => decode_private_modes(&params, true),
            'l' => decode_private_modes(&params, false),
            _ => None,
        };
    }
    if head.starts_with(['<', '=', '>']) {
        return None;
    }

    let params = parse_csi_params(head)?;
    let first = param(&params, 0);
    let cursor = |c: Cursor| Some(smallvec![Command::Cursor(c)]);
    match final_char {
        'A' => cursor(Cursor::delta(0, -signed(count_or_one(first)))),
        'B' => cursor(Cursor::delta(0, signed(count_or_one(first)))),
        'C' => cursor(Cursor::delta(signed(count_or_one(first)), 0)),
        'D' => cursor(Cursor::delta(-signed(count_or_one(first)), 0)),
        'E' => cursor(Cursor::delta(0, signed(count_or_one(first))).with_column(0)),
        'F' => cursor(Cursor::delta(0, -signed(count_or_one(first))).with_column(0)),
        'G' | '`' => cursor(Cursor::default().with_column(coordinate(first))),
        'H' | 'f' => cursor(
            Cursor::default()
                .with_row(coordinate(first))
                .with_column(coordinate(param(&params, 1))),
        ),
        'd' => cursor(Cursor::default().with_row(coordinate(first))),
        // ICH: insert blanks at the cursor without moving it.
        '@' => cursor(Cursor {
            text: Some(" ".repeat(count_or_one(first))),
            replace_range: Some(ReplaceRange::new(Some(0), Some(0))),
            relative: true,
            ..Cursor::default()
        }),
        'P' => cursor(Cursor {
            text: Some(String::new()),
            replace_range: Some(ReplaceRange::new(Some(0), Some(signed(count_or_one(first))))),
            relative: true,
            ..Cursor::default()
        }),
        'X' => cursor(Cursor {
            erase: true,
            replace_range: Some(ReplaceRange::new(Some(0), Some(signed(count_or_one(first))))),
            relative: true,
            ..Cursor::default()
        }),
        'J' => {
            let kind = match first.unwrap_or(0) {
                0 => ClearKind::ToEnd,
                1 => ClearKind::ToBeginning,
                2 => ClearKind::Screen,
                3 => ClearKind::Scrollback,
                _ => return None,
            };
            Some(smallvec![Command::Clear(kind)])
        }
        'K' => {
            let erase = match first.unwrap_or(0) {
                0 => Cursor {
                    text: Some(String::new()),
                    replace_range: Some(ReplaceRange::new(Some(0), None)),
                    relative: true,
                    ..Cursor::default()
                },
                1 => Cursor {
                    erase: true,
                    replace_range: Some(ReplaceRange::new(None, Some(1))),
                    relative: true,
                    ..Cursor::default()
                },
                2 => Cursor {
                    text: Some(String::new()),
                    replace_range: Some(ReplaceRange::new(None, None)),
                    ..Cursor::default()
                },
                _ => return None,
            };
            cursor(Cursor {
                fill_rest_of_line: true,
                ..erase
            })
        }
        'S' => Some(smallvec![Command::Scroll {
            direction: ScrollDirection::Up,
            lines: count_or_one(first),
        }]),
        'T' => Some(smallvec![Command::Scroll {
            direction: ScrollDirection::Down,
            lines: count_or_one(first),
        }]),
        'r' => {
            let top = first.map(|_| coordinate(first));
            let bottom = param(&params, 1)
                .filter(|&b| b > 0)
                .map(|b| usize::from(b) - 1);
            Some(smallvec![Command::ScrollMargin { top, bottom }])
        }
        'h' | 'l' => {
            let enable = final_char == 'h';
            let mut features = FeatureUpdate::default();
            for value in params.iter().flatten() {
                if *value == 4 {
                    // IRM set means insert mode.
                    features.replace_mode = Some(!enable);
                }
            }
            (!features.is_empty()).then(|| smallvec![Command::Features(features)])
        }
        // Window manipulation: accepted, no effect.
        't' => Some(SmallVec::new()),
        _ => None,
    }
}

/// DECSET / DECRST. Feature flags and mouse modes from one sequence become
/// at most one command each.
fn decode_private_modes(params: &[Option<u16>], enable: bool) -> Option<Commands> {
    let mut features = FeatureUpdate::default();
    let mut mouse = MouseUpdate::default();
    let format = |format| Some(if enable { format } else { MouseFormat::Default });
    let mode = |mode| Some(if enable { mode } else { MouseMode::Off });
    for value in params.iter().flatten() {
        match value {
            1 => features.cursor_keys = Some(enable),
            7 => features.auto_wrap = Some(enable),
            12 => features.cursor_blink = Some(enable),
            25 => features.show_cursor = Some(enable),
            47 | 1047 | 1049 => features.alternate_screen = Some(enable),
            2004 => features.bracketed_paste = Some(enable),
            9 => mouse.mode = mode(MouseMode::X10),
            1000 => mouse.mode = mode(MouseMode::Normal),
            1002 => mouse.mode = mode(MouseMode::ButtonEvent),
            1003 => mouse.mode = mode(MouseMode::AnyEvent),
            1004 => mouse.focus_events = Some(enable),
            1005 => mouse.format = format(MouseFormat::Utf8),
            1006 => mouse.format = format(MouseFormat::Sgr),
            1007 => mouse.alternate_scroll = Some(enable),
            1015 => mouse.format = format(MouseFormat::Urxvt),
            _ => {}
        }
    }
    let mut out = Commands::new();
    if !features.is_empty() {
        out.push(Command::Features(features));
    }
    if !mouse.is_empty() {
        out.push(Command::MouseTracking(mouse));
    }
    (!out.is_empty()).then_some(out)
}
