//! Key name → input byte sequence tables.
//!
//! Names are `+`-joined modifiers and a key, matched case-insensitively and in
//! any modifier order: `"up"`, `"shift+f5"`, `"ctrl+c"`, `"alt+shift+home"`.
//! Modified navigation and function keys use the xterm `CSI 1 ; m X` and
//! `CSI n ; m ~` forms, where `m` is one plus the modifier bits.
//!
//! When cursor-key application mode is on, unmodified arrows, Home and End
//! are sent as `SS3` sequences (`ESC O A`) instead of `CSI`.

use std::sync::LazyLock;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

bitflags! {
    /// Key modifiers, in xterm bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
    }
}

impl Modifiers {
    /// xterm modifier parameter: `1 + bits`.
    #[must_use]
    pub fn xterm_value(self) -> u8 {
        1 + self.bits()
    }

    fn prefix(self) -> String {
        let mut out = String::new();
        if self.contains(Self::CTRL) {
            out.push_str("ctrl+");
        }
        if self.contains(Self::ALT) {
            out.push_str("alt+");
        }
        if self.contains(Self::SHIFT) {
            out.push_str("shift+");
        }
        out
    }
}

/// Cursor keys with a `CSI <letter>` / `SS3 <letter>` encoding.
const CURSOR_KEYS: [(&str, char); 6] = [
    ("up", 'A'),
    ("down", 'B'),
    ("right", 'C'),
    ("left", 'D'),
    ("home", 'H'),
    ("end", 'F'),
];

/// Keys with a `CSI <n> ~` encoding.
const TILDE_KEYS: [(&str, u8); 12] = [
    ("insert", 2),
    ("delete", 3),
    ("pageup", 5),
    ("pagedown", 6),
    ("f5", 15),
    ("f6", 17),
    ("f7", 18),
    ("f8", 19),
    ("f9", 20),
    ("f10", 21),
    ("f11", 23),
    ("f12", 24),
];

/// F1–F4: `SS3 <letter>` unmodified, `CSI 1 ; m <letter>` modified.
const PF_KEYS: [(&str, char); 4] = [("f1", 'P'), ("f2", 'Q'), ("f3", 'R'), ("f4", 'S')];

/// Keys that are plain bytes; Alt prefixes them with `ESC`.
const PLAIN_KEYS: [(&str, &str); 5] = [
    ("enter", "\r"),
    ("tab", "\t"),
    ("escape", "\x1b"),
    ("backspace", "\x7f"),
    ("space", " "),
];

/// Canonical modifier order for table keys.
fn canonical(mods: Modifiers, key: &str) -> String {
    format!("{}{key}", mods.prefix())
}

fn all_modifier_sets() -> impl Iterator<Item = Modifiers> {
    (1..=7).map(Modifiers::from_bits_truncate)
}

fn ctrl_char(ch: char) -> Option<char> {
    match ch {
        '@' | ' ' => Some('\x00'),
        'a'..='z' => char::from_u32(u32::from(ch) - u32::from('a') + 1),
        '[' => Some('\x1b'),
        '\\' => Some('\x1c'),
        ']' => Some('\x1d'),
        '^' => Some('\x1e'),
        '_' => Some('\x1f'),
        _ => None,
    }
}

fn build_table() -> FxHashMap<String, String> {
    let mut table = FxHashMap::default();
    let mut add = |mods: Modifiers, key: &str, seq: String| {
        table.insert(canonical(mods, key), seq);
    };

    for (name, letter) in CURSOR_KEYS {
        add(Modifiers::empty(), name, format!("\x1b[{letter}"));
        for mods in all_modifier_sets() {
            add(mods, name, format!("\x1b[1;{}{letter}", mods.xterm_value()));
        }
    }
    for (name, code) in TILDE_KEYS {
        add(Modifiers::empty(), name, format!("\x1b[{code}~"));
        for mods in all_modifier_sets() {
            add(mods, name, format!("\x1b[{code};{}~", mods.xterm_value()));
        }
    }
    for (name, letter) in PF_KEYS {
        add(Modifiers::empty(), name, format!("\x1bO{letter}"));
        for mods in all_modifier_sets() {
            add(mods, name, format!("\x1b[1;{}{letter}", mods.xterm_value()));
        }
    }
    // F13–F24 are shifted F1–F12 on xterm.
    for (index, (_, letter)) in PF_KEYS.iter().enumerate() {
        add(Modifiers::empty(), &format!("f{}", index + 13), format!("\x1b[1;2{letter}"));
    }
    for (index, (_, code)) in TILDE_KEYS[4..].iter().enumerate() {
        add(Modifiers::empty(), &format!("f{}", index + 17), format!("\x1b[{code};2~"));
    }

    for (name, bytes) in PLAIN_KEYS {
        add(Modifiers::empty(), name, bytes.to_owned());
        add(Modifiers::ALT, name, format!("\x1b{bytes}"));
    }
    add(Modifiers::SHIFT, "tab", "\x1b[Z".to_owned());
    add(Modifiers::empty(), "backtab", "\x1b[Z".to_owned());
    add(Modifiers::CTRL, "backspace", "\x08".to_owned());
    add(Modifiers::CTRL, "space", "\x00".to_owned());
    add(Modifiers::SHIFT, "enter", "\r".to_owned());

    for letter in 'a'..='z' {
        let key = letter.to_string();
        if let Some(ctrl) = ctrl_char(letter) {
            add(Modifiers::CTRL, &key, ctrl.to_string());
        }
        add(
            Modifiers::CTRL | Modifiers::SHIFT,
            &key,
            format!("\x1b[{};6u", u32::from(letter)),
        );
        add(Modifiers::ALT, &key, format!("\x1b{letter}"));
        add(
            Modifiers::ALT | Modifiers::SHIFT,
            &key,
            format!("\x1b{}", letter.to_ascii_uppercase()),
        );
    }
    for symbol in ['@', '[', '\\', ']', '^', '_'] {
        if let Some(ctrl) = ctrl_char(symbol) {
            add(Modifiers::CTRL, &symbol.to_string(), ctrl.to_string());
        }
    }
    table
}

fn build_application_table() -> FxHashMap<String, String> {
    CURSOR_KEYS
        .iter()
        .map(|(name, letter)| ((*name).to_owned(), format!("\x1bO{letter}")))
        .collect()
}

static KEY_TABLE: LazyLock<FxHashMap<String, String>> = LazyLock::new(build_table);
static APPLICATION_KEY_TABLE: LazyLock<FxHashMap<String, String>> =
    LazyLock::new(build_application_table);

/// Split a key name into modifiers and the base key.
///
/// Returns `None` for an empty key or an unknown modifier.
#[must_use]
pub fn parse_key_name(name: &str) -> Option<(Modifiers, String)> {
    let lowered = name.trim().to_ascii_lowercase();
    // "ctrl++" names the plus key.
    let (mods_part, key) = match lowered.strip_suffix("++") {
        Some(rest) => (rest, "+"),
        None => match lowered.rsplit_once('+') {
            Some((mods, key)) => (mods, key),
            None => ("", lowered.as_str()),
        },
    };
    if key.is_empty() {
        return None;
    }
    let mut mods = Modifiers::empty();
    for part in mods_part.split('+').filter(|p| !p.is_empty()) {
        mods |= match part {
            "shift" => Modifiers::SHIFT,
            "alt" | "meta" | "option" => Modifiers::ALT,
            "ctrl" | "control" => Modifiers::CTRL,
            _ => return None,
        };
    }
    let key = match key {
        "esc" => "escape",
        "return" => "enter",
        "pgup" | "page_up" => "pageup",
        "pgdn" | "page_down" => "pagedown",
        "ins" => "insert",
        "del" => "delete",
        other => other,
    };
    Some((mods, key.to_owned()))
}

/// Byte sequence for a key name.
///
/// `application_cursor` selects the `SS3` forms for unmodified arrows,
/// Home and End.
#[must_use]
pub fn key_sequence(name: &str, application_cursor: bool) -> Option<&'static str> {
    let (mods, key) = parse_key_name(name)?;
    if application_cursor
        && mods.is_empty()
        && let Some(seq) = APPLICATION_KEY_TABLE.get(&key)
    {
        return Some(seq.as_str());
    }
    KEY_TABLE.get(&canonical(mods, &key)).map(String::as_str)
}

/// Every canonical key name in the table.
pub fn key_names() -> impl Iterator<Item = &'static str> {
    KEY_TABLE.keys().map(String::as_str)
}
