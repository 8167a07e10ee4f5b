//! DEC character-set state: G0–G3 slots, GL/GR locking shifts, single shift.
//!
//! Designation (`ESC ( 0`, ...) stores a charset identifier in a slot;
//! invocation picks which slot GL/GR use, or arms a one-shot single shift.
//! Translation only remaps characters for identifiers with a registered table
//! (`0` = DEC Special Graphics, `A` = United Kingdom); everything else passes
//! through unchanged.

/// Default slot identifiers: ASCII, ASCII, DEC supplemental, DEC graphics.
pub const DEFAULT_SLOTS: [&str; 4] = ["B", "B", "<", "0"];

/// A charset invocation (locking or single shift).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invoke {
    /// Lock slot `n` into GL (SI = G0, SO = G1, LS2, LS3).
    LockGl(u8),
    /// Lock slot `n` into GR (LS1R, LS2R, LS3R).
    LockGr(u8),
    /// Use slot `n` for the next character only (SS2, SS3).
    SingleShift(u8),
}

/// DEC charset state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecState {
    slots: [String; 4],
    gl: usize,
    gr: usize,
    single_shift: Option<usize>,
}

impl Default for DecState {
    fn default() -> Self {
        Self::new()
    }
}

impl DecState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: DEFAULT_SLOTS.map(str::to_owned),
            gl: 0,
            gr: 1,
            single_shift: None,
        }
    }

    /// Identifier designated to `slot` (0-3).
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<&str> {
        self.slots.get(slot).map(String::as_str)
    }

    /// Slot currently locked into GL.
    #[must_use]
    pub fn gl(&self) -> usize {
        self.gl
    }

    /// Slot currently locked into GR.
    #[must_use]
    pub fn gr(&self) -> usize {
        self.gr
    }

    /// Pending single-shift slot, if armed.
    #[must_use]
    pub fn single_shift(&self) -> Option<usize> {
        self.single_shift
    }

    /// Designate `charset` into `slot`. Out-of-range slots are ignored.
    pub fn designate(&mut self, slot: usize, charset: &str) {
        if let Some(target) = self.slots.get_mut(slot) {
            target.clear();
            target.push_str(charset);
        }
    }

    /// Apply a locking or single shift.
    pub fn invoke(&mut self, invoke: Invoke) {
        match invoke {
            Invoke::LockGl(n) => self.gl = usize::from(n & 3),
            Invoke::LockGr(n) => self.gr = usize::from(n & 3),
            Invoke::SingleShift(n) => self.single_shift = Some(usize::from(n & 3)),
        }
    }

    /// Translate text written to the terminal.
    ///
    /// A pending single shift applies to the first character only and is
    /// consumed; the rest goes through the GL slot.
    pub fn translate(&mut self, text: &str) -> String {
        let mut chars = text.chars();
        let mut out = String::with_capacity(text.len());
        if let Some(slot) = self.single_shift {
            let Some(first) = chars.next() else {
                return out;
            };
            self.single_shift = None;
            out.push(translate_char(first, &self.slots[slot]));
        }
        let gl = &self.slots[self.gl];
        if has_table(gl) {
            out.extend(chars.map(|ch| translate_char(ch, gl)));
        } else {
            out.push_str(chars.as_str());
        }
        out
    }
}

fn has_table(charset: &str) -> bool {
    matches!(charset, "0" | "A")
}

/// Translate one character through the table registered for `charset`.
#[must_use]
pub fn translate_char(ch: char, charset: &str) -> char {
    match charset {
        "0" => dec_graphics_char(ch),
        "A" if ch == '#' => '£',
        _ => ch,
    }
}

/// DEC Special Graphics: maps ASCII 0x60–0x7E to line-drawing symbols.
fn dec_graphics_char(ch: char) -> char {
    match ch {
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let dec = DecState::new();
        assert_eq!(dec.slot(0), Some("B"));
        assert_eq!(dec.slot(1), Some("B"));
        assert_eq!(dec.slot(2), Some("<"));
        assert_eq!(dec.slot(3), Some("0"));
        assert_eq!(dec.gl(), 0);
        assert_eq!(dec.single_shift(), None);
    }

    #[test]
    fn ascii_passes_through() {
        let mut dec = DecState::new();
        assert_eq!(dec.translate("lqqk"), "lqqk");
    }

    #[test]
    fn designated_graphics_in_g0() {
        let mut dec = DecState::new();
        dec.designate(0, "0");
        assert_eq!(dec.translate("lqqk"), "┌──┐");
        assert_eq!(dec.translate("x x"), "│ │");
    }

    #[test]
    fn locking_shift_selects_slot() {
        let mut dec = DecState::new();
        // G3 defaults to graphics; lock it into GL.
        dec.invoke(Invoke::LockGl(3));
        assert_eq!(dec.translate("q"), "─");
        dec.invoke(Invoke::LockGl(0));
        assert_eq!(dec.translate("q"), "q");
    }

    #[test]
    fn single_shift_applies_to_one_char() {
        let mut dec = DecState::new();
        dec.invoke(Invoke::SingleShift(3));
        assert_eq!(dec.translate("qq"), "─q");
        assert_eq!(dec.single_shift(), None);
        assert_eq!(dec.translate("q"), "q");
    }

    #[test]
    fn single_shift_survives_empty_text() {
        let mut dec = DecState::new();
        dec.invoke(Invoke::SingleShift(3));
        assert_eq!(dec.translate(""), "");
        assert_eq!(dec.single_shift(), Some(3));
        assert_eq!(dec.translate("j"), "┘");
    }

    #[test]
    fn uk_charset_maps_pound() {
        let mut dec = DecState::new();
        dec.designate(0, "A");
        assert_eq!(dec.translate("#1"), "£1");
    }

    #[test]
    fn out_of_range_designation_ignored() {
        let mut dec = DecState::new();
        dec.designate(7, "0");
        assert_eq!(dec, DecState::new());
    }
}
