//! Resumable ANSI tokenizer.
//!
//! Splits already-decoded text into content runs, separators, and escape
//! sequence tokens. The tokenizer is an explicit state machine, so input may
//! arrive in chunks of any size: a sequence split across two
//! [`Tokenizer::feed`] calls produces exactly the token it would have produced
//! if delivered whole.
//!
//! Content runs are flushed at the end of every chunk; only escape sequences
//! are held back across calls.

/// DoS protection: maximum CSI parameter + intermediate length.
pub const MAX_CSI_LEN: usize = 256;

/// DoS protection: maximum OSC / DCS payload length.
pub const MAX_STRING_LEN: usize = 4096;

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Family of an escape sequence token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeKind {
    /// `ESC [` parameters, intermediates, final byte.
    Csi,
    /// `ESC ]` payload, terminated by ST or BEL.
    Osc,
    /// `ESC P` payload, terminated by ST or BEL.
    Dcs,
    /// `ESC` one of `( ) * + - . /` then a charset identifier.
    CharsetDesignation,
    /// `ESC #` plus one byte (DECDHL, DECALN, ...).
    LineAttribute,
    /// `ESC SP` plus one byte (S7C1T, conformance levels).
    Space,
    /// `ESC` plus any other single byte.
    Control,
}

/// A token produced by the tokenizer.
///
/// For escapes, the string holds everything after the `ESC`: `"[1;31m"`,
/// `"(0"`, `"D"`. OSC and DCS tokens hold only the payload, with both the
/// introducer and the terminator stripped: `"8;;https://x"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A run of ordinary text.
    Content(String),
    /// One of `\n`, `\r`, backspace, BEL, SO, SI.
    Separator(char),
    /// An escape sequence.
    Escape(EscapeKind, String),
}

/// Control functions reachable as `ESC <byte>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCode {
    /// `ESC D` index.
    Ind,
    /// `ESC E` next line.
    Nel,
    /// `ESC H` horizontal tab set.
    Hts,
    /// `ESC M` reverse index.
    Ri,
    /// `ESC N` single shift G2.
    Ss2,
    /// `ESC O` single shift G3.
    Ss3,
    /// `ESC V` start of guarded area.
    Spa,
    /// `ESC W` end of guarded area.
    Epa,
    /// `ESC X` start of string.
    Sos,
    /// `ESC Z` return terminal id.
    Decid,
    /// `ESC \` string terminator.
    St,
    /// `ESC ^` privacy message.
    Pm,
    /// `ESC _` application program command.
    Apc,
    /// `ESC c` full reset.
    Ris,
    /// `ESC 7` save cursor.
    Decsc,
    /// `ESC 8` restore cursor.
    Decrc,
    /// `ESC =` application keypad.
    Deckpam,
    /// `ESC >` normal keypad.
    Deckpnm,
    /// `ESC n` lock G2 into GL.
    Ls2,
    /// `ESC o` lock G3 into GL.
    Ls3,
    /// `ESC ~` lock G1 into GR.
    Ls1r,
    /// `ESC }` lock G2 into GR.
    Ls2r,
    /// `ESC |` lock G3 into GR.
    Ls3r,
}

impl ControlCode {
    /// Look up the control function for the byte following `ESC`.
    #[must_use]
    pub fn from_char(ch: char) -> Option<Self> {
        Some(match ch {
            'D' => Self::Ind,
            'E' => Self::Nel,
            'H' => Self::Hts,
            'M' => Self::Ri,
            'N' => Self::Ss2,
            'O' => Self::Ss3,
            'V' => Self::Spa,
            'W' => Self::Epa,
            'X' => Self::Sos,
            'Z' => Self::Decid,
            '\\' => Self::St,
            '^' => Self::Pm,
            '_' => Self::Apc,
            'c' => Self::Ris,
            '7' => Self::Decsc,
            '8' => Self::Decrc,
            '=' => Self::Deckpam,
            '>' => Self::Deckpnm,
            'n' => Self::Ls2,
            'o' => Self::Ls3,
            '~' => Self::Ls1r,
            '}' => Self::Ls2r,
            '|' => Self::Ls3r,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    Escape,
    Csi {
        params: String,
        intermediates: String,
    },
    /// Over-long CSI: swallow bytes up to the final byte, emit nothing.
    CsiIgnore,
    /// OSC or DCS payload.
    Str {
        kind: EscapeKind,
        payload: String,
        /// An `ESC` was seen; `\` completes the terminator.
        escape: bool,
        overflow: bool,
    },
    Charset {
        introducer: char,
        intermediates: String,
    },
    /// `ESC #` or `ESC SP`: one more byte follows.
    Extra(char),
}

/// Resumable tokenizer state.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    state: State,
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\x08' | BEL | '\x0e' | '\x0f')
}

fn is_trigger(ch: char) -> bool {
    ch == ESC || is_separator(ch)
}

fn is_parameter(ch: char) -> bool {
    ('\x30'..='\x3f').contains(&ch)
}

fn is_intermediate(ch: char) -> bool {
    ('\x20'..='\x2f').contains(&ch)
}

fn is_final(ch: char) -> bool {
    ('\x40'..='\x7e').contains(&ch)
}

impl Tokenizer {
    /// Create a new tokenizer in ground state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no partial escape sequence is buffered.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == State::Ground
    }

    /// Drop any partially buffered sequence.
    pub fn reset(&mut self) {
        self.state = State::Ground;
    }

    /// Feed a chunk of text and return the tokens it completes.
    #[must_use]
    pub fn feed(&mut self, text: &str) -> Vec<Token> {
        let mut out = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            if self.state == State::Ground {
                match rest.find(is_trigger) {
                    Some(0) => {}
                    Some(pos) => {
                        out.push(Token::Content(rest[..pos].to_owned()));
                        rest = &rest[pos..];
                    }
                    None => {
                        out.push(Token::Content(rest.to_owned()));
                        break;
                    }
                }
            }
            let mut chars = rest.chars();
            let Some(ch) = chars.next() else {
                break;
            };
            rest = chars.as_str();
            self.advance(ch, &mut out);
        }
        out
    }

    /// Advance the state machine by one character.
    fn advance(&mut self, ch: char, out: &mut Vec<Token>) {
        match std::mem::take(&mut self.state) {
            State::Ground => self.advance_ground(ch, out),
            State::Escape => self.advance_escape(ch, out),
            State::Csi {
                params,
                intermediates,
            } => self.advance_csi(ch, params, intermediates, out),
            State::CsiIgnore => {
                if is_parameter(ch) || is_intermediate(ch) {
                    self.state = State::CsiIgnore;
                } else {
                    tracing::trace!("dropped over-long CSI sequence");
                    if !is_final(ch) {
                        self.reprocess_control(ch, out);
                    }
                }
            }
            State::Str {
                kind,
                payload,
                escape,
                overflow,
            } => self.advance_string(ch, kind, payload, escape, overflow, out),
            State::Charset {
                introducer,
                mut intermediates,
            } => {
                if is_intermediate(ch) && intermediates.len() < 2 {
                    intermediates.push(ch);
                    self.state = State::Charset {
                        introducer,
                        intermediates,
                    };
                } else if ('\x30'..='\x7e').contains(&ch) {
                    out.push(Token::Escape(
                        EscapeKind::CharsetDesignation,
                        format!("{introducer}{intermediates}{ch}"),
                    ));
                } else {
                    tracing::trace!(%introducer, "malformed charset designation");
                    self.reprocess_control(ch, out);
                }
            }
            State::Extra(introducer) => {
                if ch < ' ' {
                    tracing::trace!(%introducer, "interrupted two-byte escape");
                    self.reprocess_control(ch, out);
                    return;
                }
                let kind = if introducer == '#' {
                    EscapeKind::LineAttribute
                } else {
                    EscapeKind::Space
                };
                out.push(Token::Escape(kind, format!("{introducer}{ch}")));
            }
        }
    }

    fn advance_ground(&mut self, ch: char, out: &mut Vec<Token>) {
        if ch == ESC {
            self.state = State::Escape;
        } else if is_separator(ch) {
            out.push(Token::Separator(ch));
        } else {
            out.push(Token::Content(ch.to_string()));
        }
    }

    fn advance_escape(&mut self, ch: char, out: &mut Vec<Token>) {
        self.state = match ch {
            '[' => State::Csi {
                params: String::new(),
                intermediates: String::new(),
            },
            ']' => State::Str {
                kind: EscapeKind::Osc,
                payload: String::new(),
                escape: false,
                overflow: false,
            },
            'P' => State::Str {
                kind: EscapeKind::Dcs,
                payload: String::new(),
                escape: false,
                overflow: false,
            },
            '(' | ')' | '*' | '+' | '-' | '.' | '/' => State::Charset {
                introducer: ch,
                intermediates: String::new(),
            },
            '#' | ' ' => State::Extra(ch),
            // ESC ESC: the first escape is abandoned.
            ESC => State::Escape,
            // C0 controls execute inside an escape, abandoning it.
            _ if ch < ' ' => {
                self.advance_ground(ch, out);
                return;
            }
            _ => {
                out.push(Token::Escape(EscapeKind::Control, ch.to_string()));
                State::Ground
            }
        };
    }

    fn advance_csi(
        &mut self,
        ch: char,
        mut params: String,
        mut intermediates: String,
        out: &mut Vec<Token>,
    ) {
        if is_final(ch) {
            out.push(Token::Escape(
                EscapeKind::Csi,
                format!("[{params}{intermediates}{ch}"),
            ));
            return;
        }
        if params.len() + intermediates.len() >= MAX_CSI_LEN {
            self.state = State::CsiIgnore;
            self.advance(ch, out);
            return;
        }
        if intermediates.is_empty() && is_parameter(ch) {
            params.push(ch);
        } else if is_intermediate(ch) {
            intermediates.push(ch);
        } else {
            tracing::trace!(%params, "malformed CSI sequence");
            self.reprocess_control(ch, out);
            return;
        }
        self.state = State::Csi {
            params,
            intermediates,
        };
    }

    fn advance_string(
        &mut self,
        ch: char,
        kind: EscapeKind,
        mut payload: String,
        escape: bool,
        mut overflow: bool,
        out: &mut Vec<Token>,
    ) {
        let terminated = if escape { ch == '\\' } else { ch == BEL };
        if terminated {
            if overflow {
                tracing::trace!(?kind, "dropped over-long string sequence");
            } else {
                out.push(Token::Escape(kind, payload));
            }
            return;
        }
        let mut push = |c: char| {
            if payload.len() < MAX_STRING_LEN {
                payload.push(c);
            } else {
                overflow = true;
            }
        };
        if escape {
            // False alarm; the escape belongs to the payload.
            push(ESC);
        }
        let escape = ch == ESC;
        if !escape {
            push(ch);
        }
        self.state = State::Str {
            kind,
            payload,
            escape,
            overflow,
        };
    }

    /// After a malformed sequence, C0 controls and ESC are processed
    /// normally; any other offending character is consumed.
    fn reprocess_control(&mut self, ch: char, out: &mut Vec<Token>) {
        self.state = State::Ground;
        if ch < ' ' {
            self.advance_ground(ch, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new().feed(input)
    }

    fn content(s: &str) -> Token {
        Token::Content(s.to_owned())
    }

    fn esc(kind: EscapeKind, raw: &str) -> Token {
        Token::Escape(kind, raw.to_owned())
    }

    /// Feed `input` split at every char boundary and compare against the
    /// whole-input tokens, ignoring how content runs are split.
    fn assert_chunk_invariant(input: &str) {
        let whole = merge_content(tokens(input));
        for (split, _) in input.char_indices().skip(1) {
            let mut t = Tokenizer::new();
            let mut got = t.feed(&input[..split]);
            got.extend(t.feed(&input[split..]));
            assert_eq!(merge_content(got), whole, "split at {split} of {input:?}");
        }
    }

    fn merge_content(tokens: Vec<Token>) -> Vec<Token> {
        let mut out: Vec<Token> = Vec::new();
        for token in tokens {
            if let Token::Content(text) = &token
                && let Some(Token::Content(prev)) = out.last_mut()
            {
                prev.push_str(text);
                continue;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn plain_text_is_one_content_token() {
        assert_eq!(tokens("hello world"), vec![content("hello world")]);
    }

    #[test]
    fn separators_split_content() {
        assert_eq!(
            tokens("ab\r\ncd\x08\x07"),
            vec![
                content("ab"),
                Token::Separator('\r'),
                Token::Separator('\n'),
                content("cd"),
                Token::Separator('\x08'),
                Token::Separator('\x07'),
            ]
        );
    }

    #[test]
    fn shift_in_and_out_are_separators() {
        assert_eq!(
            tokens("\x0eq\x0f"),
            vec![
                Token::Separator('\x0e'),
                content("q"),
                Token::Separator('\x0f')
            ]
        );
    }

    #[test]
    fn csi_sequence() {
        assert_eq!(
            tokens("a\x1b[1;31mb"),
            vec![content("a"), esc(EscapeKind::Csi, "[1;31m"), content("b")]
        );
    }

    #[test]
    fn csi_private_and_intermediate() {
        assert_eq!(tokens("\x1b[?25l"), vec![esc(EscapeKind::Csi, "[?25l")]);
        assert_eq!(tokens("\x1b[2 q"), vec![esc(EscapeKind::Csi, "[2 q")]);
    }

    #[test]
    fn malformed_csi_is_dropped() {
        // Parameter byte after an intermediate is invalid.
        assert_eq!(tokens("\x1b[ 1mX"), vec![content("mX")]);
    }

    #[test]
    fn malformed_csi_reprocesses_control() {
        assert_eq!(
            tokens("\x1b[1\nX"),
            vec![Token::Separator('\n'), content("X")]
        );
        assert_eq!(tokens("\x1b[1\x1b[2J"), vec![esc(EscapeKind::Csi, "[2J")]);
    }

    #[test]
    fn osc_terminated_by_bel_and_st() {
        assert_eq!(
            tokens("\x1b]0;title\x07x"),
            vec![esc(EscapeKind::Osc, "0;title"), content("x")]
        );
        assert_eq!(
            tokens("\x1b]8;;https://a.test\x1b\\x"),
            vec![esc(EscapeKind::Osc, "8;;https://a.test"), content("x")]
        );
    }

    #[test]
    fn osc_escape_without_backslash_stays_in_payload() {
        assert_eq!(
            tokens("\x1b]2;a\x1bb\x07"),
            vec![esc(EscapeKind::Osc, "2;a\x1bb")]
        );
    }

    #[test]
    fn dcs_sequence() {
        assert_eq!(tokens("\x1bPq#0\x1b\\"), vec![esc(EscapeKind::Dcs, "q#0")]);
    }

    #[test]
    fn charset_designations() {
        assert_eq!(
            tokens("\x1b(0\x1b)B\x1b*<\x1b+A\x1b-A"),
            vec![
                esc(EscapeKind::CharsetDesignation, "(0"),
                esc(EscapeKind::CharsetDesignation, ")B"),
                esc(EscapeKind::CharsetDesignation, "*<"),
                esc(EscapeKind::CharsetDesignation, "+A"),
                esc(EscapeKind::CharsetDesignation, "-A"),
            ]
        );
    }

    #[test]
    fn charset_with_intermediate() {
        assert_eq!(
            tokens("\x1b(%5"),
            vec![esc(EscapeKind::CharsetDesignation, "(%5")]
        );
    }

    #[test]
    fn line_attribute_and_space() {
        assert_eq!(
            tokens("\x1b#8\x1b F"),
            vec![
                esc(EscapeKind::LineAttribute, "#8"),
                esc(EscapeKind::Space, " F")
            ]
        );
    }

    #[test]
    fn line_attribute_interrupted_by_control() {
        assert_eq!(tokens("\x1b#\x1b[1mX"), vec![esc(EscapeKind::Csi, "[1m"), content("X")]);
        assert_eq!(
            tokens("\x1b \nX"),
            vec![Token::Separator('\n'), content("X")]
        );
    }

    #[test]
    fn control_escapes() {
        assert_eq!(
            tokens("\x1bD\x1bM\x1bn"),
            vec![
                esc(EscapeKind::Control, "D"),
                esc(EscapeKind::Control, "M"),
                esc(EscapeKind::Control, "n"),
            ]
        );
        assert_eq!(ControlCode::from_char('M'), Some(ControlCode::Ri));
        assert_eq!(ControlCode::from_char('|'), Some(ControlCode::Ls3r));
        assert_eq!(ControlCode::from_char('!'), None);
    }

    #[test]
    fn control_inside_escape_executes() {
        assert_eq!(
            tokens("\x1b\nA"),
            vec![Token::Separator('\n'), content("A")]
        );
    }

    #[test]
    fn partial_sequence_is_held() {
        let mut t = Tokenizer::new();
        assert_eq!(t.feed("ab\x1b[3"), vec![content("ab")]);
        assert!(!t.is_idle());
        assert_eq!(t.feed("1m"), vec![esc(EscapeKind::Csi, "[31m")]);
        assert!(t.is_idle());
    }

    #[test]
    fn reset_drops_partial() {
        let mut t = Tokenizer::new();
        let _ = t.feed("\x1b]0;abc");
        t.reset();
        assert_eq!(t.feed("x"), vec![content("x")]);
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        for input in [
            "a\x1b[1;31mb\x1b[0m",
            "\x1b]8;;https://a.test\x1b\\link\x1b]8;;\x07",
            "\x1bPq\x1b\\x",
            "\x1b(0lqk\x1b(B",
            "\x1b#8\x1b F\x1bD",
            "x\r\ny\x08\x0ez\x0f",
            "\x1b]2;a\x1bb\x07",
            "\x1b[?1000;1006h",
        ] {
            assert_chunk_invariant(input);
        }
    }

    #[test]
    fn over_long_csi_is_discarded() {
        let input = format!("\x1b[{}mX", "1;".repeat(MAX_CSI_LEN));
        assert_eq!(tokens(&input), vec![content("X")]);
    }

    #[test]
    fn over_long_osc_is_discarded() {
        let input = format!("\x1b]0;{}\x07X", "a".repeat(MAX_STRING_LEN + 10));
        assert_eq!(tokens(&input), vec![content("X")]);
    }
}
