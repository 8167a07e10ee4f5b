#![forbid(unsafe_code)]

//! Streaming ANSI/VT terminal engine with folded scrollback.
//!
//! `foldterm-core` turns a stream of already-decoded text containing escape
//! sequences into a structured terminal model. Unlike a fixed cell grid, every
//! buffer stores logical (unwrapped) lines and folds them to the current width
//! on demand, so resizing reflows content instead of truncating it.
//!
//! # Pipeline
//!
//! - **Tokenizer**: resumable ANSI lexer; chunk boundaries never change output.
//! - **Decoder**: tokens → [`Command`]s, with LRU-memoized SGR and CSI decoding.
//! - **Terminal**: [`TerminalState`] applies commands to the scrollback or
//!   alternate [`Buffer`], tracking pen, charsets, modes, and mouse state.
//!
//! # Supporting pieces
//!
//! - **Styled text**: strings with style spans, indexed by character.
//! - **Charset**: DEC G0–G3 designation and shifts.
//! - **Keys**: key name → input byte sequence tables.
//! - **Selection**: logical-position text extraction from a buffer.
//!
//! # Design principles
//!
//! - **No I/O**: the host supplies text and reads state back.
//! - **Never fails on input**: malformed or unknown sequences are dropped and
//!   logged through `tracing`.
//! - **`#![forbid(unsafe_code)]`**: safety enforced at compile time.

pub mod buffer;
pub mod charset;
pub mod command;
pub mod config;
pub mod decoder;
pub mod keys;
pub mod selection;
pub mod stream;
pub mod style;
pub mod styled;
pub mod terminal;
pub mod tokenizer;

pub use buffer::{Buffer, LineFold, LineRecord, ScrollMargin};
pub use charset::{DecState, Invoke};
pub use command::{
    ClearKind, Command, Cursor, FeatureUpdate, MouseFormat, MouseMode, MouseUpdate, ReplaceRange,
    ScrollDirection,
};
pub use config::{ConfigError, TerminalConfig};
pub use decoder::{Commands, Decoder, SgrUpdate, parse_sgr};
pub use keys::{Modifiers, key_names, key_sequence, parse_key_name};
pub use selection::{Selection, TextPos};
pub use stream::AnsiStream;
pub use style::{Color, SgrFlags, Style};
pub use styled::{Span, StyledText, cell_len};
pub use terminal::{Features, MouseState, TerminalState};
pub use tokenizer::{ControlCode, EscapeKind, Token, Tokenizer};
