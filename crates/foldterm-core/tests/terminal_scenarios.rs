//! End-to-end terminal scenarios: text in, buffer state out.
//!
//! Tests drive a [`TerminalState`] the way a host would and inspect the
//! resulting buffers.

use foldterm_core::{
    Buffer, Color, MouseFormat, MouseMode, ScrollDirection, SgrFlags, Style,
    TerminalConfig, TerminalState,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn term(width: usize, height: usize) -> TerminalState {
    TerminalState::with_size(width, height)
}

fn texts(buffer: &Buffer) -> Vec<String> {
    buffer
        .lines()
        .iter()
        .map(|line| line.content.text().to_owned())
        .collect()
}

fn fold_texts(buffer: &Buffer) -> Vec<String> {
    buffer
        .folded_lines()
        .iter()
        .map(|fold| fold.content.text().to_owned())
        .collect()
}

// ── Folding ─────────────────────────────────────────────────────────────

#[test]
fn fold_count_follows_width() {
    for (len, width, folds) in [(0, 10, 1), (10, 10, 1), (11, 10, 2), (25, 10, 3), (7, 1, 7)] {
        let mut t = term(width, 24);
        t.write("\r");
        t.write(&"x".repeat(len));
        assert_eq!(
            t.buffer().lines()[0].folds.len(),
            folds,
            "len {len} at width {width}"
        );
    }
}

#[test]
fn long_line_folds_into_rows() {
    let mut t = term(5, 10);
    t.write("hello world!");
    assert_eq!(fold_texts(t.buffer()), vec!["hello", " worl", "d!"]);
    assert_eq!(t.buffer().cursor(), (2, 2));
}

#[test]
fn wide_chars_are_never_split() {
    let mut t = term(5, 10);
    t.write("ab中文字");
    // "文" covers the break at cell 5, so it opens the second fold.
    assert_eq!(fold_texts(t.buffer()), vec!["ab中", "文字"]);
}

#[test]
fn wide_char_fold_count_follows_cells() {
    // 4 cells at width 2: two rows, with the wide char leading the second.
    let mut t = term(2, 10);
    t.write("a中b");
    assert_eq!(fold_texts(t.buffer()), vec!["a", "中b"]);
    assert_eq!(t.buffer().cursor(), (1, 2));
}

#[test]
fn resize_reflows_both_buffers() {
    let mut t = term(20, 5);
    t.write("0123456789012345");
    t.write("\x1b[?1049h\x1b[H0123456789012345");
    t.resize(8, 5);
    assert_eq!(t.scrollback_buffer().folded_lines().len(), 2);
    assert_eq!(t.alternate_buffer().folded_lines()[0].content.text(), "01234567");
    assert!(t.scrollback_buffer().is_consistent());
    assert!(t.alternate_buffer().is_consistent());
}

#[test]
fn reflow_round_trip_restores_folds() {
    let mut t = term(12, 6);
    t.write("the quick brown fox\r\njumps over\r\nthe lazy dog");
    let folds = t.buffer().folded_lines().to_vec();
    let cursor = t.buffer().cursor();
    t.resize(5, 6);
    t.resize(12, 6);
    assert_eq!(t.buffer().folded_lines(), folds.as_slice());
    assert_eq!(t.buffer().cursor(), cursor);
}

// ── Text and style ──────────────────────────────────────────────────────

#[test]
fn hello_world_cursor() {
    let mut t = term(80, 24);
    t.write("Hello\r\nWorld");
    assert_eq!(texts(t.buffer()), vec!["Hello", "World"]);
    assert_eq!(t.buffer().cursor_logical(), (1, 5));
    assert_eq!(t.buffer().plain_text(), "Hello\nWorld");
}

#[test]
fn bold_red_then_reset() {
    let mut t = term(80, 24);
    t.write("\x1b[1;31mX\x1b[0mY");
    let runs = t.buffer().lines()[0].content.runs();
    let bold_red = Style::null()
        .with_flags(SgrFlags::BOLD)
        .with_fg(Color::Named(1));
    assert_eq!(
        runs,
        vec![("X".to_owned(), bold_red), ("Y".to_owned(), Style::null())]
    );
}

#[test]
fn extended_colors_reach_content() {
    let mut t = term(80, 24);
    t.write("\x1b[38;5;208;48;2;1;2;3mC");
    let style = t.buffer().lines()[0].content.style_at(0).cloned();
    assert_eq!(
        style,
        Some(
            Style::null()
                .with_fg(Color::Indexed(208))
                .with_bg(Color::Rgb(1, 2, 3))
        )
    );
}

#[test]
fn style_persists_across_chunks() {
    let mut t = term(80, 24);
    t.write("\x1b[3");
    t.write("2mgreen");
    assert_eq!(t.pen().fg, Color::Named(2));
    assert_eq!(
        t.buffer().lines()[0].content.style_at(4).map(|s| s.fg),
        Some(Color::Named(2))
    );
}

#[test]
fn hyperlink_lifecycle() {
    let mut t = term(80, 24);
    t.write("see \x1b]8;id=1;https://example.com/a;b\x07here\x1b]8;;\x07.");
    let runs = t.buffer().lines()[0].content.runs();
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[1].0, "here");
    assert_eq!(runs[1].1.link.as_deref(), Some("https://example.com/a;b"));
    assert_eq!(runs[2].1.link, None);
    assert!(t.pen().link.is_none());
}

#[test]
fn writing_beyond_line_end_pads() {
    let mut t = term(80, 24);
    t.write("ab\x1b[5Gx");
    assert_eq!(texts(t.buffer()), vec!["ab  x"]);
}

// ── Cursor motion ───────────────────────────────────────────────────────

#[test]
fn cursor_up_clamps_at_first_row() {
    let mut t = term(80, 24);
    t.write("\x1b[6;1H");
    assert_eq!(t.buffer().cursor(), (5, 0));
    t.write("\x1b[100A");
    assert_eq!(t.buffer().cursor(), (0, 0));
}

#[test]
fn absolute_position_is_screen_relative() {
    let mut t = term(20, 3);
    t.write("a\r\nb\r\nc\r\nd\r\ne");
    t.write("\x1b[1;1HX");
    // Screen shows c, d, e; row 1 is "c".
    assert_eq!(texts(t.buffer()), vec!["a", "b", "X", "d", "e"]);
}

#[test]
fn backspace_moves_left() {
    let mut t = term(80, 24);
    t.write("abc\x08\x08X");
    assert_eq!(texts(t.buffer()), vec!["aXc"]);
}

#[test]
fn next_and_previous_line() {
    let mut t = term(80, 24);
    t.write("abc\x1b[2Ex\x1b[1Fy");
    assert_eq!(texts(t.buffer()), vec!["abc", "y", "x"]);
}

// ── Erase and clear ─────────────────────────────────────────────────────

#[test]
fn clear_screen_leaves_height_blank_lines() {
    let mut t = term(30, 6);
    for i in 0..20 {
        t.write(&format!("line {i}\r\n"));
    }
    t.write("\x1b[2J");
    assert_eq!(t.buffer().line_count(), 6);
    assert!(texts(t.buffer()).iter().all(String::is_empty));
    assert_eq!((t.width(), t.height()), (30, 6));
}

#[test]
fn clear_to_beginning_keeps_rows_below() {
    let mut t = term(4, 4);
    t.write("\x1b[?1049h\x1b[1;1Habcdefgh\x1b[3;1Hxy\x1b[4;1Hz");
    assert_eq!(fold_texts(t.buffer()), vec!["abcd", "efgh", "xy", "z"]);
    t.write("\x1b[3;2H\x1b[1J");
    assert_eq!(fold_texts(t.buffer()), vec!["", "", "  ", "z"]);
    assert_eq!(t.buffer().cursor(), (2, 1));
}

#[test]
fn clear_scrollback_splits_partly_visible_line() {
    let mut t = term(4, 2);
    t.write("abcdefgh\r\nz");
    assert_eq!(fold_texts(t.buffer()), vec!["abcd", "efgh", "z"]);
    t.write("\x1b[3J");
    assert_eq!(texts(t.buffer()), vec!["efgh", "z"]);
    assert_eq!(t.buffer().cursor(), (1, 1));
}

#[test]
fn erase_line_fills_with_background() {
    let mut t = term(80, 24);
    t.write("text\x1b[44m\x1b[2K");
    let line = &t.buffer().lines()[0];
    assert!(line.content.is_empty());
    assert_eq!(line.fill.bg, Color::Named(4));
}

#[test]
fn erase_characters_uses_pen_background() {
    let mut t = term(80, 24);
    t.write("abcdef\r\x1b[41m\x1b[3X");
    let line = &t.buffer().lines()[0].content;
    assert_eq!(line.text(), "   def");
    assert_eq!(line.style_at(0).map(|s| s.bg), Some(Color::Named(1)));
    assert_eq!(line.style_at(3), None);
}

// ── Scrolling ───────────────────────────────────────────────────────────

#[test]
fn margin_scroll_up_by_one() {
    let mut t = term(20, 12);
    t.write("\x1b[?1049h");
    for i in 0..12 {
        t.write(&format!("\x1b[{};1H{i}", i + 1));
    }
    t.write("\x1b[3;11r\x1b[S");
    let rows = texts(t.buffer());
    let expected: Vec<String> = ["0", "1", "3", "4", "5", "6", "7", "8", "9", "10", "", "11"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    assert_eq!(rows, expected);
}

#[test]
fn scroll_down_inserts_blank_at_top() {
    let mut t = term(20, 4);
    t.write("\x1b[?1049ha\r\nb\r\nc\r\nd\x1b[T");
    assert_eq!(texts(t.buffer()), vec!["", "a", "b", "c"]);
}

#[test]
fn index_at_margin_bottom_scrolls_region() {
    let mut t = term(20, 5);
    t.write("\x1b[?1049h");
    for i in 0..5 {
        t.write(&format!("\x1b[{};1H{i}", i + 1));
    }
    t.write("\x1b[2;4r\x1b[4;1H\x1bD");
    assert_eq!(texts(t.buffer()), vec!["0", "2", "3", "", "4"]);
    assert_eq!(t.buffer().cursor().0, 3);
}

#[test]
fn main_screen_grows_without_margin() {
    let mut t = term(20, 3);
    t.write("1\r\n2\r\n3\r\n4\r\n5");
    assert_eq!(t.buffer().line_count(), 5);
    assert_eq!(t.buffer().screen_start(3), 2);
}

#[test]
fn margin_scroll_splits_wrapped_line() {
    let mut t = term(4, 5);
    t.write("\x1b[?1049h\x1b[1;1Hhead\x1b[2;1Habcdefgh\x1b[4;1Hmid\x1b[5;1Hfoot");
    assert_eq!(fold_texts(t.buffer()), vec!["head", "abcd", "efgh", "mid", "foot"]);
    t.write("\x1b[2;4r\x1b[S");
    assert_eq!(fold_texts(t.buffer()), vec!["head", "efgh", "mid", "", "foot"]);
    assert!(t.buffer().is_consistent());
}

#[test]
fn main_screen_scroll_keeps_row_count() {
    let mut t = term(4, 4);
    t.write("abcdefghijkl\r\nz");
    assert_eq!(fold_texts(t.buffer()), vec!["abcd", "efgh", "ijkl", "z"]);
    t.write("\x1b[2S");
    assert_eq!(fold_texts(t.buffer()), vec!["ijkl", "z", "", ""]);
}

#[test]
fn rows_with_new_content_get_new_generations() {
    fn rows(buffer: &Buffer) -> Vec<(u64, String)> {
        buffer
            .folded_lines()
            .iter()
            .map(|fold| (fold.updates, fold.content.text().to_owned()))
            .collect()
    }
    let mut t = term(4, 3);
    t.write("\x1b[?1049habcdef\r\nxy");
    for input in ["\x1b[S", "\x1b[T", "\r\n\r\n", "\x1b[2J", "\x1b[Hq"] {
        let before = rows(t.buffer());
        t.write(input);
        let after = rows(t.buffer());
        for (old, new) in before.iter().zip(&after) {
            if old.1 != new.1 {
                assert_ne!(old.0, new.0, "row reused {old:?} for {new:?} after {input:?}");
            }
        }
    }
}

#[test]
fn explicit_scroll_api() {
    let mut t = term(20, 3);
    t.write("\x1b[?1049ha\r\nb\r\nc");
    t.scroll(ScrollDirection::Up, 2);
    assert_eq!(texts(t.buffer()), vec!["c", "", ""]);
}

// ── Charsets ────────────────────────────────────────────────────────────

#[test]
fn dec_graphics_box() {
    let mut t = term(80, 24);
    t.write("\x1b(0lqqk\r\nx  x\r\nmqqj\x1b(B ok");
    assert_eq!(texts(t.buffer()), vec!["┌──┐", "│  │", "└──┘ ok"]);
}

#[test]
fn locking_shift_two() {
    let mut t = term(80, 24);
    t.write("\x1b*0\x1bnqq\x1boqq");
    // G2 was designated graphics; G3 defaults to graphics too.
    assert_eq!(texts(t.buffer()), vec!["────"]);
    assert_eq!(t.dec().gl(), 3);
}

#[test]
fn shift_out_uses_g1() {
    let mut t = term(80, 24);
    t.write("\x1b)0a\x0ea\x0fa");
    assert_eq!(texts(t.buffer()), vec!["a▒a"]);
}

// ── Modes ───────────────────────────────────────────────────────────────

#[test]
fn alternate_screen_round_trip() {
    let mut t = term(20, 4);
    t.write("$ vim\r\n");
    t.write("\x1b[?1049h\x1b[2J\x1b[Hediting");
    assert_eq!(t.buffer().lines()[0].content.text(), "editing");
    t.write("\x1b[?1049l");
    assert!(!t.features().alternate_screen);
    assert_eq!(texts(t.buffer()), vec!["$ vim"]);
    assert_eq!(t.buffer().cursor(), (1, 0));
}

#[test]
fn mouse_union_in_one_sequence() {
    let mut t = term(80, 24);
    t.write("\x1b[?1003;1015;1007h");
    assert_eq!(t.mouse().mode, MouseMode::AnyEvent);
    assert_eq!(t.mouse().format, MouseFormat::Urxvt);
    assert!(t.mouse().alternate_scroll);
    assert!(!t.mouse().focus_events);
}

#[test]
fn application_cursor_keys() {
    let mut t = term(80, 24);
    assert_eq!(t.key_sequence("up"), Some("\x1b[A"));
    t.write("\x1b[?1h");
    assert_eq!(t.key_sequence("up"), Some("\x1bOA"));
    assert_eq!(t.key_sequence("shift+up"), Some("\x1b[1;2A"));
    t.write("\x1b[?1l");
    assert_eq!(t.key_sequence("up"), Some("\x1b[A"));
}

#[test]
fn working_directory_from_file_url() {
    let mut t = term(80, 24);
    t.write("\x1b]7;file://host/home/user\x1b\\");
    assert_eq!(t.current_directory(), Some("/home/user"));
}

// ── Robustness ──────────────────────────────────────────────────────────

#[test]
fn unknown_sequences_are_dropped() {
    let mut t = term(80, 24);
    t.write("a\x1b[?9999hb\x1b]4242;x\x07c\x1bPdcs\x1b\\d");
    assert_eq!(texts(t.buffer()), vec!["abcd"]);
    assert!(t.unrecognized() >= 2);
}

#[test]
fn configured_terminal_honors_insert_mode() {
    let config = TerminalConfig::default()
        .with_size(40, 10)
        .with_replace_mode(false);
    let mut t = TerminalState::new(config);
    t.write("world\rhello ");
    assert_eq!(texts(t.buffer()), vec!["hello world"]);
}

#[test]
fn buffers_stay_consistent_after_mixed_input() {
    let mut t = term(7, 4);
    t.write("\x1b[31mabcdefghijkl\x1b[0m\r\n\x1b[2;3H中文\x1b[K\x1b[1J\x1b[3J");
    t.write("\x1b[?7lno wrap here at all\x1b[?7h");
    t.resize(3, 4);
    assert!(t.buffer().is_consistent());
    assert_eq!(t.buffer().width(), 3);
}
