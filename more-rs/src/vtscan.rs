//! VT/CSI scanner — spec.md §4.B, the core primitive of this crate.
//!
//! Walks a `&str` slice counting cells vs. bytes, applying CSI SGR escapes
//! to a running color, and injecting highlight escapes at search-match
//! boundaries. One codepoint is one cell outside of escape sequences
//! (spec.md §1 Non-goals: no grapheme-cluster width).

use crate::attr::{final_color_from_escape, string_to_text_attribute, Attr};

/// Supplies "where does the next match start" on demand, so the scanner
/// never needs to know how patterns are matched (that's module D's job).
/// `from` and the returned range are byte offsets into `text`.
pub trait MatchSource {
    /// The next match at or after byte offset `from`, if any.
    fn next_match(&self, text: &str, from: usize) -> Option<(usize, usize, Attr)>;
}

/// A [`MatchSource`] with no active patterns — used when search is off.
pub struct NoMatches;

impl MatchSource for NoMatches {
    fn next_match(&self, _text: &str, _from: usize) -> Option<(usize, usize, Attr)> {
        None
    }
}

/// Result of scanning one logical line's worth of cells out of a physical
/// line's remaining text.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Bytes consumed from the source `text`.
    pub bytes_consumed: usize,
    /// The generated buffer, if highlight escapes were injected (differs
    /// from the source bytes); `None` means the caller can borrow
    /// `text[..bytes_consumed]` directly.
    pub generated: Option<String>,
    /// Color in effect in the underlying stream at the end of this line
    /// (ignoring any highlight override).
    pub final_user_color: Attr,
    /// Color actually displayed at the end of this line (reflects an
    /// in-progress highlight, if any).
    pub final_display_color: Attr,
    /// Cells of an active match that continue past the end of this line.
    pub chars_remaining_in_match: usize,
    /// Whether the renderer must emit an explicit newline after this line.
    pub explicit_newline_required: bool,
    /// Number of cells actually consumed (≤ `max_cells`).
    pub cells_consumed: usize,
}

/// Scan one logical line out of `text`, stopping at `max_cells` cells.
///
/// `initial_display_color`/`initial_user_color`/`carry_chars_remaining_in_match`
/// carry state across logical-line boundaries within the same physical
/// line (spec.md §3's logical-line fields of the same names).
pub fn logical_line_length(
    text: &str,
    max_cells: usize,
    initial_display_color: Attr,
    initial_user_color: Attr,
    carry_chars_remaining_in_match: usize,
    matches: &dyn MatchSource,
    auto_wrap: bool,
) -> ScanResult {
    let mut pos = 0usize;
    let mut cells = 0usize;
    let mut user_color = initial_user_color;
    let mut display_color = initial_display_color;
    let mut remaining_in_match = carry_chars_remaining_in_match;
    let mut generated: Option<String> = None;
    let mut flushed_to = 0usize;
    let mut cached_match: Option<(usize, usize, Attr)> = None;

    loop {
        // Consume a run of CSI escapes at the current position (zero cells).
        while pos < text.len() && text.as_bytes()[pos] == 0x1b {
            match parse_csi(&text[pos..]) {
                Some(len) => {
                    let esc = &text[pos..pos + len];
                    user_color = final_color_from_escape(user_color, esc);
                    if remaining_in_match == 0 {
                        display_color = user_color;
                    }
                    pos += len;
                }
                None => break,
            }
        }

        if cells >= max_cells || pos >= text.len() {
            break;
        }

        // Highlight boundary: only look for a new match when not already
        // inside one carried over from the previous logical line.
        if remaining_in_match == 0 {
            if cached_match.is_none_or(|(s, _, _)| s < pos) {
                cached_match = matches.next_match(text, pos);
            }
            if let Some((s, e, color)) = cached_match {
                if s == pos {
                    let buf = generated.get_or_insert_with(String::new);
                    buf.push_str(&text[flushed_to..pos]);
                    flushed_to = pos;
                    buf.push_str(&string_to_text_attribute(color));
                    display_color = color;
                    remaining_in_match = text[s..e].chars().count();
                }
            }
        }

        // Consume exactly one printable cell.
        let ch_len = text[pos..].chars().next().expect("pos < text.len()").len_utf8();
        pos += ch_len;
        cells += 1;

        if remaining_in_match > 0 {
            remaining_in_match -= 1;
            if remaining_in_match == 0 {
                let buf = generated.get_or_insert_with(String::new);
                buf.push_str(&text[flushed_to..pos]);
                flushed_to = pos;
                buf.push_str(&string_to_text_attribute(user_color));
                display_color = user_color;
            }
        }
    }

    if let Some(buf) = generated.as_mut() {
        buf.push_str(&text[flushed_to..pos]);
    }

    ScanResult {
        bytes_consumed: pos,
        generated,
        final_user_color: user_color,
        final_display_color: display_color,
        chars_remaining_in_match: remaining_in_match,
        explicit_newline_required: !(cells == max_cells && auto_wrap),
        cells_consumed: cells,
    }
}

/// Clip `text` (already-generated logical-line text, escapes and all) to
/// cell range `[left, right)`, for selection copy (spec.md §4.F: "clip
/// each logical line to `[left, right]` cell range using 4.B"). Returns
/// the clipped slice plus the color in effect at column `left`, needed
/// for the VT export's per-line leading escape.
pub fn clip_to_cell_range(text: &str, left: usize, right: usize, initial_color: Attr) -> (&str, Attr) {
    let skip = logical_line_length(text, left, initial_color, initial_color, 0, &NoMatches, false);
    let width = right.saturating_sub(left);
    let rest = &text[skip.bytes_consumed..];
    let capture = logical_line_length(rest, width, skip.final_user_color, skip.final_user_color, 0, &NoMatches, false);
    (&rest[..capture.bytes_consumed], skip.final_user_color)
}

/// Parse one CSI sequence (`ESC '[' (digit|';')* final_letter`) at the
/// start of `s`, returning its byte length (including `ESC` and the final
/// letter). `None` if `s` doesn't start with `ESC '['`, or the sequence is
/// truncated/malformed (no final letter found) — per spec.md §7, such
/// bytes are then treated literally by the caller rather than erroring.
pub fn parse_csi(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != 0x1b || bytes[1] != b'[' {
        return None;
    }
    let mut i = 2;
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b';') {
        i += 1;
    }
    if i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        Some(i + 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::color::*;

    fn scan(text: &str, max_cells: usize) -> ScanResult {
        logical_line_length(text, max_cells, Attr::DEFAULT, Attr::DEFAULT, 0, &NoMatches, true)
    }

    // ── S1 ────────────────────────────────────────────────────────────────

    #[test]
    fn s1_hello_world_fits_one_line() {
        let r = scan("hello world", 80);
        assert_eq!(r.bytes_consumed, 11);
        assert_eq!(r.cells_consumed, 11);
        assert!(r.generated.is_none());
        assert!(r.explicit_newline_required); // 11 < 80
    }

    // ── S2 ────────────────────────────────────────────────────────────────

    #[test]
    fn s2_long_line_wraps_into_three_chunks_autowrap_on() {
        let text = "A".repeat(200);
        let r1 = logical_line_length(&text, 80, Attr::DEFAULT, Attr::DEFAULT, 0, &NoMatches, true);
        assert_eq!(r1.cells_consumed, 80);
        assert!(!r1.explicit_newline_required); // fills the row, auto-wrap on
        let r2 = logical_line_length(&text[r1.bytes_consumed..], 80, r1.final_display_color, r1.final_user_color, 0, &NoMatches, true);
        assert_eq!(r2.cells_consumed, 80);
        let r3 = logical_line_length(&text[r1.bytes_consumed + r2.bytes_consumed..], 80, r2.final_display_color, r2.final_user_color, 0, &NoMatches, true);
        assert_eq!(r3.cells_consumed, 40);
        assert!(r3.explicit_newline_required); // ran out of input, not a full row
    }

    #[test]
    fn s2_no_autowrap_requires_explicit_newline_even_when_full() {
        let text = "A".repeat(80);
        let r = logical_line_length(&text, 80, Attr::DEFAULT, Attr::DEFAULT, 0, &NoMatches, false);
        assert!(r.explicit_newline_required);
    }

    // ── S3 ────────────────────────────────────────────────────────────────

    #[test]
    fn s3_escape_consumes_zero_cells() {
        let text = "A\x1b[31mB\x1b[0mC";
        let r = scan(text, 80);
        assert_eq!(r.bytes_consumed, text.len());
        assert_eq!(r.cells_consumed, 3);
        assert_eq!(r.final_user_color, Attr::DEFAULT);
        assert!(r.generated.is_none()); // no highlight injected, just source escapes
    }

    // ── Highlight injection ──────────────────────────────────────────────

    struct OneMatch {
        start: usize,
        end: usize,
        color: Attr,
    }
    impl MatchSource for OneMatch {
        fn next_match(&self, _text: &str, from: usize) -> Option<(usize, usize, Attr)> {
            if from <= self.start {
                Some((self.start, self.end, self.color))
            } else {
                None
            }
        }
    }

    #[test]
    fn highlight_injects_escape_and_restores() {
        // "xfoobary" — match "foo" at [1,4)
        let text = "xfoobary";
        let m = OneMatch { start: 1, end: 4, color: Attr::from_fg_bg(RED, 0) };
        let r = logical_line_length(text, 80, Attr::DEFAULT, Attr::DEFAULT, 0, &m, true);
        let buf = r.generated.expect("highlight requires a generated buffer");
        // x <red-on> foo <restore> bary
        assert!(buf.starts_with('x'));
        assert!(buf.contains(&string_to_text_attribute(Attr::from_fg_bg(RED, 0))));
        assert!(buf.ends_with("bary"));
        assert_eq!(r.final_display_color, Attr::DEFAULT);
        assert_eq!(r.chars_remaining_in_match, 0);
    }

    #[test]
    fn match_spanning_line_boundary_carries_remaining() {
        let text = "abcdef";
        // match covers [2, 6) — longer than the 3-cell budget we give this line
        let m = OneMatch { start: 2, end: 6, color: Attr::from_fg_bg(GREEN, 0) };
        let r = logical_line_length(text, 3, Attr::DEFAULT, Attr::DEFAULT, 0, &m, true);
        assert_eq!(r.cells_consumed, 3);
        assert_eq!(r.final_display_color, Attr::from_fg_bg(GREEN, 0));
        assert_eq!(r.final_user_color, Attr::DEFAULT);
        assert_eq!(r.chars_remaining_in_match, 3); // 4 chars in match ("cdef"), 1 consumed this line (index 2)

        // Next logical line starts mid-match.
        let r2 = logical_line_length(
            &text[r.bytes_consumed..],
            80,
            r.final_display_color,
            r.final_user_color,
            r.chars_remaining_in_match,
            &NoMatches,
            true,
        );
        assert_eq!(r2.chars_remaining_in_match, 0);
        assert_eq!(r2.final_display_color, Attr::DEFAULT);
    }

    // ── Edge cases ────────────────────────────────────────────────────────

    #[test]
    fn empty_slice_consumes_nothing() {
        let r = scan("", 80);
        assert_eq!(r.bytes_consumed, 0);
        assert_eq!(r.cells_consumed, 0);
    }

    #[test]
    fn csi_at_exact_cell_boundary_belongs_to_current_line() {
        let text = "01234\x1b[31m56789";
        let r = logical_line_length(text, 5, Attr::DEFAULT, Attr::DEFAULT, 0, &NoMatches, true);
        // The escape sits right after cell 5; it must be consumed now, not deferred.
        assert_eq!(r.bytes_consumed, "01234\x1b[31m".len());
        assert_eq!(r.final_user_color.fg(), Some(RED));
    }

    #[test]
    fn malformed_escape_treated_as_literal_cell() {
        let text = "\x1bnotanescape";
        let r = scan(text, 80);
        assert_eq!(r.cells_consumed, text.chars().count());
    }

    #[test]
    fn parse_csi_rejects_non_escape() {
        assert_eq!(parse_csi("hello"), None);
        assert_eq!(parse_csi("\x1b["), None);
        assert_eq!(parse_csi("\x1b[31m"), Some(5));
    }

    // ── S6 ────────────────────────────────────────────────────────────────

    #[test]
    fn s6_clip_to_cell_range_extracts_middle_columns() {
        let (clipped, color) = clip_to_cell_range("abcdefgh", 2, 5, Attr::DEFAULT);
        assert_eq!(clipped, "cde");
        assert_eq!(color, Attr::DEFAULT);
    }

    #[test]
    fn clip_to_cell_range_reports_color_in_effect_at_left() {
        // Escape sits strictly inside the skipped prefix, so it's absorbed
        // into the reported "color at column left" rather than re-emitted.
        let text = "a\x1b[31mbcdefgh";
        let (clipped, color) = clip_to_cell_range(text, 2, 5, Attr::DEFAULT);
        assert_eq!(clipped, "cde");
        assert_eq!(color.fg(), Some(RED));
    }

    #[test]
    fn multibyte_codepoint_counts_as_one_cell() {
        let r = scan("héllo", 80);
        assert_eq!(r.cells_consumed, 5);
        assert_eq!(r.bytes_consumed, "héllo".len());
    }
}
