//! Logical-line generator — spec.md §4.C.
//!
//! Splits a physical line into viewport-width logical lines, injecting
//! highlight escapes for search matches and tracking carry-over match
//! state across lines. Built directly on [`crate::vtscan::logical_line_length`]
//! the way the teacher's `screen.rs` wrap loop repeatedly measures and
//! slices a line until it's consumed.

use std::borrow::Cow;
use std::sync::Arc;

use crate::attr::Attr;
use crate::linestore::PhysicalLine;
use crate::vtscan::{logical_line_length, MatchSource};

/// One viewport row's worth of text derived from a physical line.
pub struct LogicalLine<'a> {
    pub physical_line: Arc<PhysicalLine>,
    pub logical_index: usize,
    pub char_offset: usize,
    pub initial_user_color: Attr,
    pub initial_display_color: Attr,
    pub chars_remaining_in_match: usize,
    pub more_logical_lines: bool,
    pub explicit_newline_required: bool,
    pub text: Cow<'a, str>,
}

/// Iteratively invoke the VT scanner over `physical`'s remaining text
/// until `count` logical lines are produced or the line is exhausted,
/// starting at `first_logical_index`.
///
/// Borrows `physical.contents()` for the lifetime of the input
/// reference: a logical line with no injected highlight is a zero-copy
/// slice of the physical line's own backing memory (no allocation); one
/// with an injected highlight escape owns a freshly synthesised buffer.
pub fn generate<'a>(
    physical: &'a Arc<PhysicalLine>,
    first_logical_index: usize,
    count: usize,
    width: usize,
    matches: &dyn MatchSource,
    auto_wrap: bool,
) -> Vec<LogicalLine<'a>> {
    let contents = physical.contents();
    let mut offset = 0usize;
    let mut user_color = physical.initial_color();
    let mut display_color = physical.initial_color();
    let mut remaining_in_match = 0usize;
    let mut logical_index = 0usize;
    let mut out = Vec::with_capacity(count.min(64));

    // Empty physical line yields exactly one empty logical line.
    if contents.is_empty() {
        if first_logical_index == 0 && count > 0 {
            out.push(LogicalLine {
                physical_line: physical.clone(),
                logical_index: 0,
                char_offset: 0,
                initial_user_color: user_color,
                initial_display_color: display_color,
                chars_remaining_in_match: 0,
                more_logical_lines: false,
                explicit_newline_required: true,
                text: Cow::Borrowed(""),
            });
        }
        return out;
    }

    loop {
        if offset >= contents.len() || out.len() >= count {
            break;
        }
        let slice = &contents[offset..];
        let r = logical_line_length(slice, width, display_color, user_color, remaining_in_match, matches, auto_wrap);

        let more_logical_lines = offset + r.bytes_consumed < contents.len();

        if logical_index >= first_logical_index {
            let text: Cow<'a, str> = match r.generated {
                Some(s) => Cow::Owned(s),
                None => Cow::Borrowed(&slice[..r.bytes_consumed]),
            };
            out.push(LogicalLine {
                physical_line: physical.clone(),
                logical_index,
                char_offset: offset,
                initial_user_color: user_color,
                initial_display_color: display_color,
                chars_remaining_in_match: remaining_in_match,
                more_logical_lines,
                explicit_newline_required: r.explicit_newline_required,
                text,
            });
        }

        offset += r.bytes_consumed;
        user_color = r.final_user_color;
        display_color = r.final_display_color;
        remaining_in_match = r.chars_remaining_in_match;
        logical_index += 1;

        if r.bytes_consumed == 0 {
            // Scanner made no progress (e.g. width == 0); avoid looping forever.
            break;
        }
    }

    out
}

/// Count logical lines on `physical` without generating any buffers —
/// used to jump within a physical line and to advance N logical lines
/// through the store efficiently.
pub fn count_logical_lines_on_physical_line(physical: &Arc<PhysicalLine>, width: usize, matches: &dyn MatchSource, auto_wrap: bool) -> usize {
    let contents = physical.contents();
    if contents.is_empty() {
        return 1;
    }
    let mut offset = 0usize;
    let mut user_color = physical.initial_color();
    let mut display_color = physical.initial_color();
    let mut remaining_in_match = 0usize;
    let mut count = 0usize;

    while offset < contents.len() {
        let r = logical_line_length(&contents[offset..], width, display_color, user_color, remaining_in_match, matches, auto_wrap);
        if r.bytes_consumed == 0 {
            break;
        }
        offset += r.bytes_consumed;
        user_color = r.final_user_color;
        display_color = r.final_display_color;
        remaining_in_match = r.chars_remaining_in_match;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SharedLine;
    use crate::linestore::LineStore;
    use crate::vtscan::NoMatches;

    fn physical(store: &LineStore, text: &str) -> Arc<PhysicalLine> {
        let mem: Arc<str> = Arc::from(text);
        store.append(SharedLine::whole(mem), Attr::DEFAULT)
    }

    #[test]
    fn empty_line_yields_one_empty_logical_line() {
        let store = LineStore::new();
        let p = physical(&store, "");
        let lines = generate(&p, 0, 10, 80, &NoMatches, true);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "");
        assert!(!lines[0].more_logical_lines);
    }

    #[test]
    fn invariant_1_partition_with_no_gaps_or_overlap() {
        let store = LineStore::new();
        let p = physical(&store, &"A".repeat(200));
        let n = count_logical_lines_on_physical_line(&p, 80, &NoMatches, true);
        assert_eq!(n, 3);
        let lines = generate(&p, 0, n, 80, &NoMatches, true);
        assert_eq!(lines.len(), 3);
        let mut expected_offset = 0;
        let mut total_text = String::new();
        for line in &lines {
            assert_eq!(line.char_offset, expected_offset);
            expected_offset += line.text.len();
            total_text.push_str(&line.text);
        }
        assert_eq!(expected_offset, p.contents().len());
        assert_eq!(total_text, p.contents());
    }

    #[test]
    fn s2_wrap_widths_and_newline_flags() {
        let store = LineStore::new();
        let p = physical(&store, &"A".repeat(200));
        let lines = generate(&p, 0, 3, 80, &NoMatches, true);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text.len(), 80);
        assert_eq!(lines[1].text.len(), 80);
        assert_eq!(lines[2].text.len(), 40);
        assert!(!lines[0].explicit_newline_required);
        assert!(!lines[1].explicit_newline_required);
        assert!(lines[2].explicit_newline_required);
        assert!(lines[0].more_logical_lines);
        assert!(lines[1].more_logical_lines);
        assert!(!lines[2].more_logical_lines);
    }

    #[test]
    fn first_logical_index_skips_earlier_lines_but_preserves_carry_state() {
        let store = LineStore::new();
        let p = physical(&store, &"A".repeat(200));
        let from_zero = generate(&p, 0, 3, 80, &NoMatches, true);
        let from_two = generate(&p, 2, 1, 80, &NoMatches, true);
        assert_eq!(from_two.len(), 1);
        assert_eq!(from_two[0].char_offset, from_zero[2].char_offset);
        assert_eq!(from_two[0].text, from_zero[2].text);
    }

    #[test]
    fn chars_remaining_zero_when_user_and_display_color_match() {
        let store = LineStore::new();
        let p = physical(&store, "plain text, no highlight");
        let lines = generate(&p, 0, 5, 80, &NoMatches, true);
        for line in &lines {
            assert_eq!(line.initial_user_color, line.initial_display_color);
            assert_eq!(line.chars_remaining_in_match, 0);
        }
    }
}
