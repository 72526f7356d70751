//! Property tests over the logical-line partition invariant (spec.md
//! invariant 1) and the `Attr` <-> escape-sequence round trip, run against
//! arbitrary inputs rather than the fixed cases already covered inline in
//! `logical.rs`/`attr.rs`.

use std::sync::Arc;

use proptest::prelude::*;

use morepager::attr::{final_color_from_escape, string_to_text_attribute, Attr};
use morepager::buffer::SharedLine;
use morepager::linestore::LineStore;
use morepager::logical::{count_logical_lines_on_physical_line, generate};
use morepager::vtscan::NoMatches;

/// Printable ASCII only: the wrap logic measures width per byte/char, not
/// grapheme clusters, so multi-byte UTF-8 would make the expected logical
/// line count harder to state without duplicating the scanner's own logic.
fn plain_text() -> impl Strategy<Value = String> {
    "[ -~]{0,300}"
}

proptest! {
    /// Every logical line generated for a physical line, concatenated back
    /// together, reproduces the physical line exactly — no gaps, no
    /// overlap, no dropped bytes (spec.md invariant 1), for arbitrary text
    /// and viewport widths.
    #[test]
    fn partition_has_no_gaps_or_overlap(text in plain_text(), width in 1usize..120, auto_wrap in any::<bool>()) {
        let store = LineStore::new();
        let mem: Arc<str> = Arc::from(text.clone());
        let physical = store.append(SharedLine::whole(mem), Attr::DEFAULT);

        let n = count_logical_lines_on_physical_line(&physical, width, &NoMatches, auto_wrap);
        let lines = generate(&physical, 0, n, width, &NoMatches, auto_wrap);

        let mut expected_offset = 0usize;
        let mut reassembled = String::new();
        for line in &lines {
            prop_assert_eq!(line.char_offset, expected_offset);
            expected_offset += line.text.len();
            reassembled.push_str(&line.text);
        }
        prop_assert_eq!(expected_offset, physical.contents().len());
        prop_assert_eq!(reassembled, text);
    }

    /// `count_logical_lines_on_physical_line` and `generate` agree on how
    /// many logical lines a physical line produces.
    #[test]
    fn generate_produces_exactly_the_counted_number_of_lines(text in plain_text(), width in 1usize..120, auto_wrap in any::<bool>()) {
        let store = LineStore::new();
        let mem: Arc<str> = Arc::from(text);
        let physical = store.append(SharedLine::whole(mem), Attr::DEFAULT);

        let n = count_logical_lines_on_physical_line(&physical, width, &NoMatches, auto_wrap);
        let lines = generate(&physical, 0, n.max(1), width, &NoMatches, auto_wrap);
        prop_assert_eq!(lines.len(), n);
    }

    /// Every `Attr` in the 4-bit fg/bg palette round-trips through its SGR
    /// escape-sequence rendering.
    #[test]
    fn attr_roundtrips_through_escape_sequence(fg in 0u8..16, bg in 0u8..16) {
        let attr = Attr::from_fg_bg(fg, bg);
        let escape = string_to_text_attribute(attr);
        let back = final_color_from_escape(Attr::DEFAULT, &escape);
        prop_assert_eq!(back.fg(), attr.fg());
        prop_assert_eq!(back.bg(), attr.bg());
    }
}
