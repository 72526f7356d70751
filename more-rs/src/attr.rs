//! Legacy-console text attribute and CSI SGR semantics.
//!
//! Corresponds to spec.md §4.B's "8-bit attribute (4 bits foreground, 4
//! bits background)". [`Attr`] packs style bits and a 16-color palette
//! index for foreground/background, matching classic Windows console
//! attribute byte layout rather than full ANSI 256/24-bit color, since
//! that is what the VT scanner's cell-accurate contract assumes.

use std::fmt;

/// A display attribute: 4-bit foreground + 4-bit background color plus a
/// reverse-video flag, or the sentinel "unset" value.
///
/// Foreground/background color indices are 0-7 (the eight base colors);
/// bit 3 of each nibble is the bright/intense flag, matching SGR 90-97 /
/// 100-107 and SGR 1 (bold → foreground intensity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr(u16);

impl Attr {
    const FG_MASK: u16 = 0x000f;
    const BG_SHIFT: u16 = 4;
    const BG_MASK: u16 = 0x00f0;
    const REVERSE: u16 = 0x0100;
    /// Set when this value was constructed from an explicit fg/bg pair,
    /// as opposed to [`Attr::DEFAULT`]'s "inherit the console default" sentinel.
    const EXPLICIT: u16 = 0x0200;
    /// SGR 1 (bold/intensity), tracked independent of the fg nibble so a
    /// later plain `30-37` color code doesn't silently clear it — matches
    /// how real consoles keep "bold" and "color" as separate toggles.
    const BOLD: u16 = 0x0400;

    /// The configured default attribute (SGR 0 resets to this).
    pub const DEFAULT: Self = Self(0);

    /// Build an attribute with explicit foreground/background color indices.
    ///
    /// `fg`/`bg` are 0-7; pass `fg | 8` for the bright variant.
    #[inline]
    pub const fn from_fg_bg(fg: u8, bg: u8) -> Self {
        Self(Self::EXPLICIT | (fg as u16 & Self::FG_MASK) | ((bg as u16) << Self::BG_SHIFT & Self::BG_MASK))
    }

    /// Foreground color index (0-15), or `None` if this is [`Attr::DEFAULT`].
    /// The bright bit is set if either the color itself is a bright variant
    /// or SGR 1 (bold) is in effect.
    #[inline]
    pub fn fg(self) -> Option<u8> {
        (self.0 & Self::EXPLICIT != 0).then(|| {
            let base = (self.0 & Self::FG_MASK) as u8;
            if self.0 & Self::BOLD != 0 { base | 0x8 } else { base }
        })
    }

    /// Background color index (0-15), or `None` if this is [`Attr::DEFAULT`].
    #[inline]
    pub fn bg(self) -> Option<u8> {
        (self.0 & Self::EXPLICIT != 0).then(|| ((self.0 & Self::BG_MASK) >> Self::BG_SHIFT) as u8)
    }

    /// Whether fg/bg are swapped (SGR 7).
    #[inline]
    pub fn reversed(self) -> bool {
        self.0 & Self::REVERSE != 0
    }

    #[inline]
    fn with_fg(self, fg: u8) -> Self {
        Self(Self::EXPLICIT | (self.0 & !Self::FG_MASK) | (fg as u16 & Self::FG_MASK))
    }

    #[inline]
    fn with_bg(self, bg: u8) -> Self {
        Self(Self::EXPLICIT | (self.0 & !Self::BG_MASK) | (((bg as u16) << Self::BG_SHIFT) & Self::BG_MASK))
    }

    #[inline]
    fn with_reverse(self, on: bool) -> Self {
        if on {
            Self(self.0 | Self::REVERSE)
        } else {
            Self(self.0 & !Self::REVERSE)
        }
    }

    #[inline]
    fn bright_fg(self) -> Self {
        Self(self.0 | Self::EXPLICIT | Self::BOLD)
    }

    /// Effective foreground/background after applying [`Attr::reversed`].
    #[inline]
    pub fn effective_fg_bg(self) -> (u8, u8) {
        let fg = self.fg().unwrap_or(7);
        let bg = self.bg().unwrap_or(0);
        if self.reversed() { (bg, fg) } else { (fg, bg) }
    }
}

impl Default for Attr {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Apply a single parsed SGR parameter to `attr`, per spec.md §4.B's table.
/// Unrecognised parameters leave the attribute unchanged (protocol errors
/// in VT parsing are never surfaced — spec.md §7).
fn apply_sgr_param(attr: Attr, param: u32) -> Attr {
    match param {
        0 => Attr::DEFAULT,
        1 => attr.bright_fg(),
        7 => attr.with_reverse(true),
        27 => attr.with_reverse(false),
        30..=37 => attr.with_fg((param - 30) as u8),
        40..=47 => attr.with_bg((param - 40) as u8),
        90..=97 => attr.with_fg((param - 90) as u8 | 0x8),
        100..=107 => attr.with_bg((param - 100) as u8 | 0x8),
        39 => attr.with_fg(7),
        49 => attr.with_bg(0),
        _ => attr,
    }
}

/// Compute the attribute resulting from applying a CSI SGR escape sequence
/// (`ESC '[' params 'm'`) to `initial`.
///
/// `escape` is the full sequence including the leading `ESC` and the final
/// letter. Non-`m` final letters, and anything that isn't a well-formed CSI
/// sequence, leave `initial` unchanged (spec.md §7 ProtocolError: malformed
/// escapes are literal bytes, no error surfaced).
pub fn final_color_from_escape(initial: Attr, escape: &str) -> Attr {
    let Some(rest) = escape.strip_prefix("\x1b[") else { return initial };
    let Some(body) = rest.strip_suffix('m') else { return initial };
    if body.is_empty() {
        return Attr::DEFAULT;
    }
    let mut attr = initial;
    for part in body.split(';') {
        let Ok(n) = part.parse::<u32>() else { continue };
        attr = apply_sgr_param(attr, n);
    }
    attr
}

/// Render `attr` as the minimal CSI SGR sequence that reproduces it from
/// [`Attr::DEFAULT`] (used for clipboard VT export and round-trip tests).
pub fn string_to_text_attribute(attr: Attr) -> String {
    if attr == Attr::DEFAULT {
        return "\x1b[0m".to_owned();
    }
    let mut params = vec!["0".to_owned()];
    if let Some(fg) = attr.fg() {
        if fg & 0x8 != 0 {
            params.push(format!("{}", 90 + (fg & 0x7)));
        } else {
            params.push(format!("{}", 30 + fg));
        }
    }
    if let Some(bg) = attr.bg() {
        if bg & 0x8 != 0 {
            params.push(format!("{}", 100 + (bg & 0x7)));
        } else {
            params.push(format!("{}", 40 + bg));
        }
    }
    if attr.reversed() {
        params.push("7".to_owned());
    }
    format!("\x1b[{}m", params.join(";"))
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", string_to_text_attribute(*self))
    }
}

/// CSS color name for a 4-bit palette index, shared by `terminal.rs`'s
/// `Attr` → crossterm `ContentStyle` mapping and `selection.rs`'s
/// `Attr` → inline HTML `<span>` mapping, so both agree on one palette.
pub fn ansi_color_name(index: u8) -> &'static str {
    const NAMES: [&str; 16] = [
        "black", "maroon", "green", "olive", "navy", "purple", "teal", "silver", "gray", "red", "lime", "yellow", "blue", "fuchsia", "aqua",
        "white",
    ];
    NAMES[(index & 0x0f) as usize]
}

/// Standard 8-color palette indices (base, non-bright).
pub mod color {
    pub const BLACK: u8 = 0;
    pub const RED: u8 = 1;
    pub const GREEN: u8 = 2;
    pub const YELLOW: u8 = 3;
    pub const BLUE: u8 = 4;
    pub const MAGENTA: u8 = 5;
    pub const CYAN: u8 = 6;
    pub const WHITE: u8 = 7;
    pub const BRIGHT: u8 = 0x8;
}
