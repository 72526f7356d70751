//! Clipboard sink — spec.md §6 "`publish(plain, html)`".
//!
//! A trait so `selection.rs`'s copy path stays testable without a real OS
//! clipboard, backed by `arboard` the way the teacher's `net.rs` wraps its
//! transport behind a trait for the same reason.

use crate::error::ClipboardError;

/// Publishes a completed selection copy to an external clipboard.
pub trait ClipboardSink {
    /// Offer `plain` and `html` as alternative representations of the
    /// same copy (spec.md §6). A `ClipboardError` per spec.md §7 is
    /// silent to the caller beyond the `Result` — the viewport logs it to
    /// the status line only, never to stderr.
    fn publish(&mut self, plain: &str, html: &str) -> Result<(), ClipboardError>;
}

impl ClipboardSink for Box<dyn ClipboardSink> {
    fn publish(&mut self, plain: &str, html: &str) -> Result<(), ClipboardError> {
        (**self).publish(plain, html)
    }
}

/// `arboard`-backed clipboard. Most platforms accept only one "primary"
/// format per `set_*` call, so `publish` prefers HTML (with `plain` as its
/// alt-text fallback within the same clipboard entry) and falls back to a
/// plain `set_text` when the platform clipboard has no HTML support.
pub struct ArboardClipboard {
    inner: arboard::Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner = arboard::Clipboard::new().map_err(|_| ClipboardError)?;
        Ok(Self { inner })
    }
}

impl ClipboardSink for ArboardClipboard {
    fn publish(&mut self, plain: &str, html: &str) -> Result<(), ClipboardError> {
        if self.inner.set_html(html, Some(plain)).is_ok() {
            return Ok(());
        }
        self.inner.set_text(plain).map_err(|_| ClipboardError)
    }
}

/// Stand-in for hosts with no OS clipboard (e.g. no display server). Every
/// publish "fails" silently, the same outcome spec.md §7 already specifies
/// for an `ArboardClipboard` whose underlying `set_*` call fails — this
/// keeps clipboard unavailability from being a fatal startup condition.
pub struct NullClipboard;

impl ClipboardSink for NullClipboard {
    fn publish(&mut self, _plain: &str, _html: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError)
    }
}
