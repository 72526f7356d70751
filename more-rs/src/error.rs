//! Error taxonomy — spec.md §7.
//!
//! Hand-rolled enums with manual `Display`/`std::error::Error` impls, in
//! the style of the teacher's `pattern.rs::PatternError`: no
//! `thiserror`/`anyhow`.

use std::fmt;
use std::io;

/// Source open/read failure. Reported by the ingester before it
/// terminates; does not disturb interactive display if any lines were
/// already produced.
#[derive(Debug)]
pub enum IngestError {
    Open { path: String, source: io::Error },
    Read { path: String, source: io::Error },
    /// A path pattern named a directory and `-b` (basic enumeration) was given.
    IsADirectory { path: String },
    /// No path patterns were given and stdin is a TTY — nothing to page.
    NoInput,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Open { path, source } => write!(f, "{path}: cannot open: {source}"),
            IngestError::Read { path, source } => write!(f, "{path}: read error: {source}"),
            IngestError::IsADirectory { path } => write!(f, "{path}: is a directory"),
            IngestError::NoInput => write!(f, "no input: stdin is a terminal and no files were given"),
        }
    }
}

impl std::error::Error for IngestError {}

/// Surfaced as `out_of_memory` on the viewport. The current operation
/// aborts; previously displayed state remains valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationError;

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "allocation failure while generating logical lines")
    }
}

impl std::error::Error for AllocationError {}

/// Fatal console condition (e.g. stdout is not a TTY at startup). The
/// program exits with a non-zero code before entering the main loop.
#[derive(Debug)]
pub enum ConsoleError {
    NotATerminal,
    Io(io::Error),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::NotATerminal => write!(f, "stdout is not an interactive console"),
            ConsoleError::Io(e) => write!(f, "console I/O error: {e}"),
        }
    }
}

impl std::error::Error for ConsoleError {}

impl From<io::Error> for ConsoleError {
    fn from(e: io::Error) -> Self {
        ConsoleError::Io(e)
    }
}

/// Malformed VT escape sequences are treated as literal bytes after the
/// initial two bytes; no error is ever surfaced from the scanner itself.
/// This type exists only so call sites that want to record the condition
/// (e.g. for diagnostics) have something to name — the scanner never
/// returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolError;

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed VT escape sequence")
    }
}

impl std::error::Error for ProtocolError {}

/// Copy operation silently failed; the selection remains active. Recorded
/// on the status line only on an explicit user copy, never to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardError;

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clipboard publish failed")
    }
}

impl std::error::Error for ClipboardError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_error_display() {
        let e = IngestError::IsADirectory { path: "foo/".into() };
        assert_eq!(e.to_string(), "foo/: is a directory");
    }

    #[test]
    fn console_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let e: ConsoleError = io_err.into();
        assert!(e.to_string().contains("boom"));
    }
}
