//! Ingester — spec.md §6's Ingester contract, §4.G AMBIENT's multi-file
//! concatenation supplement.
//!
//! Split the same way `net.rs` splits a transport from its protocol: the
//! pure, synchronously-testable part ([`LineSplitter`], [`enumerate_paths`],
//! [`end_of_line_color`]) carries no I/O handles; [`run`] is the thin async
//! wrapper that drives real files/stdin through it and appends to the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossterm::tty::IsTty;
use tokio::io::AsyncReadExt;

use crate::attr::Attr;
use crate::buffer::SharedLine;
use crate::concurrency::ShutdownEvent;
use crate::error::IngestError;
use crate::linestore::LineStore;
use crate::vtscan::{logical_line_length, NoMatches};

/// `-b`/`-s` from the CLI surface (spec.md §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumerateFlags {
    /// `-b`: bare `open()`, no directory expansion — a directory is an error.
    pub basic: bool,
    /// `-s`: directories expand recursively instead of one level deep.
    pub recursive: bool,
}

/// The color in effect at the end of `line`, given the color in effect at
/// its start — spec.md §6: "the ingester computes `initial_color` by
/// running the VT scanner over each line to produce the end-of-line color".
pub fn end_of_line_color(line: &str, initial: Attr) -> Attr {
    logical_line_length(line, usize::MAX, initial, initial, 0, &NoMatches, false).final_user_color
}

/// Expand `patterns` into a concrete, ordered file list (spec.md §4.G
/// AMBIENT: "the N files given on the command line, concatenated in
/// argument order"). A pattern naming a directory is expanded to its
/// immediate children unless `flags.recursive`, matching `find`'s default
/// vs. `-R`; `flags.basic` disables expansion entirely and a directory is
/// then an [`IngestError::IsADirectory`].
pub fn enumerate_paths(patterns: &[PathBuf], flags: EnumerateFlags) -> Result<Vec<PathBuf>, IngestError> {
    let mut out = Vec::new();
    for pattern in patterns {
        expand_one(pattern, flags, &mut out)?;
    }
    Ok(out)
}

fn expand_one(path: &Path, flags: EnumerateFlags, out: &mut Vec<PathBuf>) -> Result<(), IngestError> {
    let is_dir = path.is_dir();
    if is_dir && flags.basic {
        return Err(IngestError::IsADirectory { path: path.display().to_string() });
    }
    if !is_dir {
        out.push(path.to_path_buf());
        return Ok(());
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|source| IngestError::Open { path: path.display().to_string(), source })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    for entry in entries {
        if entry.is_dir() {
            if flags.recursive {
                expand_one(&entry, flags, out)?;
            }
            // Non-recursive: skip nested directories, matching `find`'s
            // depth-1 default.
        } else {
            out.push(entry);
        }
    }
    Ok(())
}

/// Accumulates raw bytes and splits them into complete lines, carrying the
/// VT color across the split the same way [`crate::linestore::PhysicalLine`]
/// expects (spec.md invariant 3).
pub struct LineSplitter {
    buf: Vec<u8>,
    color: Attr,
}

impl LineSplitter {
    pub fn new(initial_color: Attr) -> Self {
        Self { buf: Vec::new(), color: initial_color }
    }

    /// Feed newly-read bytes, returning each `(text, initial_color)` line
    /// completed by this call, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<(String, Attr)> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut raw: Vec<u8> = self.buf.drain(..=pos).collect();
            raw.pop(); // trailing '\n'
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let text = String::from_utf8_lossy(&raw).into_owned();
            let initial = self.color;
            self.color = end_of_line_color(&text, initial);
            out.push((text, initial));
        }
        out
    }

    /// The color a line appended right now would start with.
    pub fn current_color(&self) -> Attr {
        self.color
    }

    /// Flush a trailing partial line with no terminating newline (EOF).
    pub fn finish(self) -> Option<(String, Attr)> {
        if self.buf.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        Some((text, self.color))
    }
}

const READ_CHUNK: usize = 64 * 1024;

/// Read one source to completion, appending each line to `store` and
/// checking `shutdown` between reads (spec.md §4.G: "ingest must check it
/// between reads").
async fn ingest_reader<R: tokio::io::AsyncRead + Unpin>(
    mut reader: R,
    path: &str,
    splitter: &mut LineSplitter,
    store: &LineStore,
    shutdown: &ShutdownEvent,
) -> Result<(), IngestError> {
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        if shutdown.is_set() {
            return Ok(());
        }
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|source| IngestError::Read { path: path.to_owned(), source })?;
        if n == 0 {
            return Ok(());
        }
        for (text, color) in splitter.feed(&chunk[..n]) {
            let mem: Arc<str> = Arc::from(text);
            store.append(SharedLine::whole(mem), color);
        }
    }
}

/// Read stdin, or the concatenation of `paths` in order, appending
/// complete lines to `store` as they arrive. Always marks `store`'s ingest
/// done on return, even on error, so the viewport never waits forever.
pub async fn run(
    paths: &[String],
    flags: EnumerateFlags,
    store: Arc<LineStore>,
    shutdown: Arc<ShutdownEvent>,
) -> Result<(), IngestError> {
    let result = run_inner(paths, flags, &store, &shutdown).await;
    store.mark_ingest_done();
    result
}

async fn run_inner(
    paths: &[String],
    flags: EnumerateFlags,
    store: &LineStore,
    shutdown: &ShutdownEvent,
) -> Result<(), IngestError> {
    if paths.is_empty() {
        if std::io::stdin().is_tty() {
            return Err(IngestError::NoInput);
        }
        let mut splitter = LineSplitter::new(Attr::DEFAULT);
        ingest_reader(tokio::io::stdin(), "<stdin>", &mut splitter, store, shutdown).await?;
        if let Some((text, color)) = splitter.finish() {
            store.append(SharedLine::whole(Arc::from(text)), color);
        }
        return Ok(());
    }

    let patterns: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
    let files = enumerate_paths(&patterns, flags)?;
    let mut color = Attr::DEFAULT;
    for path in files {
        if shutdown.is_set() {
            break;
        }
        let path_str = path.display().to_string();
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| IngestError::Open { path: path_str.clone(), source })?;
        let mut splitter = LineSplitter::new(color);
        ingest_reader(file, &path_str, &mut splitter, store, shutdown).await?;
        color = splitter.current_color();
        if let Some((text, line_color)) = splitter.finish() {
            // A file boundary with no trailing newline still ends a line —
            // carry its color into the next file exactly as §4.G AMBIENT
            // specifies for multi-file concatenation.
            color = end_of_line_color(&text, line_color);
            store.append(SharedLine::whole(Arc::from(text)), line_color);
        }
    }
    Ok(())
}
