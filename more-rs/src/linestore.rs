//! Line store — spec.md §4.A. Owns the ordered physical line list and a
//! parallel filtered list, shared between the ingest task and the
//! viewport task under a mutex (generalizes the teacher's `Screen` ring
//! buffer + trim/rewrap bookkeeping from a bounded ring to an append-only
//! list with a filtered subsequence).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::attr::Attr;
use crate::buffer::SharedLine;

/// One line of input text as produced by the ingester, immutable once
/// published. Append-only: `line_number` is assigned once and never
/// changes; `filtered_line_number` is the only field mutated after
/// publication, and only while the store's mutex is held.
pub struct PhysicalLine {
    shared: SharedLine,
    line_number: u64,
    initial_color: Attr,
    /// -1 when this line is not currently in the filtered list.
    filtered_line_number: AtomicI64,
}

impl PhysicalLine {
    /// This line's text, with no trailing newline.
    pub fn contents(&self) -> &str {
        self.shared.contents()
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// The VT color in effect at the start of this line.
    pub fn initial_color(&self) -> Attr {
        self.initial_color
    }

    /// Position within the filtered list, if this line currently matches
    /// the active filter.
    pub fn filtered_line_number(&self) -> Option<u64> {
        let v = self.filtered_line_number.load(Ordering::Acquire);
        (v >= 0).then_some(v as u64)
    }
}

struct Inner {
    lines: Vec<Arc<PhysicalLine>>,
    filtered: Vec<Arc<PhysicalLine>>,
    ingest_done: bool,
}

/// Thread-safe append, sequential read (spec.md §4.A).
pub struct LineStore {
    inner: Mutex<Inner>,
    /// Auto-reset: raised after each append. Missed edges are harmless —
    /// the viewport polls `total_count`/`filtered_count` on every wake.
    data_available: Notify,
}

impl Default for LineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LineStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { lines: Vec::new(), filtered: Vec::new(), ingest_done: false }),
            data_available: Notify::new(),
        }
    }

    /// Append one physical line, assigning the next `line_number` and
    /// publishing it at the tail under the store mutex. Broadcasts the
    /// new-data event.
    pub fn append(&self, shared: SharedLine, initial_color: Attr) -> Arc<PhysicalLine> {
        let mut inner = self.inner.lock().unwrap();
        let line_number = inner.lines.len() as u64 + 1;
        let line = Arc::new(PhysicalLine {
            shared,
            line_number,
            initial_color,
            filtered_line_number: AtomicI64::new(-1),
        });
        inner.lines.push(line.clone());
        drop(inner);
        self.data_available.notify_one();
        line
    }

    /// Resolve once after the next append (or immediately, if one
    /// happened since the last call and nobody consumed it yet).
    pub async fn wait_for_data(&self) {
        self.data_available.notified().await;
    }

    pub fn mark_ingest_done(&self) {
        self.inner.lock().unwrap().ingest_done = true;
        self.data_available.notify_one();
    }

    pub fn ingest_done(&self) -> bool {
        self.inner.lock().unwrap().ingest_done
    }

    pub fn total_count(&self) -> usize {
        self.inner.lock().unwrap().lines.len()
    }

    pub fn filtered_count(&self) -> usize {
        self.inner.lock().unwrap().filtered.len()
    }

    /// The line after `after` in total order, or the first line when
    /// `after` is `None`.
    pub fn next(&self, after: Option<&Arc<PhysicalLine>>) -> Option<Arc<PhysicalLine>> {
        let inner = self.inner.lock().unwrap();
        Self::next_in(&inner.lines, after)
    }

    /// The line before `before` in total order, or the last line when
    /// `before` is `None`.
    pub fn prev(&self, before: Option<&Arc<PhysicalLine>>) -> Option<Arc<PhysicalLine>> {
        let inner = self.inner.lock().unwrap();
        Self::prev_in(&inner.lines, before)
    }

    pub fn next_filtered(&self, after: Option<&Arc<PhysicalLine>>) -> Option<Arc<PhysicalLine>> {
        let inner = self.inner.lock().unwrap();
        Self::next_in(&inner.filtered, after)
    }

    pub fn prev_filtered(&self, before: Option<&Arc<PhysicalLine>>) -> Option<Arc<PhysicalLine>> {
        let inner = self.inner.lock().unwrap();
        Self::prev_in(&inner.filtered, before)
    }

    fn next_in(list: &[Arc<PhysicalLine>], after: Option<&Arc<PhysicalLine>>) -> Option<Arc<PhysicalLine>> {
        match after {
            None => list.first().cloned(),
            Some(cur) => {
                let idx = list.iter().position(|l| Arc::ptr_eq(l, cur))?;
                list.get(idx + 1).cloned()
            }
        }
    }

    fn prev_in(list: &[Arc<PhysicalLine>], before: Option<&Arc<PhysicalLine>>) -> Option<Arc<PhysicalLine>> {
        match before {
            None => list.last().cloned(),
            Some(cur) => {
                let idx = list.iter().position(|l| Arc::ptr_eq(l, cur))?;
                idx.checked_sub(1).and_then(|i| list.get(i).cloned())
            }
        }
    }

    /// Walk the total list, adjust filtered membership via `predicate`,
    /// renumber `filtered_line_number`, and return the surviving line
    /// nearest `anchor` (by `line_number` distance; ties favor the line
    /// at or after the anchor).
    pub fn recompute_filter(
        &self,
        predicate: impl Fn(&str) -> bool,
        anchor: Option<&Arc<PhysicalLine>>,
    ) -> Option<Arc<PhysicalLine>> {
        let mut inner = self.inner.lock().unwrap();
        inner.filtered.clear();
        for line in inner.lines.clone() {
            if predicate(line.contents()) {
                let n = inner.filtered.len() as u64 + 1;
                line.filtered_line_number.store(n as i64, Ordering::Release);
                inner.filtered.push(line);
            } else {
                line.filtered_line_number.store(-1, Ordering::Release);
            }
        }
        let anchor = anchor?;
        inner
            .filtered
            .iter()
            .min_by_key(|l| {
                let ln = l.line_number();
                let an = anchor.line_number();
                let dist = ln.abs_diff(an);
                // Prefer the line at-or-after the anchor on ties.
                (dist, ln < an)
            })
            .cloned()
    }
}
