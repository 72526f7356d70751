//! Input source — spec.md §6: `key_down | mouse_down | mouse_up |
//! mouse_move | mouse_double_click | mouse_wheel | window_buffer_resize`,
//! with control-key mask, button mask, and cell coordinates.
//!
//! Split the same way `event_loop.rs` bridges a blocking stdin read into
//! the async event loop: a dedicated blocking task owns the real read
//! loop (`crossterm::event::read` has no async variant), forwarding
//! decoded events over an `mpsc::Sender`. [`decode_event`] and
//! [`DoubleClickTracker`] are the pure, synchronously-testable half —
//! they carry no I/O handles.

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A decoded input event, independent of crossterm's own types so the rest
/// of the crate never names `crossterm::event` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown { code: KeyCode, ctrl: bool },
    MouseDown { x: u16, y: u16, button: MouseButton },
    MouseUp { x: u16, y: u16, button: MouseButton },
    MouseMove { x: u16, y: u16 },
    MouseDoubleClick { x: u16, y: u16, button: MouseButton },
    /// `delta` is positive for scroll-up, negative for scroll-down.
    MouseWheel { x: u16, y: u16, delta: i32 },
    WindowResize { width: u16, height: u16 },
}

/// Two clicks of the same button within this long, at the same cell,
/// collapse into an [`InputEvent::MouseDoubleClick`].
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// Tracks the previous mouse-down to detect double clicks. `now` is passed
/// in explicitly rather than read from the clock, so the detector is
/// deterministically testable.
#[derive(Default)]
pub struct DoubleClickTracker {
    last: Option<(u16, u16, MouseButton, Instant)>,
}

impl DoubleClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mouse-down at `(x, y)` and return `true` if it completes a
    /// double click (same button, same cell, within [`DOUBLE_CLICK_WINDOW`]).
    pub fn record(&mut self, x: u16, y: u16, button: MouseButton, now: Instant) -> bool {
        let is_double = match self.last {
            Some((lx, ly, lb, lt)) => lx == x && ly == y && lb == button && now.saturating_duration_since(lt) <= DOUBLE_CLICK_WINDOW,
            None => false,
        };
        self.last = if is_double { None } else { Some((x, y, button, now)) };
        is_double
    }
}

/// Decode a single crossterm [`Event`] into an [`InputEvent`], tracking
/// double clicks through `tracker`. Key-repeat/release variants under
/// crossterm's "enhanced" keyboard protocol are ignored — only
/// [`KeyEventKind::Press`] is reported, matching spec.md's single
/// `key_down` event type.
pub fn decode_event(event: Event, tracker: &mut DoubleClickTracker, now: Instant) -> Option<InputEvent> {
    match event {
        Event::Key(key) => {
            if key.kind != KeyEventKind::Press {
                return None;
            }
            Some(InputEvent::KeyDown { code: key.code, ctrl: key.modifiers.contains(KeyModifiers::CONTROL) })
        }
        Event::Mouse(mouse) => {
            let x = mouse.column;
            let y = mouse.row;
            match mouse.kind {
                MouseEventKind::Down(button) => {
                    if tracker.record(x, y, button, now) {
                        Some(InputEvent::MouseDoubleClick { x, y, button })
                    } else {
                        Some(InputEvent::MouseDown { x, y, button })
                    }
                }
                MouseEventKind::Up(button) => Some(InputEvent::MouseUp { x, y, button }),
                MouseEventKind::Drag(_) | MouseEventKind::Moved => Some(InputEvent::MouseMove { x, y }),
                MouseEventKind::ScrollUp => Some(InputEvent::MouseWheel { x, y, delta: 1 }),
                MouseEventKind::ScrollDown => Some(InputEvent::MouseWheel { x, y, delta: -1 }),
                MouseEventKind::ScrollLeft | MouseEventKind::ScrollRight => None,
            }
        }
        Event::Resize(width, height) => Some(InputEvent::WindowResize { width, height }),
        Event::FocusGained | Event::FocusLost | Event::Paste(_) => None,
    }
}

/// Spawn the dedicated blocking reader, same shape as `event_loop.rs`'s
/// stdin thread: one task owns the real read loop for the process
/// lifetime; drop the receiver to let it exit on the next event.
pub fn spawn_reader(tx: mpsc::Sender<InputEvent>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut tracker = DoubleClickTracker::new();
        loop {
            let ev = match event::read() {
                Ok(ev) => ev,
                Err(_) => break,
            };
            if let Some(decoded) = decode_event(ev, &mut tracker, Instant::now()) {
                if tx.blocking_send(decoded).is_err() {
                    break;
                }
            }
        }
    })
}
