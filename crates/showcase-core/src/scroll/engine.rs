//! Frame-paced auto-scroll state machine.
//!
//! The scrolled content is rendered twice back to back, so advancing past half
//! of the scroll width is visually identical to wrapping back to the start.
//! The engine keeps its offset inside `[0, half)` whenever the width is known.
//!
//! ```text
//!            mount                pointer_enter
//!   Idle ───────────► AutoScrolling ◄──────────► Paused
//!     ▲                  ▲    │     pointer_leave   │
//!     │    pointer_up /  │    │ pointer_down        │ pointer_down
//!     │   pointer_leave  │    ▼ (container)         │ (container)
//!     │               Dragging ◄────────────────────┘
//!     └── unmount (from any state)
//! ```

use crate::config::ScrollConfig;
use tracing::debug;

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The scroll container itself; starts a drag.
    Container,
    /// A link or button inside the container; left to the element.
    Interactive,
}

/// Current mode of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollMode {
    Idle,
    AutoScrolling,
    Paused,
    Dragging {
        start_x: f64,
        scroll_left_at_start: f64,
    },
}

/// Auto-scroll state: offset, mode, and last frame time.
#[derive(Debug, Clone)]
pub struct ScrollEngine {
    offset: f64,
    mode: ScrollMode,
    last_frame_ms: Option<f64>,
    /// Last width seen by `frame`, used to wrap drag offsets.
    scroll_width: f64,
    speed_px_per_ms: f64,
}

impl Default for ScrollEngine {
    fn default() -> Self {
        Self::new(ScrollConfig::SPEED_PX_PER_MS)
    }
}

impl ScrollEngine {
    pub fn new(speed_px_per_ms: f64) -> Self {
        Self {
            offset: 0.0,
            mode: ScrollMode::Idle,
            last_frame_ms: None,
            scroll_width: 0.0,
            speed_px_per_ms,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.mode, ScrollMode::Dragging { .. })
    }

    /// Start auto-scrolling. No-op unless idle.
    pub fn mount(&mut self) {
        if self.mode == ScrollMode::Idle {
            self.last_frame_ms = None;
            self.set_mode(ScrollMode::AutoScrolling);
        }
    }

    /// Stop everything. Valid from any state.
    pub fn unmount(&mut self) {
        self.last_frame_ms = None;
        self.set_mode(ScrollMode::Idle);
    }

    pub fn pointer_enter(&mut self) {
        if self.mode == ScrollMode::AutoScrolling {
            self.set_mode(ScrollMode::Paused);
        }
    }

    /// Resume from a hover pause, or end a drag that left the container.
    pub fn pointer_leave(&mut self) {
        match self.mode {
            ScrollMode::Paused | ScrollMode::Dragging { .. } => {
                self.set_mode(ScrollMode::AutoScrolling)
            }
            _ => {}
        }
    }

    /// Begin a drag at `x` if the pointer went down on the container.
    pub fn pointer_down(&mut self, x: f64, target: PointerTarget) {
        if target == PointerTarget::Interactive {
            return;
        }
        if matches!(self.mode, ScrollMode::AutoScrolling | ScrollMode::Paused) {
            self.set_mode(ScrollMode::Dragging {
                start_x: x,
                scroll_left_at_start: self.offset,
            });
        }
    }

    /// Follow the pointer while dragging. Returns the new offset, if any.
    pub fn pointer_move(&mut self, x: f64) -> Option<f64> {
        let ScrollMode::Dragging {
            start_x,
            scroll_left_at_start,
        } = self.mode
        else {
            return None;
        };
        let raw = scroll_left_at_start - (x - start_x);
        let half = self.scroll_width / 2.0;
        self.offset = if half > 0.0 { raw.rem_euclid(half) } else { raw };
        Some(self.offset)
    }

    pub fn pointer_up(&mut self) {
        if self.is_dragging() {
            self.set_mode(ScrollMode::AutoScrolling);
        }
    }

    /// Advance one frame at `now_ms`.
    ///
    /// Returns the new offset when it changed, for the caller to apply to the
    /// surface. The frame timestamp is recorded in every mode so that resuming
    /// never jumps by the time spent paused.
    pub fn frame(&mut self, now_ms: f64, scroll_width: f64) -> Option<f64> {
        let elapsed = self
            .last_frame_ms
            .map(|last| (now_ms - last).max(0.0))
            .unwrap_or(0.0);
        self.last_frame_ms = Some(now_ms);
        self.scroll_width = scroll_width;

        if self.mode != ScrollMode::AutoScrolling {
            return None;
        }

        let mut offset = self.offset + self.speed_px_per_ms * elapsed;
        let half = scroll_width / 2.0;
        if half > 0.0 && offset >= half {
            offset %= half;
        }
        if offset == self.offset {
            return None;
        }
        self.offset = offset;
        Some(offset)
    }

    fn set_mode(&mut self, mode: ScrollMode) {
        if self.mode != mode {
            debug!("Scroll mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
}
