//! Frame loop that applies a [`ScrollEngine`] to a rendered surface.

use super::engine::{PointerTarget, ScrollEngine, ScrollMode};
use crate::cancel::CancellationToken;
use crate::config::ScrollConfig;
use crate::error::{Result, ShowcaseError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// The scrollable element being driven.
pub trait ScrollSurface: Send + Sync {
    /// Total scrollable width in pixels (both copies of the content).
    fn scroll_width(&self) -> f64;

    fn set_scroll_left(&self, offset: f64);
}

/// Shared engine plus the surface it drives.
///
/// Pointer handlers and the frame loop go through the same controller, so
/// event handling and frame steps never interleave mid-update.
pub struct ScrollController {
    engine: Mutex<ScrollEngine>,
    surface: Arc<dyn ScrollSurface>,
}

impl ScrollController {
    pub fn new(engine: ScrollEngine, surface: Arc<dyn ScrollSurface>) -> Self {
        Self {
            engine: Mutex::new(engine),
            surface,
        }
    }

    fn engine(&self) -> MutexGuard<'_, ScrollEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn offset(&self) -> f64 {
        self.engine().offset()
    }

    pub fn mode(&self) -> ScrollMode {
        self.engine().mode()
    }

    pub fn mount(&self) {
        self.engine().mount();
    }

    pub fn unmount(&self) {
        self.engine().unmount();
    }

    pub fn pointer_enter(&self) {
        self.engine().pointer_enter();
    }

    pub fn pointer_leave(&self) {
        self.engine().pointer_leave();
    }

    pub fn pointer_down(&self, x: f64, target: PointerTarget) {
        self.engine().pointer_down(x, target);
    }

    pub fn pointer_move(&self, x: f64) {
        let moved = self.engine().pointer_move(x);
        if let Some(offset) = moved {
            self.surface.set_scroll_left(offset);
        }
    }

    pub fn pointer_up(&self) {
        self.engine().pointer_up();
    }

    /// Run one frame at `now_ms` and push any offset change to the surface.
    pub fn tick(&self, now_ms: f64) {
        let width = self.surface.scroll_width();
        let advanced = self.engine().frame(now_ms, width);
        if let Some(offset) = advanced {
            self.surface.set_scroll_left(offset);
        }
    }
}

/// Spawns the per-frame loop for a controller.
pub struct ScrollDriver;

impl ScrollDriver {
    /// Mount the controller and tick it every `frame_interval` until the
    /// returned handle is stopped or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ShowcaseError::Config`] when called outside a tokio runtime.
    /// The controller is left unmounted in that case.
    pub fn spawn(
        controller: Arc<ScrollController>,
        frame_interval: Duration,
    ) -> Result<ScrollHandle> {
        let runtime = Handle::try_current().map_err(|e| ShowcaseError::Config {
            message: format!("ScrollDriver requires a tokio runtime: {}", e),
        })?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        controller.mount();

        let loop_controller = Arc::clone(&controller);
        let task = runtime.spawn(async move {
            let origin = Instant::now();
            let mut interval = tokio::time::interval(frame_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let tick = interval.tick().await;
                if token.is_cancelled() {
                    break;
                }
                let now_ms = tick.duration_since(origin).as_secs_f64() * 1000.0;
                loop_controller.tick(now_ms);
            }
            debug!("Scroll frame loop stopped");
        });

        Ok(ScrollHandle {
            controller,
            cancel,
            task: Some(task),
        })
    }

    pub fn spawn_default(controller: Arc<ScrollController>) -> Result<ScrollHandle> {
        Self::spawn(controller, ScrollConfig::FRAME_INTERVAL)
    }
}

/// Owner of a running frame loop. Stopping (or dropping) cancels the loop
/// and unmounts the engine.
pub struct ScrollHandle {
    controller: Arc<ScrollController>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ScrollHandle {
    pub fn controller(&self) -> &Arc<ScrollController> {
        &self.controller
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.controller.unmount();
    }
}

impl Drop for ScrollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
