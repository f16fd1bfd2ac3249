//! Debounced, deduplicating, single-flight queue of side-effecting actions.
//!
//! Items wait in an ordered pending list. Enqueuing an item equal to one
//! that is already pending moves it to the back instead of adding a second
//! copy. A settle timer runs before each item is processed, and only one action
//! runs at a time. Failed actions are logged, reported to the optional
//! observer, and dropped.

use crate::cancel::CancellationToken;
use crate::config::QueueConfig;
use crate::error::{Result, ShowcaseError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Action<T> = Box<dyn Fn(T) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type FailureObserver<T> = Box<dyn Fn(&T, &anyhow::Error) + Send + Sync>;

/// Builder for [`ActionQueue`].
pub struct ActionQueueBuilder<T> {
    action: Action<T>,
    settle_delay: Duration,
    on_failure: Option<FailureObserver<T>>,
}

impl<T> ActionQueueBuilder<T>
where
    T: PartialEq + Clone + Debug + Send + 'static,
{
    /// Delay between arming the timer and processing the head item.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Called with the item and error whenever an action fails.
    pub fn on_failure(mut self, observer: impl Fn(&T, &anyhow::Error) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(observer));
        self
    }

    /// Build the queue on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ShowcaseError::Config`] when called outside a runtime.
    pub fn build(self) -> Result<ActionQueue<T>> {
        let runtime = Handle::try_current().map_err(|e| ShowcaseError::Config {
            message: format!("ActionQueue requires a tokio runtime: {}", e),
        })?;
        Ok(ActionQueue {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    timer_armed: false,
                    processing: false,
                    closed: false,
                    timer: None,
                }),
                idle: Notify::new(),
                action: self.action,
                on_failure: self.on_failure,
                settle_delay: self.settle_delay,
                cancel: CancellationToken::new(),
                runtime,
            }),
        })
    }
}

struct QueueState<T> {
    pending: VecDeque<T>,
    timer_armed: bool,
    processing: bool,
    closed: bool,
    timer: Option<JoinHandle<()>>,
}

impl<T> QueueState<T> {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && !self.timer_armed && !self.processing
    }
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    idle: Notify,
    action: Action<T>,
    on_failure: Option<FailureObserver<T>>,
    settle_delay: Duration,
    cancel: CancellationToken,
    runtime: Handle,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Serializing queue for user-triggered mutations.
///
/// Dropping the queue shuts it down; an action already in flight still
/// completes.
pub struct ActionQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> ActionQueue<T>
where
    T: PartialEq + Clone + Debug + Send + 'static,
{
    /// Start building a queue that runs `action` for each item.
    pub fn builder<F, Fut>(action: F) -> ActionQueueBuilder<T>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        ActionQueueBuilder {
            action: Box::new(move |item| action(item).boxed()),
            settle_delay: QueueConfig::SETTLE_DELAY,
            on_failure: None,
        }
    }

    /// Queue `item`, replacing any equal pending item.
    ///
    /// # Errors
    ///
    /// Returns [`ShowcaseError::QueueClosed`] after [`shutdown`](Self::shutdown).
    pub fn enqueue(&self, item: T) -> Result<()> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(ShowcaseError::QueueClosed);
        }

        if let Some(pos) = state.pending.iter().position(|pending| *pending == item) {
            state.pending.remove(pos);
            debug!("Replacing pending queue item {:?}", item);
        }
        state.pending.push_back(item);

        if !state.timer_armed && !state.processing {
            state.timer_armed = true;
            let shared = Arc::clone(&self.shared);
            state.timer = Some(self.shared.runtime.spawn(drive(shared)));
        }
        Ok(())
    }

    /// Number of items waiting to be processed (excluding one in flight).
    pub fn len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the pending items in processing order.
    pub fn pending(&self) -> Vec<T> {
        self.shared.lock().pending.iter().cloned().collect()
    }

    /// True when nothing is pending, armed, or in flight.
    pub fn is_idle(&self) -> bool {
        self.shared.lock().is_idle()
    }

    /// Resolve once the queue has drained.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Drop pending items, cancel the armed timer and refuse new items.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        self.shared.cancel.cancel();

        let dropped = state.pending.len();
        state.pending.clear();
        if !state.processing {
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.timer_armed = false;
        }
        drop(state);

        if dropped > 0 {
            debug!("Action queue shut down, dropped {} pending item(s)", dropped);
        }
        self.shared.idle.notify_waiters();
    }
}

impl<T> Drop for ActionQueue<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.closed = true;
        state.pending.clear();
        self.shared.cancel.cancel();
        if !state.processing {
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }
    }
}

/// Timer task: settle, process the head item, repeat while items remain.
async fn drive<T>(shared: Arc<Shared<T>>)
where
    T: PartialEq + Clone + Debug + Send + 'static,
{
    loop {
        tokio::time::sleep(shared.settle_delay).await;

        let item = {
            let mut state = shared.lock();
            state.timer_armed = false;
            let next = if shared.cancel.is_cancelled() {
                None
            } else {
                state.pending.pop_front()
            };
            match next {
                Some(item) => {
                    state.processing = true;
                    item
                }
                None => {
                    state.timer = None;
                    drop(state);
                    shared.idle.notify_waiters();
                    return;
                }
            }
        };

        debug!("Processing queued action {:?}", item);
        let outcome = AssertUnwindSafe((shared.action)(item.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(anyhow::anyhow!("action panicked")));
        if let Err(e) = outcome {
            warn!("Queued action for {:?} failed, dropping it: {:#}", item, e);
            if let Some(observer) = &shared.on_failure {
                observer(&item, &e);
            }
        }

        let mut state = shared.lock();
        state.processing = false;
        if state.pending.is_empty() || shared.cancel.is_cancelled() {
            state.timer = None;
            drop(state);
            shared.idle.notify_waiters();
            return;
        }
        state.timer_armed = true;
    }
}
