//! Debounced input controller
//!
//! Trailing-edge debounce for text input. Each input bumps a generation
//! counter and restarts the timer; a timer only emits if its generation is
//! still current when it fires, so a timer that lost the race is a no-op even
//! if aborting it came too late.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Default quiet period before a search term is propagated
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

type Sink<T> = Arc<dyn Fn(T) + Send + Sync>;

pub struct Debouncer<T> {
    delay: Duration,
    generation: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
    sink: Sink<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// `sink` receives the last value of each burst. Must be used inside a
    /// tokio runtime.
    pub fn new(delay: Duration, sink: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            sink: Arc::new(sink),
        }
    }

    /// Queue `value`, cancelling any pending emission
    pub fn input(&self, value: T) {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let sink = Arc::clone(&self.sink);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) == token {
                sink(value);
            } else {
                trace!(token, "debounce timer superseded");
            }
        });

        if let Some(previous) = self.timer.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Drop any pending emission
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.timer.lock().take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.timer.get_mut().take() {
            pending.abort();
        }
    }
}
