//! Background feed polling.
//!
//! [`AutoRefresh`] owns at most one timer task.  The task ticks at a fixed
//! interval and runs a callback on every tick; the first tick fires
//! immediately so a feed has data as soon as polling starts.
//!
//! ## For contributors
//!
//! The timer only *triggers* work.  The cache spawns each fetch as its own
//! task, so aborting the timer never cancels a request that is already on
//! the wire.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Start/stop handle for one recurring timer.
#[derive(Default)]
pub struct AutoRefresh {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the timer unless it is already running.
    ///
    /// Returns `true` if a new timer was started.  Must be called from
    /// within a tokio runtime.
    pub fn start<F, Fut>(&self, every: Duration, mut on_tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.task.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        *slot = Some(tokio::spawn(async move {
            let mut ticker = time::interval(every);
            // A slow fetch pushes the schedule back instead of bursting.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick().await;
            }
        }));
        true
    }

    /// Cancel the timer.  Returns `true` if one was running.
    pub fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}
