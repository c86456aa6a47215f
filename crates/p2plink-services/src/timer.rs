//! Cancellable timer tasks.
//!
//! A [`TimerSlot`] holds at most one tokio task; arming it again replaces the
//! previous task. [`DelayedTasks`] keeps any number of one-shot tasks keyed by
//! name, each with a payload handed back if the task is cancelled before it
//! fires, so they can all be aborted on shutdown.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct TimerSlot {
    name: &'static str,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            task: Mutex::new(None),
        }
    }

    /// Run `fut` in this slot, aborting whatever ran there before.
    pub fn start<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let old = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(old) = old {
            old.abort();
        }
    }

    /// Run `fut` once after `delay`.
    ///
    /// The payload is detached from the slot when the timer fires, so it may
    /// cancel or re-arm this same slot without aborting itself.
    pub fn arm<F>(&self, delay: Duration, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = self.name;
        self.start(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(timer = name, "timer fired");
            tokio::spawn(fut);
        });
    }

    /// Abort the pending task. Returns whether one was still running.
    pub fn cancel(&self) -> bool {
        match self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(handle) => {
                let live = !handle.is_finished();
                handle.abort();
                live
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One-shot delayed tasks keyed by name, each carrying a payload of type `T`.
pub struct DelayedTasks<T = ()> {
    tasks: Mutex<HashMap<String, (T, JoinHandle<()>)>>,
}

impl<T> Default for DelayedTasks<T> {
    fn default() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> DelayedTasks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` after `delay`, replacing a task already scheduled under `key`.
    pub fn schedule<F>(&self, key: &str, payload: T, delay: Duration, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|_, (_, h)| !h.is_finished());
        if let Some((_, old)) = tasks.insert(key.to_string(), (payload, handle)) {
            old.abort();
        }
    }

    /// Abort the task under `key`. Returns its payload if it had not fired yet.
    pub fn cancel(&self, key: &str) -> Option<T> {
        let (payload, handle) = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)?;
        let live = !handle.is_finished();
        handle.abort();
        live.then_some(payload)
    }

    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(_, h)| !h.is_finished())
            .count()
    }

    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, (_, handle)) in tasks.drain() {
            handle.abort();
        }
    }
}

impl<T> Drop for DelayedTasks<T> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
