//! Cross-thread inbox for a looper.
//!
//! Everything a looper runs lives on its own thread. Other threads never touch
//! that state; they hand `Send` closures to the inbox and the looper runs them
//! on its next turn.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

pub(crate) type RemoteWork = Box<dyn FnOnce() + Send>;

/// Thread-safe FIFO of work posted from other threads.
pub struct RemoteInbox {
    queue: Mutex<VecDeque<RemoteWork>>,
    signal: Condvar,
    shutdown: AtomicBool,
}

impl RemoteInbox {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    fn push(&self, work: RemoteWork) -> bool {
        if self.is_shutdown() {
            return false;
        }

        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(work);
        self.signal.notify_one();
        true
    }

    pub(crate) fn drain(&self) -> Vec<RemoteWork> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Parks the looper thread for at most `timeout` unless work is queued.
    pub(crate) fn wait_timeout(&self, timeout: Duration) {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.is_empty() && !self.is_shutdown() {
            let _woken = self
                .signal
                .wait_timeout(queue, timeout)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.signal.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// `Send` handle other threads use to run work on a looper's thread.
#[derive(Clone)]
pub struct RemoteHandle {
    inbox: Arc<RemoteInbox>,
}

impl RemoteHandle {
    pub(crate) fn new(inbox: Arc<RemoteInbox>) -> Self {
        Self { inbox }
    }

    /// Queues `work` for the looper's next turn.
    ///
    /// Returns `false` and drops `work` if the looper has quit.
    pub fn post<F>(&self, work: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.inbox.push(Box::new(work))
    }
}
