//! Single-threaded message loop: the delay/timer queue the dispatcher posts to.
//!
//! - [`Looper`]: owns a [`message_queue`] and runs due messages on its thread
//! - [`Handler`]: posting surface bound to a looper, synchronous or asynchronous
//! - [`clock`]: real and virtual time sources
//! - [`remote`]: cross-thread inbox
//!
//! # Example
//!
//! ```ignore
//! use lifecycle_dispatcher::looper::{Handler, Looper, ManualClock};
//! use std::time::Duration;
//!
//! let looper = Looper::builder().clock(ManualClock::new()).build();
//! let handler = Handler::new(&looper);
//! handler.post_delayed(|| println!("later"), Duration::from_millis(10));
//! looper.advance_by(Duration::from_millis(10));
//! ```

pub mod clock;
pub mod handler;
pub mod message_queue;
pub mod remote;

pub use clock::{Clock, ManualClock, SystemClock};
pub use handler::Handler;
pub use message_queue::{BarrierToken, MessageToken, Work};
pub use remote::{RemoteHandle, RemoteInbox};

use message_queue::MessageQueue;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

thread_local! {
    /// Default looper of each thread, created on first use.
    static CURRENT_LOOPER: RefCell<Option<Looper>> = const { RefCell::new(None) };
}

/// How the platform exposes asynchronous (barrier-exempt) handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsyncSupport {
    /// No asynchronous messages at all.
    Unavailable,
    /// Only through a privileged constructor, which may be missing.
    Hidden { constructor_available: bool },
    /// Through the public [`Handler::create_async`].
    Public,
}

/// Builder for [`Looper`].
pub struct LooperBuilder {
    clock: Rc<dyn Clock>,
    async_support: AsyncSupport,
}

impl Default for LooperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LooperBuilder {
    /// Real-time clock, public asynchronous handlers.
    pub fn new() -> Self {
        Self {
            clock: Rc::new(SystemClock::new()),
            async_support: AsyncSupport::Public,
        }
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    pub fn async_support(mut self, support: AsyncSupport) -> Self {
        self.async_support = support;
        self
    }

    pub fn build(self) -> Looper {
        Looper {
            inner: Rc::new(LooperInner {
                queue: RefCell::new(MessageQueue::new()),
                clock: self.clock,
                async_support: self.async_support,
                remote: Arc::new(RemoteInbox::new()),
            }),
        }
    }
}

struct LooperInner {
    queue: RefCell<MessageQueue>,
    clock: Rc<dyn Clock>,
    async_support: AsyncSupport,
    remote: Arc<RemoteInbox>,
}

/// A message loop bound to the thread that created it.
///
/// Cloning yields another handle to the same loop. Nothing runs until the
/// owner drives the loop with [`run_pending`](Self::run_pending),
/// [`advance_by`](Self::advance_by) or [`run_until_idle`](Self::run_until_idle).
#[derive(Clone)]
pub struct Looper {
    inner: Rc<LooperInner>,
}

impl Default for Looper {
    fn default() -> Self {
        Self::new()
    }
}

impl Looper {
    pub fn new() -> Self {
        LooperBuilder::new().build()
    }

    pub fn builder() -> LooperBuilder {
        LooperBuilder::new()
    }

    /// The calling thread's default looper, created with default settings on
    /// first use.
    pub fn current() -> Looper {
        CURRENT_LOOPER.with(|current| current.borrow_mut().get_or_insert_with(Looper::new).clone())
    }

    pub fn now(&self) -> Duration {
        self.inner.clock.now()
    }

    pub fn async_support(&self) -> AsyncSupport {
        self.inner.async_support
    }

    pub fn remote(&self) -> RemoteHandle {
        RemoteHandle::new(self.inner.remote.clone())
    }

    pub fn is_quitting(&self) -> bool {
        self.inner.remote.is_shutdown()
    }

    /// Number of queued messages not yet run.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Deadline of the next runnable message, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner.queue.borrow().next_deadline()
    }

    /// Stops the loop: every pending message is discarded and later posts are
    /// rejected.
    pub fn quit(&self) {
        self.inner.remote.shutdown();

        let dropped = self.inner.queue.borrow_mut().clear();
        let remote = self.inner.remote.drain();
        debug!(
            messages = dropped.len(),
            remote = remote.len(),
            "looper quit, discarding pending work"
        );
    }

    /// Inserts a barrier at the current time.
    pub fn post_sync_barrier(&self) -> BarrierToken {
        let now = self.now();
        self.inner.queue.borrow_mut().enqueue_barrier(now)
    }

    pub fn remove_sync_barrier(&self, token: BarrierToken) -> bool {
        self.inner.queue.borrow_mut().remove_barrier(token)
    }

    /// Runs every message that is due now, including messages posted by the
    /// ones being run, and everything queued from other threads.
    ///
    /// Returns the number of work items run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;

        loop {
            let remote = self.inner.remote.drain();
            let had_remote = !remote.is_empty();
            for work in remote {
                work();
                ran += 1;
            }

            let now = self.now();
            let next = self.inner.queue.borrow_mut().pop_due(now);
            match next {
                Some(work) => {
                    work();
                    ran += 1;
                }
                None if had_remote => continue,
                None => break,
            }
        }

        ran
    }

    /// Lets `duration` elapse on the loop's clock, running messages in
    /// deadline order as their deadlines are reached.
    pub fn advance_by(&self, duration: Duration) -> usize {
        let target = self.now().saturating_add(duration);
        let mut ran = 0;

        loop {
            ran += self.run_pending();

            if self.now() >= target {
                break;
            }

            let wake_at = match self.next_deadline() {
                Some(deadline) if deadline < target => deadline,
                _ => target,
            };
            self.inner.clock.wait_until(wake_at, &self.inner.remote);
        }

        ran
    }

    /// Runs until no message is queued, waiting for delayed ones.
    ///
    /// Messages held back by a barrier do not keep the loop alive.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;

        loop {
            ran += self.run_pending();

            match self.next_deadline() {
                Some(deadline) => self.inner.clock.wait_until(deadline, &self.inner.remote),
                None if self.inner.remote.is_empty() => break,
                None => continue,
            }
        }

        ran
    }

    pub(crate) fn enqueue(&self, delay: Duration, work: Work, asynchronous: bool) -> Option<MessageToken> {
        if self.is_quitting() {
            return None;
        }

        let when = self.now().saturating_add(delay);
        Some(self.inner.queue.borrow_mut().enqueue(when, work, asynchronous))
    }

    pub(crate) fn remove(&self, token: MessageToken) -> bool {
        let removed = self.inner.queue.borrow_mut().remove(token);
        removed.is_some()
    }
}
