//! Task-level delay.
//!
//! [`delay`] suspends the calling task through the dispatcher's delayed
//! resumption. If the dispatcher gives up on that resumption (the host was
//! destroyed or dropped, or the looper quit), the suspended task is aborted
//! rather than left waiting forever.

use crate::runtime::Continuation;
use crate::runtime::context;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tracing::trace;

/// A future that completes after a specified duration, through the current
/// task's dispatcher.
///
/// On its first poll it suspends on
/// [`Dispatch::schedule_resume_after_delay`](crate::Dispatch::schedule_resume_after_delay).
/// When resumed, the owning task is polled right away instead of being
/// dispatched again. Dropping the future cancels the pending resumption.
pub struct Delay {
    duration: Duration,
    continuation: Option<Continuation>,
    resumed: Rc<Cell<bool>>,
    // Set while the future itself cancels, so it does not abort its own task.
    released: Rc<Cell<bool>>,
    waker: Rc<RefCell<Option<Waker>>>,
}

impl Delay {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            continuation: None,
            resumed: Rc::new(Cell::new(false)),
            released: Rc::new(Cell::new(false)),
            waker: Rc::new(RefCell::new(None)),
        }
    }
}

impl Future for Delay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.resumed.get() {
            return Poll::Ready(());
        }

        *self.waker.borrow_mut() = Some(cx.waker().clone());
        if self.continuation.is_some() {
            return Poll::Pending;
        }

        if self.duration.is_zero() {
            return Poll::Ready(());
        }

        let dispatcher =
            context::current_dispatcher().expect("delay() polled outside of a dispatcher task");
        let task = context::current_task();
        let resumed = self.resumed.clone();
        let waker = self.waker.clone();

        let owner = task.clone();
        let continuation = Continuation::new(move || {
            resumed.set(true);
            match task.and_then(|task| task.upgrade()) {
                Some(task) => task.run(),
                None => {
                    let waker = waker.borrow_mut().take();
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                }
            }
        });

        let released = self.released.clone();
        continuation.invoke_on_cancellation(move || {
            if released.get() {
                return;
            }
            if let Some(task) = owner.and_then(|task| task.upgrade()) {
                trace!("delayed resumption abandoned, aborting task");
                task.cancel();
            }
        });

        dispatcher.schedule_resume_after_delay(self.duration, &continuation);
        self.continuation = Some(continuation);

        Poll::Pending
    }
}

impl Drop for Delay {
    fn drop(&mut self) {
        if let Some(continuation) = &self.continuation {
            self.released.set(true);
            continuation.cancel();
        }
    }
}

/// Suspends the current task for `duration`.
///
/// # Panics
/// The returned future panics if polled outside of a dispatcher task.
///
/// # Example
/// ```ignore
/// use lifecycle_dispatcher::time::delay;
/// use std::time::Duration;
///
/// dispatcher.spawn(async {
///     delay(Duration::from_millis(100)).await;
///     println!("Woke up after 100ms, host ready");
/// });
/// ```
pub fn delay(duration: Duration) -> Delay {
    Delay::new(duration)
}
