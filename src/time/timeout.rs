//! Timeout utility for async tasks.
//!
//! This module provides a [`timeout`] combinator to wrap a future with a deadline.
//! If the inner future does not complete before the specified duration,
//! [`DispatchError::TimedOut`] is returned.
//!
//! The deadline is armed through
//! [`Dispatch::invoke_on_timeout`](crate::Dispatch::invoke_on_timeout), so it
//! fires whether or not the host is ready; the task itself only observes it
//! once it is allowed to run again.
//!
//! # Example: Timeout a Future
//!
//! ```ignore
//! use lifecycle_dispatcher::time::{delay, timeout};
//! use std::time::Duration;
//!
//! dispatcher.spawn(async {
//!     let result = timeout(Duration::from_millis(10), async {
//!         delay(Duration::from_millis(100)).await;
//!         "late"
//!     })
//!     .await;
//!     assert!(result.is_err());
//! });
//! ```

use crate::dispatcher::TimeoutHandle;
use crate::error::{DispatchError, Result};
use crate::runtime::context;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// Wraps a future with a timeout.
///
/// # Arguments
/// * `duration` - The maximum duration to wait for the future to complete.
/// * `future` - The future to execute.
///
/// # Returns
/// A future that resolves to `Ok(T)` if the inner future completes in time,
/// or `Err(DispatchError::TimedOut)` otherwise.
pub fn timeout<F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future,
{
    Timeout::new(duration, future)
}

/// Future returned by [`timeout`].
pub struct Timeout<F> {
    /// The wrapped future.
    future: Pin<Box<F>>,

    /// The timeout duration.
    duration: Duration,

    /// Pending deadline, armed on first poll.
    handle: Option<TimeoutHandle>,

    elapsed: Rc<Cell<bool>>,
    waker: Rc<RefCell<Option<Waker>>>,
}

impl<F> Timeout<F> {
    pub(crate) fn new(duration: Duration, future: F) -> Self {
        Timeout {
            future: Box::pin(future),
            duration,
            handle: None,
            elapsed: Rc::new(Cell::new(false)),
            waker: Rc::new(RefCell::new(None)),
        }
    }
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        if this.elapsed.get() {
            return Poll::Ready(Err(DispatchError::TimedOut(this.duration)));
        }

        if let Poll::Ready(value) = this.future.as_mut().poll(cx) {
            if let Some(handle) = this.handle.take() {
                handle.dispose();
            }
            return Poll::Ready(Ok(value));
        }

        *this.waker.borrow_mut() = Some(cx.waker().clone());

        if this.handle.is_none() {
            let dispatcher =
                context::current_dispatcher().expect("timeout() polled outside of a dispatcher task");
            let elapsed = this.elapsed.clone();
            let waker = this.waker.clone();

            this.handle = Some(dispatcher.invoke_on_timeout(
                this.duration,
                Box::new(move || {
                    elapsed.set(true);
                    let waker = waker.borrow_mut().take();
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                }),
            ));
        }

        Poll::Pending
    }
}

impl<F> Drop for Timeout<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.dispose();
        }
    }
}
