//! Tasks: futures driven through a [`Dispatch`] policy.
//!
//! A task never polls itself. Every poll, the first one included, is handed to
//! its dispatcher as a unit of work, so the dispatcher decides when (and
//! whether) the task gets to run. For a
//! [`LifecycleAwareDispatcher`](crate::LifecycleAwareDispatcher) that means a
//! task never runs while its host is below the readiness threshold.
//!
//! # Spawning
//!
//! ```ignore
//! use lifecycle_dispatcher::{spawn, time::delay};
//! use std::time::Duration;
//!
//! let handle = dispatcher.spawn(async {
//!     delay(Duration::from_millis(100)).await;
//!     spawn(async { println!("child") });
//!     42
//! });
//! ```
//!
//! # How Tasks Work
//!
//! 1. The future is boxed into a task and registered in the thread's task slab
//! 2. The task schedules itself: its poll is passed to [`Dispatch::dispatch`]
//! 3. When polled, the dispatcher and task are installed as the current context
//! 4. On `Poll::Pending` the future is kept; a wake schedules it again
//! 5. On `Poll::Ready` the output is stored, the task leaves the slab and
//!    every awaiting [`JoinHandle`] is woken

use super::context::{self, TaskKey};
use super::waker::make_waker;
use crate::dispatcher::Dispatch;
use crate::error::{DispatchError, Result};

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};
use tracing::trace;

/// Object-safe view of a task used by wakers and continuations.
pub(crate) trait Runnable {
    /// Hands one poll of the task to its dispatcher.
    fn schedule(self: Rc<Self>);

    /// Polls the task on the current call stack.
    fn run(self: Rc<Self>);

    /// Aborts the task, resolving it with [`DispatchError::Cancelled`].
    fn cancel(&self);
}

pub(crate) struct Task<T> {
    future: RefCell<Option<Pin<Box<dyn Future<Output = T>>>>>,
    result: RefCell<Option<Result<T>>>,
    dispatcher: Rc<dyn Dispatch>,
    key: Cell<Option<TaskKey>>,
    scheduled: Cell<bool>,
    running: Cell<bool>,
    finished: Cell<bool>,
    waiters: RefCell<Vec<Waker>>,
}

impl<T: 'static> Task<T> {
    fn complete(&self, result: Result<T>) {
        if self.finished.replace(true) {
            return;
        }

        *self.result.borrow_mut() = Some(result);
        if let Some(key) = self.key.take() {
            context::unregister_task(key);
        }

        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for waiter in waiters {
            waiter.wake();
        }
    }

    fn abort(&self) {
        if self.finished.get() {
            return;
        }

        let future = self.future.borrow_mut().take();
        self.complete(Err(DispatchError::Cancelled));
        // Dropping the future cancels whatever it was suspended on.
        drop(future);
    }
}

impl<T: 'static> Runnable for Task<T> {
    fn schedule(self: Rc<Self>) {
        if self.finished.get() || self.scheduled.replace(true) {
            return;
        }

        let dispatcher = self.dispatcher.clone();
        let poll = ScheduledPoll { task: Some(self) };
        dispatcher.dispatch(Box::new(move || poll.run()));
    }

    fn run(self: Rc<Self>) {
        if self.finished.get() {
            return;
        }

        // Resumed from inside its own poll; go through the dispatcher instead.
        if self.running.get() {
            self.schedule();
            return;
        }

        self.scheduled.set(false);
        let Some(key) = self.key.get() else { return };
        let Some(mut future) = self.future.borrow_mut().take() else {
            return;
        };

        let waker = make_waker(key, self.dispatcher.remote());
        let mut cx = Context::from_waker(&waker);
        let task: Weak<dyn Runnable> = Rc::downgrade(&self) as Weak<dyn Runnable>;

        self.running.set(true);
        let poll = context::enter_context(self.dispatcher.clone(), task, || future.as_mut().poll(&mut cx));
        self.running.set(false);

        match poll {
            Poll::Ready(value) => self.complete(Ok(value)),
            // Aborted while polling: the future is dropped here.
            Poll::Pending if self.finished.get() => drop(future),
            Poll::Pending => *self.future.borrow_mut() = Some(future),
        }
    }

    fn cancel(&self) {
        self.abort();
    }
}

// One poll handed to the dispatcher. If the dispatcher drops it without
// running it (host gone, looper quit), nothing would ever poll the task
// again, so the task is aborted.
struct ScheduledPoll<T: 'static> {
    task: Option<Rc<Task<T>>>,
}

impl<T: 'static> ScheduledPoll<T> {
    fn run(mut self) {
        if let Some(task) = self.task.take() {
            task.run();
        }
    }
}

impl<T: 'static> Drop for ScheduledPoll<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            trace!("scheduled poll dropped, aborting task");
            task.abort();
        }
    }
}

/// Spawns `future` on `dispatcher` and returns a handle to its output.
///
/// The first poll is dispatched, not run inline.
pub fn spawn_on<F>(dispatcher: Rc<dyn Dispatch>, future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let task = Rc::new(Task {
        future: RefCell::new(Some(Box::pin(future))),
        result: RefCell::new(None),
        dispatcher,
        key: Cell::new(None),
        scheduled: Cell::new(false),
        running: Cell::new(false),
        finished: Cell::new(false),
        waiters: RefCell::new(Vec::new()),
    });

    let runnable: Rc<dyn Runnable> = task.clone();
    task.key.set(Some(context::register_task(runnable.clone())));
    runnable.schedule();

    JoinHandle { task }
}

/// Spawns `future` on the dispatcher of the task currently being polled.
///
/// # Panics
/// Panics if called outside of a task.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let dispatcher =
        context::current_dispatcher().expect("spawn() called outside of a dispatcher task");
    spawn_on(dispatcher, future)
}

/// Awaitable handle to a spawned task's output.
///
/// Resolves to `Err(DispatchError::Cancelled)` if the task was aborted.
/// Dropping the handle detaches the task; it keeps running.
pub struct JoinHandle<T> {
    task: Rc<Task<T>>,
}

impl<T: 'static> JoinHandle<T> {
    /// Drops the task's future, cancelling any delay it is suspended on.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.finished.get()
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.task.result.borrow_mut().take() {
            return Poll::Ready(result);
        }

        // Output already taken by an earlier poll.
        if self.task.finished.get() {
            return Poll::Ready(Err(DispatchError::Cancelled));
        }

        self.task.waiters.borrow_mut().push(cx.waker().clone());
        Poll::Pending
    }
}

/// Collects [`JoinHandle`]s and awaits them in insertion order.
pub struct JoinSet<T> {
    handles: Vec<JoinHandle<T>>,
}

impl<T> JoinSet<T> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn push(&mut self, handle: JoinHandle<T>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Awaits every handle, draining the set.
    pub async fn await_all(&mut self) -> Vec<Result<T>> {
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in self.handles.drain(..) {
            results.push(handle.await);
        }
        results
    }
}

impl<T> Default for JoinSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
