//! Lifecycle-aware dispatcher.
//!
//! [`LifecycleAwareDispatcher`] is a [`Dispatch`] policy that posts work to a
//! [`Handler`], but only while its host is ready (at least `Started` by
//! default). Work dispatched while the host is below that threshold waits for
//! the next transition that reaches it.
//!
//! | Operation | Host ready | Host not ready |
//! |-----------|------------|----------------|
//! | [`dispatch`](Dispatch::dispatch) | posted now | posted once ready |
//! | [`schedule_resume_after_delay`](Dispatch::schedule_resume_after_delay) | resumed inline when the delay elapses | delay elapses, then resumed inline once ready |
//! | [`invoke_on_timeout`](Dispatch::invoke_on_timeout) | runs after the delay | runs after the delay |
//!
//! Timeouts ignore readiness: they usually cancel work rather than resume it.

use crate::builder::DispatcherBuilder;
use crate::error::{DispatchError, Result};
use crate::lifecycle::{LifecycleOwner, LifecycleState, ReadinessGate, ReadinessRegistration};
use crate::looper::{Handler, MessageToken, RemoteHandle, Work};
use crate::runtime::{Continuation, JoinHandle, spawn_on};

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

/// Longest delay ever handed to the looper. Longer requests are clamped so
/// deadline arithmetic cannot overflow.
pub const MAX_DELAY: Duration = Duration::from_millis(i64::MAX as u64 / 2);

/// Scheduling policy consumed by the task runtime.
///
/// All methods are called on the dispatcher's thread.
pub trait Dispatch {
    /// Runs `work` on the dispatcher's thread, as soon as the policy allows.
    fn dispatch(&self, work: Work);

    /// Resumes `continuation` once `delay` has elapsed.
    ///
    /// Cancelling the continuation before that removes every trace of the
    /// pending resumption.
    fn schedule_resume_after_delay(&self, delay: Duration, continuation: &Continuation);

    /// Runs `work` once `delay` has elapsed, unless the returned handle is
    /// disposed first.
    fn invoke_on_timeout(&self, delay: Duration, work: Work) -> TimeoutHandle;

    /// A variant that runs work inline when already on the right thread.
    fn immediate(&self) -> Result<Rc<dyn Dispatch>>;

    /// Handle other threads use to reach the dispatcher's thread.
    fn remote(&self) -> RemoteHandle;
}

pub(crate) fn clamp_delay(delay: Duration) -> Duration {
    delay.min(MAX_DELAY)
}

/// Dispatcher that only lets work run while its host is ready.
///
/// Holds its host weakly: once the host is gone, work that still needs it to
/// become ready is dropped.
#[derive(Clone)]
pub struct LifecycleAwareDispatcher {
    gate: ReadinessGate,
    handler: Handler,
}

impl LifecycleAwareDispatcher {
    /// Dispatcher gated on `owner` being at least `Started`, posting to
    /// `handler`.
    pub fn new(owner: &impl LifecycleOwner, handler: Handler) -> Self {
        let gate = ReadinessGate::new(&owner.lifecycle(), LifecycleState::Started);
        Self::with_gate(gate, handler)
    }

    pub(crate) fn with_gate(gate: ReadinessGate, handler: Handler) -> Self {
        Self { gate, handler }
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Spawns `future` as a task driven by this dispatcher.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        spawn_on(Rc::new(self.clone()), future)
    }
}

impl Dispatch for LifecycleAwareDispatcher {
    fn dispatch(&self, work: Work) {
        if self.gate.is_ready() {
            self.handler.post(work);
            return;
        }

        let handler = self.handler.clone();
        let registration = self.gate.once_ready(move || {
            handler.post(work);
        });

        match registration {
            Some(_) => debug!(threshold = ?self.gate.threshold(), "host not ready, dispatch deferred"),
            None => trace!("host gone, dispatch dropped"),
        }
    }

    fn schedule_resume_after_delay(&self, delay: Duration, continuation: &Continuation) {
        let delay = clamp_delay(delay);
        let pending = Rc::new(RefCell::new(PendingResume::Created));

        let fire = {
            let gate = self.gate.clone();
            let stage = ArmedResume::new(continuation);
            let pending = pending.clone();
            move || {
                if let Some(continuation) = stage.disarm() {
                    resume_after_delay(&gate, &continuation, &pending);
                }
            }
        };

        // A quit looper drops `fire`, which cancels the continuation.
        let Some(token) = self.handler.post_delayed(fire, delay) else {
            trace!(?delay, "looper quit, delayed resumption cancelled");
            *pending.borrow_mut() = PendingResume::Cancelled;
            return;
        };
        *pending.borrow_mut() = PendingResume::WaitingOnTimer(token);

        let handler = self.handler.clone();
        continuation.invoke_on_cancellation(move || {
            let previous = pending.replace(PendingResume::Cancelled);
            match previous {
                PendingResume::WaitingOnTimer(token) => {
                    handler.remove_callbacks(token);
                }
                PendingResume::WaitingOnReadiness(registration) => {
                    registration.cancel();
                }
                _ => {}
            }
            trace!(?delay, "delayed resumption cancelled");
        });
    }

    fn invoke_on_timeout(&self, delay: Duration, work: Work) -> TimeoutHandle {
        let token = self.handler.post_delayed(work, clamp_delay(delay));
        TimeoutHandle {
            handler: self.handler.clone(),
            token: Cell::new(token),
        }
    }

    fn immediate(&self) -> Result<Rc<dyn Dispatch>> {
        Err(DispatchError::Unsupported(
            "immediate dispatch would bypass the readiness gate",
        ))
    }

    fn remote(&self) -> RemoteHandle {
        self.handler.looper().remote()
    }
}

/// Where a delayed resumption currently lives.
enum PendingResume {
    Created,
    WaitingOnTimer(MessageToken),
    WaitingOnReadiness(ReadinessRegistration),
    Running,
    Done,
    Cancelled,
}

// Runs on the looper once the delay has elapsed.
fn resume_after_delay(gate: &ReadinessGate, continuation: &Continuation, pending: &Rc<RefCell<PendingResume>>) {
    if !continuation.is_active() {
        *pending.borrow_mut() = PendingResume::Done;
        return;
    }

    if gate.is_ready() {
        resume(continuation, pending);
        return;
    }

    let on_ready = {
        let stage = ArmedResume::new(continuation);
        let pending = pending.clone();
        move || {
            let Some(continuation) = stage.disarm() else { return };
            if matches!(*pending.borrow(), PendingResume::WaitingOnReadiness(_)) {
                resume(&continuation, &pending);
            }
        }
    };

    // Dropped by the gate when the host is gone, cancelling the continuation.
    match gate.once_ready(on_ready) {
        Some(registration) => {
            debug!("delay elapsed before host became ready, waiting for readiness");
            *pending.borrow_mut() = PendingResume::WaitingOnReadiness(registration);
        }
        None => trace!("host gone, delayed resumption cancelled"),
    }
}

// The continuation as held by one stage of a delayed resumption (the timer
// message, then the readiness observer). Dropping an armed stage means the
// resumption can no longer happen, so the continuation is cancelled and its
// waiter released.
struct ArmedResume {
    continuation: Option<Continuation>,
}

impl ArmedResume {
    fn new(continuation: &Continuation) -> Self {
        Self {
            continuation: Some(continuation.clone()),
        }
    }

    fn disarm(mut self) -> Option<Continuation> {
        self.continuation.take()
    }
}

impl Drop for ArmedResume {
    fn drop(&mut self) {
        if let Some(continuation) = self.continuation.take()
            && continuation.cancel()
        {
            trace!("delayed resumption dropped unfired, continuation cancelled");
        }
    }
}

fn resume(continuation: &Continuation, pending: &Rc<RefCell<PendingResume>>) {
    *pending.borrow_mut() = PendingResume::Running;
    continuation.resume_undispatched();
    *pending.borrow_mut() = PendingResume::Done;
}

/// Handle to work scheduled with [`Dispatch::invoke_on_timeout`].
///
/// Dropping the handle does not dispose it.
pub struct TimeoutHandle {
    handler: Handler,
    token: Cell<Option<MessageToken>>,
}

impl TimeoutHandle {
    /// Removes the scheduled work if it has not run yet. Idempotent.
    pub fn dispose(&self) {
        if let Some(token) = self.token.take() {
            self.handler.remove_callbacks(token);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.token.get().is_none()
    }
}
