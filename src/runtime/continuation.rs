//! Cancellable resume handle for a suspended computation.
//!
//! A [`Continuation`] is created suspended and ends in exactly one of two
//! terminal states: resumed or cancelled. Whoever resumes it runs the
//! resume action inline; whoever cancels it runs the cancellation hooks
//! registered by the parties holding the suspended work.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContinuationState {
    Suspended,
    Resumed,
    Cancelled,
}

type Hook = Box<dyn FnOnce()>;

struct Inner {
    state: ContinuationState,
    on_resume: Option<Hook>,
    cancel_hooks: Vec<Hook>,
}

/// Shared handle to one suspension. Clones refer to the same suspension.
#[derive(Clone)]
pub struct Continuation {
    inner: Rc<RefCell<Inner>>,
}

impl Continuation {
    /// Creates a suspended continuation that runs `on_resume` when resumed.
    pub fn new<F>(on_resume: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: ContinuationState::Suspended,
                on_resume: Some(Box::new(on_resume)),
                cancel_hooks: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> ContinuationState {
        self.inner.borrow().state
    }

    /// `true` while still suspended.
    pub fn is_active(&self) -> bool {
        self.state() == ContinuationState::Suspended
    }

    /// Registers `hook` to run if the continuation is cancelled.
    ///
    /// Runs `hook` immediately if it is already cancelled; drops it if it was
    /// already resumed.
    pub fn invoke_on_cancellation<F>(&self, hook: F)
    where
        F: FnOnce() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        match inner.state {
            ContinuationState::Suspended => inner.cancel_hooks.push(Box::new(hook)),
            ContinuationState::Cancelled => {
                drop(inner);
                hook();
            }
            ContinuationState::Resumed => {}
        }
    }

    /// Resumes on the current call stack, without going through any queue.
    ///
    /// Returns `false` if the continuation was no longer suspended.
    pub fn resume_undispatched(&self) -> bool {
        let (on_resume, hooks) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ContinuationState::Suspended {
                return false;
            }
            inner.state = ContinuationState::Resumed;
            (inner.on_resume.take(), std::mem::take(&mut inner.cancel_hooks))
        };

        drop(hooks);
        if let Some(on_resume) = on_resume {
            on_resume();
        }
        true
    }

    /// Cancels the suspension and runs every cancellation hook.
    ///
    /// Idempotent; returns `false` if it was no longer suspended.
    pub fn cancel(&self) -> bool {
        let (on_resume, hooks) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ContinuationState::Suspended {
                return false;
            }
            inner.state = ContinuationState::Cancelled;
            (inner.on_resume.take(), std::mem::take(&mut inner.cancel_hooks))
        };

        drop(on_resume);
        trace!(hooks = hooks.len(), "continuation cancelled");
        for hook in hooks {
            hook();
        }
        true
    }
}
