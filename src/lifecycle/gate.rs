//! Readiness gate over a host lifecycle.
//!
//! The gate answers two questions for the dispatcher: is the host at or above
//! the readiness threshold right now, and "call me once, the next time it
//! gets there". It holds the host only weakly; a host that has gone away is
//! never ready and accepts no registrations.

use super::{Lifecycle, LifecycleState, ObserverKey};

use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Read-only view of a host lifecycle against a fixed threshold.
#[derive(Clone)]
pub struct ReadinessGate {
    lifecycle: Weak<dyn Lifecycle>,
    threshold: LifecycleState,
}

impl ReadinessGate {
    pub fn new(lifecycle: &Rc<dyn Lifecycle>, threshold: LifecycleState) -> Self {
        Self {
            lifecycle: Rc::downgrade(lifecycle),
            threshold,
        }
    }

    pub fn threshold(&self) -> LifecycleState {
        self.threshold
    }

    /// Returns `true` iff the host is alive and at least at the threshold.
    pub fn is_ready(&self) -> bool {
        self.lifecycle
            .upgrade()
            .is_some_and(|lifecycle| lifecycle.current_state().is_at_least(self.threshold))
    }

    /// Registers `callback` to run exactly once, on the next upward transition
    /// that reaches the threshold.
    ///
    /// Returns `None` and drops the callback when the host is gone or already
    /// destroyed, since such a host can never become ready.
    pub fn once_ready<F>(&self, callback: F) -> Option<ReadinessRegistration>
    where
        F: FnOnce() + 'static,
    {
        let Some(lifecycle) = self.lifecycle.upgrade() else {
            trace!("host dropped, readiness callback discarded");
            return None;
        };

        if lifecycle.current_state() == LifecycleState::Destroyed {
            trace!("host destroyed, readiness callback discarded");
            return None;
        }

        let threshold = self.threshold;
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let mut callback = Some(callback);

        let key = lifecycle.add_observer(Box::new(move |event| {
            if !event.is_upward() || !event.target_state().is_at_least(threshold) {
                return ControlFlow::Continue(());
            }

            flag.set(true);
            if let Some(callback) = callback.take() {
                callback();
            }
            ControlFlow::Break(())
        }));

        Some(ReadinessRegistration {
            lifecycle: self.lifecycle.clone(),
            key,
            fired,
            cancelled: Cell::new(false),
        })
    }
}

/// A live one-shot readiness callback.
///
/// Dropping the registration does not cancel it; call [`cancel`](Self::cancel).
pub struct ReadinessRegistration {
    lifecycle: Weak<dyn Lifecycle>,
    key: ObserverKey,
    fired: Rc<Cell<bool>>,
    cancelled: Cell<bool>,
}

impl ReadinessRegistration {
    /// Returns `true` while the callback has neither fired nor been cancelled.
    pub fn is_pending(&self) -> bool {
        !self.fired.get() && !self.cancelled.get()
    }

    /// Deregisters the callback so it never fires.
    ///
    /// Idempotent; returns `false` if the callback already fired or was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.cancelled.set(true);

        if let Some(lifecycle) = self.lifecycle.upgrade() {
            lifecycle.remove_observer(self.key);
        }
        true
    }
}
