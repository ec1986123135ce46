//! Reference [`Lifecycle`] implementation owned by a host component.
//!
//! The registry holds the host's current state and a FIFO-ordered set of
//! observers. Transitions are applied one event at a time; every event is
//! delivered to the observers that were registered when its dispatch began.
//!
//! # Example
//!
//! ```ignore
//! use lifecycle_dispatcher::{LifecycleRegistry, LifecycleState};
//!
//! let registry = LifecycleRegistry::new();
//! registry.set_current_state(LifecycleState::Resumed)?;
//! assert_eq!(registry.current_state(), LifecycleState::Resumed);
//! ```

use super::{Lifecycle, LifecycleEvent, LifecycleState, Observer, ObserverKey};
use crate::error::{DispatchError, Result};

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::ops::ControlFlow;
use tracing::trace;

/// Host-owned lifecycle state plus its observers.
///
/// Single-threaded: observers run synchronously on the thread that drives
/// the transition.
pub struct LifecycleRegistry {
    state: Cell<LifecycleState>,
    // `None` marks an observer that is currently executing.
    observers: RefCell<BTreeMap<ObserverKey, Option<Observer>>>,
    next_key: Cell<u64>,
    dispatching: Cell<bool>,
    pending: RefCell<VecDeque<LifecycleEvent>>,
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleRegistry {
    /// Creates a registry in the `Initialized` state with no observers.
    pub fn new() -> Self {
        Self {
            state: Cell::new(LifecycleState::Initialized),
            observers: RefCell::new(BTreeMap::new()),
            next_key: Cell::new(0),
            dispatching: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    /// Applies a single lifecycle event.
    ///
    /// # Errors
    /// [`DispatchError::IllegalTransition`] if `event` is not a legal single
    /// step from the host's state (including transitions already queued by a
    /// running observer).
    pub fn handle_event(&self, event: LifecycleEvent) -> Result<()> {
        let from = self.projected_state();
        if !event.is_legal_from(from) {
            return Err(DispatchError::IllegalTransition {
                from,
                to: event.target_state(),
            });
        }

        self.pending.borrow_mut().push_back(event);
        self.drain();

        Ok(())
    }

    /// Moves the host to `target`, emitting every intermediate event.
    ///
    /// # Errors
    /// [`DispatchError::IllegalTransition`] when leaving `Destroyed` or when
    /// returning to `Initialized`.
    pub fn set_current_state(&self, target: LifecycleState) -> Result<()> {
        let from = self.projected_state();
        if from == target {
            return Ok(());
        }

        // A host that never got created goes straight to Destroyed.
        if from == LifecycleState::Initialized && target == LifecycleState::Destroyed {
            self.state.set(LifecycleState::Destroyed);
            self.clear_observers();
            return Ok(());
        }

        let mut events = Vec::new();
        let mut state = from;
        while state != target {
            let step = if state < target {
                LifecycleEvent::up_from(state)
            } else {
                LifecycleEvent::down_from(state)
            };

            match step {
                Some(event) => {
                    events.push(event);
                    state = event.target_state();
                }
                None => return Err(DispatchError::IllegalTransition { from, to: target }),
            }
        }

        self.pending.borrow_mut().extend(events);
        self.drain();

        Ok(())
    }

    /// Number of observers currently registered.
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    // State the host will be in once every queued event has been dispatched.
    fn projected_state(&self) -> LifecycleState {
        self.pending
            .borrow()
            .back()
            .map(|event| event.target_state())
            .unwrap_or_else(|| self.state.get())
    }

    fn drain(&self) {
        // Re-entrant transitions are picked up by the outer loop.
        if self.dispatching.replace(true) {
            return;
        }

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(event) = next else { break };

            self.state.set(event.target_state());
            trace!(?event, state = ?event.target_state(), "dispatching lifecycle event");

            let keys: Vec<ObserverKey> = self.observers.borrow().keys().copied().collect();
            for key in keys {
                let taken = self.observers.borrow_mut().get_mut(&key).and_then(Option::take);
                let Some(mut observer) = taken else { continue };

                let flow = observer(event);

                let mut observers = self.observers.borrow_mut();
                let finished = match observers.get_mut(&key) {
                    Some(slot) if flow == ControlFlow::Continue(()) => {
                        *slot = Some(observer);
                        None
                    }
                    Some(_) => {
                        observers.remove(&key);
                        Some(observer)
                    }
                    // Removed while it was running.
                    None => Some(observer),
                };
                drop(observers);
                drop(finished);
            }

            if event == LifecycleEvent::Destroy {
                self.clear_observers();
            }
        }

        self.dispatching.set(false);
    }

    fn clear_observers(&self) {
        let dropped = std::mem::take(&mut *self.observers.borrow_mut());
        if !dropped.is_empty() {
            trace!(count = dropped.len(), "host destroyed, dropping observers");
        }
        drop(dropped);
    }
}

impl Lifecycle for LifecycleRegistry {
    fn current_state(&self) -> LifecycleState {
        self.state.get()
    }

    fn add_observer(&self, observer: Observer) -> ObserverKey {
        let key = ObserverKey(self.next_key.get());
        self.next_key.set(key.0 + 1);

        if self.state.get() == LifecycleState::Destroyed {
            trace!(?key, "host destroyed, observer not retained");
            return key;
        }

        self.observers.borrow_mut().insert(key, Some(observer));
        key
    }

    fn remove_observer(&self, key: ObserverKey) -> bool {
        let removed = self.observers.borrow_mut().remove(&key);
        removed.is_some()
    }
}
