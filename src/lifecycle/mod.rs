//! Host lifecycle model and the readiness gate built on top of it.
//!
//! - [`state`]: lifecycle states and transition events
//! - [`registry`]: [`LifecycleRegistry`], a host-owned [`Lifecycle`] implementation
//! - [`gate`]: [`ReadinessGate`], the "is the host ready / tell me once it is" view
//!   the dispatcher consults

pub mod gate;
pub mod registry;
pub mod state;

pub use gate::{ReadinessGate, ReadinessRegistration};
pub use registry::LifecycleRegistry;
pub use state::{LifecycleEvent, LifecycleState};

use crate::dispatcher::LifecycleAwareDispatcher;
use crate::looper::{Handler, Looper};

use std::ops::ControlFlow;
use std::rc::Rc;

/// Callback invoked for every lifecycle event.
///
/// Returning [`ControlFlow::Break`] deregisters the observer.
pub type Observer = Box<dyn FnMut(LifecycleEvent) -> ControlFlow<()>>;

/// Identity of a registered observer, used to remove it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverKey(pub(crate) u64);

/// Observable lifecycle of a host component.
///
/// Implementations are single-threaded; observers are invoked on the thread
/// that drives the transition.
pub trait Lifecycle {
    /// The host's current state.
    fn current_state(&self) -> LifecycleState;

    /// Registers an observer for subsequent events.
    fn add_observer(&self, observer: Observer) -> ObserverKey;

    /// Removes an observer. Returns `false` if it was not registered.
    fn remove_observer(&self, key: ObserverKey) -> bool;
}

/// A component that exposes a [`Lifecycle`].
pub trait LifecycleOwner {
    fn lifecycle(&self) -> Rc<dyn Lifecycle>;

    /// Creates a dispatcher gated on this owner being at least `Started`.
    ///
    /// Work is posted to the current thread's looper through an asynchronous
    /// handler when the looper supports one.
    fn lifecycle_aware_dispatcher(&self) -> LifecycleAwareDispatcher
    where
        Self: Sized,
    {
        let handler = Handler::for_looper(&Looper::current(), true);
        LifecycleAwareDispatcher::new(self, handler)
    }
}

impl<L: Lifecycle + 'static> LifecycleOwner for Rc<L> {
    fn lifecycle(&self) -> Rc<dyn Lifecycle> {
        self.clone()
    }
}
