//! Fluent builder for [`LifecycleAwareDispatcher`] construction.
//!
//! Provides a builder pattern interface for choosing the handler the
//! dispatcher posts to and the lifecycle state it waits for.

use crate::dispatcher::LifecycleAwareDispatcher;
use crate::error::{DispatchError, Result};
use crate::lifecycle::{LifecycleOwner, LifecycleState, ReadinessGate};
use crate::looper::{Handler, Looper};

/// Builder for [`LifecycleAwareDispatcher`] instances.
///
/// Defaults: posts through an asynchronous handler on the calling thread's
/// [`Looper::current`], resolved when [`build`](Self::build) runs, and treats
/// the host as ready from `Started` on.
///
/// # Example
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .looper(&looper)
///     .min_state(LifecycleState::Resumed)
///     .build(&registry)?;
/// ```
pub struct DispatcherBuilder {
    handler: Option<Handler>,
    looper: Option<Looper>,
    asynchronous: bool,
    min_state: LifecycleState,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            handler: None,
            looper: None,
            asynchronous: true,
            min_state: LifecycleState::Started,
        }
    }

    /// Posts through `handler` as-is. Takes precedence over
    /// [`looper`](Self::looper) and [`asynchronous`](Self::asynchronous).
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Builds the handler on `looper` instead of the thread's default looper.
    pub fn looper(mut self, looper: &Looper) -> Self {
        self.looper = Some(looper.clone());
        self
    }

    /// Whether to ask for an asynchronous handler. Falls back to a
    /// synchronous one when the looper cannot provide it.
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Lowest lifecycle state at which the host counts as ready.
    pub fn min_state(mut self, state: LifecycleState) -> Self {
        self.min_state = state;
        self
    }

    /// Builds a dispatcher gated on `owner`'s lifecycle.
    ///
    /// # Errors
    /// [`DispatchError::InvalidThreshold`] if the minimum state is `Destroyed`
    /// or `Initialized`, neither of which gates anything.
    pub fn build(self, owner: &impl LifecycleOwner) -> Result<LifecycleAwareDispatcher> {
        if self.min_state < LifecycleState::Created {
            return Err(DispatchError::InvalidThreshold(self.min_state));
        }

        let handler = match self.handler {
            Some(handler) => handler,
            None => {
                let looper = self.looper.unwrap_or_else(Looper::current);
                Handler::for_looper(&looper, self.asynchronous)
            }
        };

        let gate = ReadinessGate::new(&owner.lifecycle(), self.min_state);
        Ok(LifecycleAwareDispatcher::with_gate(gate, handler))
    }
}
