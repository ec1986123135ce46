//! Lifecycle-aware dispatching of single-threaded async work.
//!
//! This crate provides a dispatcher that lets work posted to a single message
//! loop run right away while its host component is active, and holds it back
//! otherwise, releasing it as soon as the host becomes active again.
//!
//! # Architecture
//!
//! - **LifecycleAwareDispatcher**: the scheduling policy; routes every dispatch,
//!   delayed resumption and timeout through the readiness gate
//! - **ReadinessGate**: "is the host ready?" plus one-shot "tell me when it is"
//! - **LifecycleRegistry**: host-owned lifecycle state with ordered observers
//! - **Looper / Handler**: single-threaded delay/timer queue with cancellation
//! - **Tasks**: futures whose every poll goes through a [`Dispatch`] policy
//! - **Time**: [`time::delay`] and [`time::timeout`] on top of the dispatcher
//! - **DispatcherBuilder**: fluent configuration of handler and threshold
//!
//! # Example
//!
//! ```ignore
//! use lifecycle_dispatcher::{LifecycleOwner, LifecycleRegistry, LifecycleState, Looper};
//! use std::rc::Rc;
//!
//! let host = Rc::new(LifecycleRegistry::new());
//! let dispatcher = host.lifecycle_aware_dispatcher();
//!
//! dispatcher.spawn(async { println!("runs once the host is started") });
//!
//! host.set_current_state(LifecycleState::Started)?;
//! Looper::current().run_until_idle();
//! ```

mod builder;
mod dispatcher;
mod error;
pub mod lifecycle;
pub mod looper;
pub mod runtime;
pub mod time;
mod utils;

pub use builder::DispatcherBuilder;
pub use dispatcher::{Dispatch, LifecycleAwareDispatcher, MAX_DELAY, TimeoutHandle};
pub use error::{DispatchError, Result};
pub use lifecycle::{
    Lifecycle, LifecycleEvent, LifecycleOwner, LifecycleRegistry, LifecycleState, ReadinessGate,
};
pub use looper::{Handler, Looper};
pub use runtime::{Continuation, JoinHandle, JoinSet, spawn, spawn_on};
