//! Time utilities for tasks driven by a dispatcher.
//!
//! - [`delay`] suspends the current task; it resumes only once the delay has
//!   elapsed and the host is ready
//! - [`timeout`] runs a future with a deadline that fires regardless of
//!   readiness
//!
//! Both read the current task's dispatcher and must be polled from inside a
//! spawned task.
//!
//! # Example: Timeout expires
//!
//! ```ignore
//! use lifecycle_dispatcher::DispatchError;
//! use lifecycle_dispatcher::time::{delay, timeout};
//! use std::time::Duration;
//!
//! dispatcher.spawn(async {
//!     let result = timeout(Duration::from_millis(10), delay(Duration::from_millis(100))).await;
//!     assert!(matches!(result, Err(DispatchError::TimedOut(_))));
//! });
//! ```

pub mod delay;
pub mod timeout;

pub use delay::{Delay, delay};
pub use timeout::{Timeout, timeout};
