//! Minimal task runtime that drives futures through a dispatch policy.

pub(crate) mod context;
pub mod continuation;
pub mod task;
pub(crate) mod waker;

pub use context::live_tasks;
pub use continuation::{Continuation, ContinuationState};
pub use task::{JoinHandle, JoinSet, spawn, spawn_on};
