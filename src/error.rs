//! Error type shared by every fallible operation in the crate.

use crate::lifecycle::LifecycleState;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Illegal lifecycle transition from {from:?} to {to:?}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Readiness threshold {0:?} does not gate a live host")]
    InvalidThreshold(LifecycleState),

    #[error("Timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Task was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, DispatchError>;
