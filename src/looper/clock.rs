//! Time sources for the looper.
//!
//! The looper measures deadlines as a monotonic uptime ([`Duration`] since the
//! clock's origin). [`SystemClock`] follows real time; [`ManualClock`] only
//! moves when the looper waits on it, which makes delayed work deterministic.

use super::remote::RemoteInbox;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Current uptime.
    fn now(&self) -> Duration;

    /// Blocks until `deadline`, returning early if cross-thread work arrives.
    fn wait_until(&self, deadline: Duration, remote: &RemoteInbox);
}

/// Real monotonic time, starting at zero when the clock is created.
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wait_until(&self, deadline: Duration, remote: &RemoteInbox) {
        let now = self.now();
        if deadline > now {
            remote.wait_timeout(deadline - now);
        }
    }
}

/// Virtual time that jumps straight to whatever deadline the looper waits for.
///
/// Cloning shares the same timeline.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn wait_until(&self, deadline: Duration, _remote: &RemoteInbox) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}
