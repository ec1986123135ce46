//! Task wakers.
//!
//! A waker only carries the task's key, the thread that owns the task and the
//! owning looper's remote inbox, so it is `Send + Sync` even though tasks are
//! not. Waking on the owner thread schedules the task directly; waking from
//! any other thread posts the wake to the looper.

use super::context::{self, TaskKey};
use crate::looper::RemoteHandle;

use futures::task::{ArcWake, waker};
use std::sync::Arc;
use std::task::Waker;
use std::thread::{self, ThreadId};
use tracing::trace;

struct TaskWaker {
    key: TaskKey,
    owner: ThreadId,
    remote: RemoteHandle,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if thread::current().id() == arc_self.owner {
            context::schedule_local(arc_self.key);
            return;
        }

        let key = arc_self.key;
        if !arc_self.remote.post(move || context::schedule_local(key)) {
            trace!(?key, "looper quit, remote wake dropped");
        }
    }
}

/// Creates a waker for the task registered under `key` on the current thread.
pub(crate) fn make_waker(key: TaskKey, remote: RemoteHandle) -> Waker {
    waker(Arc::new(TaskWaker {
        key,
        owner: thread::current().id(),
        remote,
    }))
}
