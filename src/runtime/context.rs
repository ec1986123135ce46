//! Thread-local task registry and the context of the task being polled.
//!
//! Spawned tasks live in a per-thread slab so that `Send` wakers can refer to
//! them by key. While a task is polled, its dispatcher and a weak handle to
//! the task itself are installed here; [`delay`](crate::time::delay) and
//! [`timeout`](crate::time::timeout) read them to find the dispatcher to
//! suspend on and the task to resume inline.

use super::task::Runnable;
use crate::dispatcher::Dispatch;
use crate::utils::slab::{Key, Slab};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub(crate) type TaskKey = Key;

#[derive(Clone)]
struct Current {
    dispatcher: Rc<dyn Dispatch>,
    task: Weak<dyn Runnable>,
}

thread_local! {
    static TASKS: RefCell<Slab<Rc<dyn Runnable>>> = const { RefCell::new(Slab::new()) };

    static CURRENT: RefCell<Option<Current>> = const { RefCell::new(None) };
}

/// Runs `function` with `dispatcher` and `task` installed as the current
/// context, restoring the previous context afterwards.
pub(crate) fn enter_context<F, R>(dispatcher: Rc<dyn Dispatch>, task: Weak<dyn Runnable>, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT.with(|current| current.borrow_mut().replace(Current { dispatcher, task }));

    let result = function();

    let ours = CURRENT.with(|current| std::mem::replace(&mut *current.borrow_mut(), previous));
    drop(ours);

    result
}

pub(crate) fn current_dispatcher() -> Option<Rc<dyn Dispatch>> {
    CURRENT.with(|current| current.borrow().as_ref().map(|c| c.dispatcher.clone()))
}

pub(crate) fn current_task() -> Option<Weak<dyn Runnable>> {
    CURRENT.with(|current| current.borrow().as_ref().map(|c| c.task.clone()))
}

pub(crate) fn register_task(task: Rc<dyn Runnable>) -> TaskKey {
    TASKS.with(|tasks| tasks.borrow_mut().insert(task))
}

pub(crate) fn unregister_task(key: TaskKey) {
    let removed = TASKS.with(|tasks| tasks.borrow_mut().remove(key));
    drop(removed);
}

/// Schedules the task behind `key` if it is still alive on this thread.
pub(crate) fn schedule_local(key: TaskKey) {
    let task = TASKS.with(|tasks| tasks.borrow().get(key).cloned());
    if let Some(task) = task {
        task.schedule();
    }
}

/// Number of spawned tasks on this thread that have not finished.
pub fn live_tasks() -> usize {
    TASKS.with(|tasks| tasks.borrow().len())
}
