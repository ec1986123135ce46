mod common;

use common::{Host, ms};
use lifecycle_dispatcher::runtime::live_tasks;
use lifecycle_dispatcher::time::{delay, timeout};
use lifecycle_dispatcher::{DispatchError, JoinSet, LifecycleState, spawn};

use futures::executor::block_on;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_task_waits_for_host_to_start() {
    let host = Host::new(LifecycleState::Created);
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();

    let handle = host.dispatcher.spawn(async move {
        flag.set(true);
        7
    });
    host.looper.run_until_idle();
    assert!(!ran.get());
    assert!(!handle.is_finished());

    host.set_state(LifecycleState::Started);
    host.looper.run_until_idle();

    assert!(ran.get());
    assert!(handle.is_finished());
    assert_eq!(block_on(handle), Ok(7));
    assert_eq!(live_tasks(), 0);
}

#[test]
fn test_delay_suspends_the_task() {
    let host = Host::new(LifecycleState::Resumed);
    let done = Rc::new(Cell::new(false));
    let flag = done.clone();

    let handle = host.dispatcher.spawn(async move {
        delay(ms(100)).await;
        flag.set(true);
    });

    host.looper.advance_by(ms(99));
    assert!(!done.get());
    assert_eq!(live_tasks(), 1);

    host.looper.advance_by(ms(1));
    assert!(done.get());
    assert!(handle.is_finished());
    assert_eq!(live_tasks(), 0);
}

#[test]
fn test_delay_finished_in_background_resumes_task_on_start() {
    let host = Host::new(LifecycleState::Resumed);
    let done = Rc::new(Cell::new(false));
    let flag = done.clone();

    let _handle = host.dispatcher.spawn(async move {
        delay(ms(100)).await;
        flag.set(true);
    });
    host.looper.run_pending();

    host.set_state(LifecycleState::Created);
    host.looper.advance_by(ms(150));
    assert!(!done.get());

    host.set_state(LifecycleState::Started);
    assert!(done.get(), "task resumes on the transition itself");
}

#[test]
fn test_abort_cancels_pending_delay() {
    let host = Host::new(LifecycleState::Resumed);

    let handle = host.dispatcher.spawn(async {
        delay(ms(1_000)).await;
    });
    host.looper.run_pending();
    assert_eq!(host.looper.pending_count(), 1);

    handle.abort();

    assert_eq!(host.looper.pending_count(), 0);
    assert!(handle.is_finished());
    assert_eq!(block_on(handle), Err(DispatchError::Cancelled));
    assert_eq!(live_tasks(), 0);
}

#[test]
fn test_timeout_elapses_before_inner_future() {
    let host = Host::new(LifecycleState::Resumed);

    let handle = host
        .dispatcher
        .spawn(async { timeout(ms(10), delay(ms(100))).await });

    host.looper.advance_by(ms(10));

    assert!(handle.is_finished());
    assert_eq!(host.looper.pending_count(), 0, "inner delay cancelled on drop");
    assert_eq!(block_on(handle), Ok(Err(DispatchError::TimedOut(ms(10)))));
}

#[test]
fn test_timeout_disposed_when_inner_future_wins() {
    let host = Host::new(LifecycleState::Resumed);

    let handle = host.dispatcher.spawn(async {
        timeout(ms(100), async {
            delay(ms(10)).await;
            "done"
        })
        .await
    });

    host.looper.advance_by(ms(10));

    assert_eq!(host.looper.pending_count(), 0);
    assert_eq!(block_on(handle), Ok(Ok("done")));
}

#[test]
fn test_spawned_children_share_the_dispatcher() {
    let host = Host::new(LifecycleState::Created);

    let handle = host.dispatcher.spawn(async {
        let mut set = JoinSet::new();
        for id in 1..=3u32 {
            set.push(spawn(async move {
                delay(ms(u64::from(id) * 10)).await;
                id * 2
            }));
        }
        set.await_all().await
    });

    host.set_state(LifecycleState::Started);
    host.looper.run_until_idle();

    assert_eq!(block_on(handle), Ok(vec![Ok(2), Ok(4), Ok(6)]));
}

#[test]
fn test_wake_from_another_thread() {
    let host = Host::new(LifecycleState::Resumed);
    let (sender, receiver) = futures::channel::oneshot::channel::<u32>();

    let handle = host
        .dispatcher
        .spawn(async move { receiver.await.unwrap_or(0) });
    host.looper.run_pending();
    assert!(!handle.is_finished());

    std::thread::spawn(move || sender.send(5).unwrap())
        .join()
        .unwrap();
    host.looper.run_pending();

    assert_eq!(block_on(handle), Ok(5));
}

#[test]
fn test_spawn_on_dropped_host_cancels_task() {
    let Host {
        looper,
        registry,
        dispatcher,
    } = Host::new(LifecycleState::Created);
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();

    drop(registry);
    let handle = dispatcher.spawn(async move { flag.set(true) });
    looper.run_until_idle();

    assert!(!ran.get());
    assert!(handle.is_finished());
    assert_eq!(block_on(handle), Err(DispatchError::Cancelled));
    assert_eq!(live_tasks(), 0);
}

#[test]
fn test_destroy_releases_waiting_tasks() {
    let host = Host::new(LifecycleState::Created);

    let handles: Vec<_> = (0..100)
        .map(|id| host.dispatcher.spawn(async move { id }))
        .collect();
    assert_eq!(live_tasks(), 100);

    host.set_state(LifecycleState::Destroyed);
    host.looper.run_until_idle();

    assert_eq!(live_tasks(), 0);
    for handle in handles {
        assert_eq!(block_on(handle), Err(DispatchError::Cancelled));
    }
}

#[test]
fn test_dropping_host_releases_waiting_tasks() {
    let Host {
        looper,
        registry,
        dispatcher,
    } = Host::new(LifecycleState::Created);

    for id in 0..10 {
        dispatcher.spawn(async move { id });
    }
    assert_eq!(live_tasks(), 10);

    drop(registry);
    looper.run_until_idle();

    assert_eq!(live_tasks(), 0);
}

#[test]
fn test_destroy_releases_task_waiting_after_delay() {
    let host = Host::new(LifecycleState::Resumed);
    let handle = host.dispatcher.spawn(async {
        delay(ms(10)).await;
    });
    host.looper.run_pending();

    host.set_state(LifecycleState::Created);
    host.looper.advance_by(ms(10));
    assert_eq!(live_tasks(), 1);
    assert_eq!(host.registry.observer_count(), 1);

    host.set_state(LifecycleState::Destroyed);

    assert_eq!(live_tasks(), 0);
    assert_eq!(block_on(handle), Err(DispatchError::Cancelled));
}

#[test]
fn test_dropping_host_releases_task_waiting_after_delay() {
    let Host {
        looper,
        registry,
        dispatcher,
    } = Host::new(LifecycleState::Resumed);
    let _handle = dispatcher.spawn(async {
        delay(ms(10)).await;
    });
    looper.run_pending();

    registry.set_current_state(LifecycleState::Created).unwrap();
    looper.advance_by(ms(10));
    assert_eq!(live_tasks(), 1);

    drop(registry);
    assert_eq!(live_tasks(), 0);
}

#[test]
fn test_quit_releases_queued_and_delayed_tasks() {
    let host = Host::new(LifecycleState::Resumed);

    let delayed = host.dispatcher.spawn(async {
        delay(ms(100)).await;
    });
    host.looper.run_pending();
    let queued = host.dispatcher.spawn(async { 1 });
    assert_eq!(live_tasks(), 2);

    host.looper.quit();

    assert_eq!(live_tasks(), 0);
    assert_eq!(block_on(delayed), Err(DispatchError::Cancelled));
    assert_eq!(block_on(queued), Err(DispatchError::Cancelled));
}

#[test]
fn test_delay_on_quit_looper_cancels_task() {
    let host = Host::new(LifecycleState::Resumed);
    let after = Rc::new(Cell::new(false));
    let flag = after.clone();
    let looper = host.looper.clone();

    let handle = host.dispatcher.spawn(async move {
        looper.quit();
        delay(ms(5)).await;
        flag.set(true);
    });
    host.looper.run_pending();

    assert!(!after.get());
    assert_eq!(block_on(handle), Err(DispatchError::Cancelled));
    assert_eq!(live_tasks(), 0);
}
