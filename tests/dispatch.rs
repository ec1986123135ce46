mod common;

use common::{Host, init_test_logging, new_log, record};
use lifecycle_dispatcher::looper::{AsyncSupport, ManualClock};
use lifecycle_dispatcher::{
    Dispatch, DispatchError, DispatcherBuilder, LifecycleRegistry, LifecycleState, Looper,
};

use std::rc::Rc;

#[test]
fn test_ready_host_runs_work_without_transition() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();

    host.dispatcher.dispatch(record(&log, 1));
    assert!(log.borrow().is_empty(), "dispatch always goes through the looper");

    host.looper.run_until_idle();

    assert_eq!(*log.borrow(), vec![1]);
    assert_eq!(host.registry.observer_count(), 0);
}

#[test]
fn test_ready_dispatch_preserves_order() {
    let host = Host::new(LifecycleState::Started);
    let log = new_log();

    for id in 1..=3 {
        host.dispatcher.dispatch(record(&log, id));
    }
    host.looper.run_until_idle();

    assert_eq!(*log.borrow(), vec![1, 2, 3]);
}

#[test]
fn test_deferred_dispatch_runs_once_after_start() {
    let host = Host::new(LifecycleState::Created);
    let log = new_log();

    host.dispatcher.dispatch(record(&log, 1));
    host.looper.run_until_idle();
    assert!(log.borrow().is_empty(), "work must wait for the host");
    assert_eq!(host.registry.observer_count(), 1);

    host.set_state(LifecycleState::Started);
    host.looper.run_until_idle();
    assert_eq!(*log.borrow(), vec![1]);

    host.set_state(LifecycleState::Created);
    host.set_state(LifecycleState::Resumed);
    host.looper.run_until_idle();

    assert_eq!(*log.borrow(), vec![1], "work must run exactly once");
    assert_eq!(host.registry.observer_count(), 0);
}

#[test]
fn test_deferred_dispatch_releases_in_fifo_order() {
    let host = Host::new(LifecycleState::Created);
    let log = new_log();

    for id in 1..=4 {
        host.dispatcher.dispatch(record(&log, id));
    }
    host.set_state(LifecycleState::Resumed);
    host.looper.run_until_idle();

    assert_eq!(*log.borrow(), vec![1, 2, 3, 4]);
}

#[test]
fn test_work_from_before_stop_is_not_gated_again() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();

    // Already posted: the gate is consulted at dispatch time only.
    host.dispatcher.dispatch(record(&log, 1));
    host.set_state(LifecycleState::Created);
    host.dispatcher.dispatch(record(&log, 2));
    host.looper.run_until_idle();

    assert_eq!(*log.borrow(), vec![1]);

    host.set_state(LifecycleState::Started);
    host.looper.run_until_idle();
    assert_eq!(*log.borrow(), vec![1, 2]);
}

#[test]
fn test_destroyed_host_drops_deferred_work() {
    let host = Host::new(LifecycleState::Created);
    let log = new_log();

    host.dispatcher.dispatch(record(&log, 1));
    host.set_state(LifecycleState::Destroyed);
    assert_eq!(host.registry.observer_count(), 0);

    host.dispatcher.dispatch(record(&log, 2));
    host.looper.run_until_idle();

    assert!(log.borrow().is_empty());
    assert_eq!(host.registry.observer_count(), 0);
}

#[test]
fn test_dropped_host_drops_work() {
    let Host {
        looper,
        registry,
        dispatcher,
    } = Host::new(LifecycleState::Created);
    let log = new_log();

    drop(registry);
    dispatcher.dispatch(record(&log, 1));
    looper.run_until_idle();

    assert!(!dispatcher.is_ready());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_immediate_is_unsupported() {
    let host = Host::new(LifecycleState::Resumed);

    assert!(matches!(
        host.dispatcher.immediate(),
        Err(DispatchError::Unsupported(_))
    ));
}

#[test]
fn test_builder_rejects_thresholds_that_gate_nothing() {
    init_test_logging();
    let registry = Rc::new(LifecycleRegistry::new());
    let looper = Looper::builder().clock(ManualClock::new()).build();

    for state in [LifecycleState::Destroyed, LifecycleState::Initialized] {
        let result = DispatcherBuilder::new()
            .looper(&looper)
            .min_state(state)
            .build(&registry);
        assert_eq!(result.err(), Some(DispatchError::InvalidThreshold(state)));
    }
}

#[test]
fn test_builder_min_state_resumed() {
    init_test_logging();
    let registry = Rc::new(LifecycleRegistry::new());
    let looper = Looper::builder().clock(ManualClock::new()).build();
    let dispatcher = DispatcherBuilder::new()
        .looper(&looper)
        .min_state(LifecycleState::Resumed)
        .build(&registry)
        .unwrap();
    let log = new_log();

    registry.set_current_state(LifecycleState::Started).unwrap();
    dispatcher.dispatch(record(&log, 1));
    looper.run_until_idle();
    assert!(log.borrow().is_empty());

    registry.set_current_state(LifecycleState::Resumed).unwrap();
    looper.run_until_idle();
    assert_eq!(*log.borrow(), vec![1]);
}

#[test]
fn test_builder_handler_follows_async_support() {
    init_test_logging();
    let registry = Rc::new(LifecycleRegistry::new());

    let cases = [
        (AsyncSupport::Public, true),
        (
            AsyncSupport::Hidden {
                constructor_available: true,
            },
            true,
        ),
        (
            AsyncSupport::Hidden {
                constructor_available: false,
            },
            false,
        ),
        (AsyncSupport::Unavailable, false),
    ];

    for (support, expected) in cases {
        let looper = Looper::builder()
            .clock(ManualClock::new())
            .async_support(support)
            .build();
        let dispatcher = DispatcherBuilder::new()
            .looper(&looper)
            .build(&registry)
            .unwrap();
        assert_eq!(dispatcher.handler().is_async(), expected, "{support:?}");
    }
}

#[test]
fn test_async_handler_passes_sync_barrier() {
    init_test_logging();
    let registry = Rc::new(LifecycleRegistry::new());
    registry.set_current_state(LifecycleState::Resumed).unwrap();
    let looper = Looper::builder().clock(ManualClock::new()).build();

    let fast = DispatcherBuilder::new().looper(&looper).build(&registry).unwrap();
    let slow = DispatcherBuilder::new()
        .looper(&looper)
        .asynchronous(false)
        .build(&registry)
        .unwrap();
    let log = new_log();

    let barrier = looper.post_sync_barrier();
    slow.dispatch(record(&log, 1));
    fast.dispatch(record(&log, 2));
    looper.run_pending();
    assert_eq!(*log.borrow(), vec![2]);

    assert!(looper.remove_sync_barrier(barrier));
    looper.run_pending();
    assert_eq!(*log.borrow(), vec![2, 1]);
}

#[test]
fn test_quit_looper_drops_dispatched_work() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();

    host.looper.quit();
    host.dispatcher.dispatch(record(&log, 1));

    assert_eq!(host.looper.run_until_idle(), 0);
    assert!(log.borrow().is_empty());
}
