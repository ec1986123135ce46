mod common;

use common::{Host, ms, new_log, record};
use lifecycle_dispatcher::{Dispatch, LifecycleState, MAX_DELAY};

use std::time::Duration;

#[test]
fn test_timeout_fires_regardless_of_readiness() {
    let host = Host::new(LifecycleState::Created);
    let log = new_log();

    let handle = host.dispatcher.invoke_on_timeout(ms(50), record(&log, 1));

    host.looper.advance_by(ms(49));
    assert!(log.borrow().is_empty());

    host.looper.advance_by(ms(1));
    assert_eq!(*log.borrow(), vec![1]);
    assert_eq!(host.registry.observer_count(), 0);
    assert!(!handle.is_disposed());
}

#[test]
fn test_disposed_timeout_never_runs() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();

    let handle = host.dispatcher.invoke_on_timeout(ms(10), record(&log, 1));
    host.looper.advance_by(ms(5));

    handle.dispose();
    assert!(handle.is_disposed());
    assert_eq!(host.looper.pending_count(), 0);

    host.looper.advance_by(ms(10));
    assert!(log.borrow().is_empty());

    handle.dispose();
}

#[test]
fn test_dispose_after_run_is_noop() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();

    let handle = host.dispatcher.invoke_on_timeout(ms(1), record(&log, 1));
    let other = host.dispatcher.invoke_on_timeout(ms(5), record(&log, 2));
    host.looper.advance_by(ms(1));

    handle.dispose();
    host.looper.run_until_idle();

    assert_eq!(*log.borrow(), vec![1, 2]);
    assert!(!other.is_disposed());
}

#[test]
fn test_dropping_handle_keeps_timeout() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();

    drop(host.dispatcher.invoke_on_timeout(ms(3), record(&log, 1)));
    host.looper.run_until_idle();

    assert_eq!(*log.borrow(), vec![1]);
}

#[test]
fn test_timeout_delay_is_clamped() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();

    let _handle = host
        .dispatcher
        .invoke_on_timeout(Duration::MAX, record(&log, 1));

    assert_eq!(host.looper.next_deadline(), Some(MAX_DELAY));
}

#[test]
fn test_timeout_on_quit_looper_is_already_disposed() {
    let host = Host::new(LifecycleState::Resumed);
    let log = new_log();
    host.looper.quit();

    let handle = host.dispatcher.invoke_on_timeout(ms(1), record(&log, 1));

    assert!(handle.is_disposed());
    host.looper.run_until_idle();
    assert!(log.borrow().is_empty());
}
