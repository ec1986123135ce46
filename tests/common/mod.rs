#![allow(dead_code)]

use lifecycle_dispatcher::looper::{ManualClock, Work};
use lifecycle_dispatcher::{
    DispatcherBuilder, LifecycleAwareDispatcher, LifecycleRegistry, LifecycleState, Looper,
};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// A host on a virtual-time looper, with a dispatcher using default settings.
pub struct Host {
    pub looper: Looper,
    pub registry: Rc<LifecycleRegistry>,
    pub dispatcher: LifecycleAwareDispatcher,
}

impl Host {
    pub fn new(state: LifecycleState) -> Self {
        init_test_logging();

        let looper = Looper::builder().clock(ManualClock::new()).build();
        let registry = Rc::new(LifecycleRegistry::new());
        registry.set_current_state(state).unwrap();
        let dispatcher = DispatcherBuilder::new()
            .looper(&looper)
            .build(&registry)
            .unwrap();

        Self {
            looper,
            registry,
            dispatcher,
        }
    }

    pub fn set_state(&self, state: LifecycleState) {
        self.registry.set_current_state(state).unwrap();
    }
}

pub type Log = Rc<RefCell<Vec<u32>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn record(log: &Log, id: u32) -> Work {
    let log = log.clone();
    Box::new(move || log.borrow_mut().push(id))
}
