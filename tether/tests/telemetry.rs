#![cfg(feature = "telemetry")]

use tether::telemetry::{self, Observer, Snapshot, Stats};
use tether::{Awaitable, Promise, spawn};

use std::sync::Arc;

struct Forward(Arc<Stats>);

impl Observer for Forward {
    fn awaitable_ready(&self) {
        self.0.awaitable_ready();
    }

    fn awaitable_need_to_wait(&self) {
        self.0.awaitable_need_to_wait();
    }

    fn immediate_ready(&self) {
        self.0.immediate_ready();
    }
}

fn delta(before: Snapshot, after: Snapshot) -> Snapshot {
    Snapshot {
        awaitable_ready: after.awaitable_ready - before.awaitable_ready,
        awaitable_need_to_wait: after.awaitable_need_to_wait - before.awaitable_need_to_wait,
        immediate_ready: after.immediate_ready - before.immediate_ready,
    }
}

// Counters are process-wide, so everything runs in one test.
#[test]
fn test_readiness_checks_are_counted() {
    let mirror = Arc::new(Stats::new());
    assert!(telemetry::set_observer(Box::new(Forward(mirror.clone()))).is_ok());
    assert!(telemetry::set_observer(Box::new(Stats::new())).is_err());

    let before = telemetry::snapshot();

    let immediate = Awaitable::immediate(1);
    assert!(immediate.is_ready());

    let promise = Promise::new();
    let gate = promise.awaitable();
    let waiting = spawn(async move { gate.await });
    promise.publish(2);
    assert!(waiting.is_ready());

    let reader = spawn(async move { waiting.await });
    assert_eq!(reader.result(), 2);

    let counted = delta(before, telemetry::snapshot());

    assert_eq!(
        counted,
        Snapshot {
            awaitable_ready: 1,
            awaitable_need_to_wait: 1,
            immediate_ready: 1,
        }
    );
    assert_eq!(mirror.snapshot(), counted);

    let abandoned = {
        let promise = Promise::<u8>::new();
        promise.awaitable()
    };
    let before_abandoned = telemetry::snapshot();

    assert!(abandoned.is_ready());
    assert_eq!(telemetry::snapshot(), before_abandoned);
}
