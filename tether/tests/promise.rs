use tether::{Awaitable, Promise, ResultCell, spawn};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::task::{Wake, Waker};
use std::thread;

struct CountingWaker(AtomicUsize);

impl Wake for CountingWaker {
    fn wake(self: Arc<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_publish_resumes_on_publishing_thread() {
    let promise = Promise::new();
    let gate = promise.awaitable();

    let task = spawn(async move {
        let value = gate.await;
        (value, thread::current().id())
    });

    let publisher = thread::spawn(move || {
        promise.publish(5);
        thread::current().id()
    });

    let publisher_id = publisher.join().unwrap();

    assert_eq!(task.result(), (5, publisher_id));
}

#[test]
fn test_racing_registrations_are_woken_exactly_once() {
    const PARTIES: usize = 4;

    for _ in 0..200 {
        let promise = Promise::new();
        let barrier = Barrier::new(PARTIES + 1);
        let wakers: Vec<Arc<CountingWaker>> = (0..PARTIES)
            .map(|_| Arc::new(CountingWaker(AtomicUsize::new(0))))
            .collect();
        let proceeded = AtomicUsize::new(0);

        thread::scope(|s| {
            for counter in &wakers {
                let awaitable = promise.awaitable();
                let barrier = &barrier;
                let proceeded = &proceeded;

                s.spawn(move || {
                    let waker = Waker::from(counter.clone());
                    barrier.wait();

                    if awaitable.is_ready() {
                        proceeded.fetch_add(1, Ordering::SeqCst);
                    } else {
                        awaitable.suspend(&waker);
                    }
                });
            }

            barrier.wait();
            promise.publish(1u8);
        });

        let woken: usize = wakers.iter().map(|w| w.0.load(Ordering::SeqCst)).sum();

        assert!(wakers.iter().all(|w| w.0.load(Ordering::SeqCst) <= 1));
        assert_eq!(woken + proceeded.load(Ordering::SeqCst), PARTIES);
    }
}

#[test]
fn test_tasks_spawned_on_many_threads_share_one_promise() {
    let promise = Promise::new();

    let tasks: Vec<_> = (0..8u64)
        .map(|i| {
            let gate = promise.awaitable();
            thread::spawn(move || spawn(async move { gate.await + i }))
                .join()
                .unwrap()
        })
        .collect();

    assert_eq!(promise.waiter_count(), 8);

    promise.publish(100u64);

    for (i, task) in tasks.iter().enumerate() {
        assert_eq!(task.result(), 100 + i as u64);
    }
}

#[test]
fn test_awaitable_from_shared_cell() {
    let cell = Arc::new(ResultCell::new());
    let awaitable: Awaitable<&str> = cell.clone().into();

    let task = spawn(async move { awaitable.await.len() });
    assert!(!task.is_ready());

    cell.publish("four");

    assert_eq!(task.result(), 4);
}

#[test]
fn test_dropped_promise_without_waiters_is_silent() {
    let promise = Promise::<u32>::new();
    let awaitable = promise.awaitable();
    drop(promise);

    assert!(awaitable.is_ready());
}
