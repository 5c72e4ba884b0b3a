use crate::error::{ContractViolation, fatal};

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::Waker;

/// Outcome of [`ResultCell::try_register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The cell had already finished. Nothing was stored; the caller must
    /// proceed (or resume itself) right away.
    AlreadyDone,

    /// The waker was appended to the waiter list and will be woken exactly
    /// once, when the cell finishes.
    Registered,
}

/// Where a cell is in its single-assignment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Completed,
    Abandoned,
}

/// State guarded by the cell mutex.
struct Slot<T> {
    /// Monotonic: once out of `Pending`, never back.
    phase: Phase,

    /// Written exactly once, on the `Pending -> Completed` transition.
    value: Option<T>,

    /// Continuations in registration order. Only grows while `Pending`.
    waiters: Vec<Waker>,
}

/// A single-assignment box for the eventual result of one computation.
///
/// A `ResultCell` starts empty, collects wakers from parties that need the
/// value, and is then published exactly once. Publishing stores the value and
/// wakes every registered waker in the order they registered. Wakers are
/// always invoked after the internal lock is released, so a woken task is
/// free to touch the same cell again while it resumes.
///
/// The no-value flavour is simply `ResultCell<()>`.
pub struct ResultCell<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> ResultCell<T> {
    /// Creates an empty, pending cell with no waiters.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                phase: Phase::Pending,
                value: None,
                waiters: Vec::new(),
            }),
        }
    }

    /// Every critical section below leaves the slot consistent before any
    /// code that could panic runs, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value`, marks the cell completed and wakes all waiters.
    ///
    /// The waiter list is swapped out under the lock and drained after the
    /// lock is dropped. Waiters run inline, on the caller's stack, before this
    /// method returns.
    ///
    /// # Aborts
    ///
    /// Publishing into a cell that already completed (or was abandoned) is a
    /// [`ContractViolation::DoublePublish`].
    #[track_caller]
    pub fn publish(&self, value: T) {
        let waiters = {
            let mut slot = self.lock();

            if slot.phase != Phase::Pending {
                drop(slot);
                fatal(ContractViolation::DoublePublish);
            }

            slot.value = Some(value);
            slot.phase = Phase::Completed;
            mem::take(&mut slot.waiters)
        };

        tracing::trace!(waiters = waiters.len(), "result published");

        for waiter in waiters {
            waiter.wake();
        }
    }

    /// Registers `waker` to be woken on completion, unless the cell already
    /// finished.
    ///
    /// The check and the append happen under one lock acquisition, so a
    /// registration racing with [`publish`](Self::publish) is either drained
    /// by it or told `AlreadyDone`; never both, never neither.
    pub fn try_register(&self, waker: &Waker) -> Registration {
        let mut slot = self.lock();

        if slot.phase != Phase::Pending {
            return Registration::AlreadyDone;
        }

        slot.waiters.push(waker.clone());
        Registration::Registered
    }

    /// Withdraws a registration made with a waker that wakes the same task as
    /// `waker`.
    ///
    /// Returns `false` if no such waker is waiting, either because it was
    /// never registered or because the cell already finished and drained it.
    /// The other waiters keep their order.
    pub fn deregister(&self, waker: &Waker) -> bool {
        let mut slot = self.lock();

        if slot.phase != Phase::Pending {
            return false;
        }

        match slot.waiters.iter().position(|w| w.will_wake(waker)) {
            Some(index) => {
                slot.waiters.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns `true` once the cell has been published.
    pub fn is_completed(&self) -> bool {
        self.lock().phase == Phase::Completed
    }

    /// Returns `true` if the producer went away without publishing.
    pub fn is_abandoned(&self) -> bool {
        self.lock().phase == Phase::Abandoned
    }

    /// Number of wakers currently waiting on this cell.
    pub fn waiter_count(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Terminates a pending cell without a value and wakes its waiters.
    ///
    /// Woken parties observe the abandonment when they try to read. A cell
    /// that already finished is left untouched.
    pub(crate) fn abandon(&self) {
        let waiters = {
            let mut slot = self.lock();

            if slot.phase != Phase::Pending {
                return;
            }

            slot.phase = Phase::Abandoned;
            mem::take(&mut slot.waiters)
        };

        if !waiters.is_empty() {
            tracing::warn!(
                waiters = waiters.len(),
                "result abandoned with registered waiters"
            );
        }

        for waiter in waiters {
            waiter.wake();
        }
    }
}

impl<T: Clone> ResultCell<T> {
    /// Returns a copy of the published value.
    ///
    /// Only valid once the caller saw [`Registration::AlreadyDone`] or was
    /// woken through its registration.
    ///
    /// # Aborts
    ///
    /// Reading a pending cell is [`ContractViolation::ReadBeforeCompletion`];
    /// reading an abandoned one is [`ContractViolation::Abandoned`].
    #[track_caller]
    pub fn read(&self) -> T {
        self.try_read().unwrap_or_else(|violation| fatal(violation))
    }

    /// Non-halting form of [`read`](Self::read).
    pub fn try_read(&self) -> Result<T, ContractViolation> {
        let slot = self.lock();

        match (slot.phase, &slot.value) {
            (Phase::Completed, Some(value)) => Ok(value.clone()),
            (Phase::Abandoned, _) => Err(ContractViolation::Abandoned),
            _ => Err(ContractViolation::ReadBeforeCompletion),
        }
    }
}

impl<T> Default for ResultCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use std::task::Wake;

    struct Recorder {
        id: usize,
        log: Arc<StdMutex<Vec<usize>>>,
    }

    impl Wake for Recorder {
        fn wake(self: Arc<Self>) {
            self.log.lock().unwrap().push(self.id);
        }
    }

    fn recorder(id: usize, log: &Arc<StdMutex<Vec<usize>>>) -> Waker {
        Waker::from(Arc::new(Recorder {
            id,
            log: log.clone(),
        }))
    }

    #[test]
    fn publish_wakes_in_registration_order() {
        let cell = ResultCell::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        for id in 0..5 {
            assert_eq!(
                cell.try_register(&recorder(id, &log)),
                Registration::Registered
            );
        }
        assert_eq!(cell.waiter_count(), 5);
        assert!(log.lock().unwrap().is_empty());

        cell.publish(7u32);

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(cell.waiter_count(), 0);
        assert_eq!(cell.read(), 7);
    }

    #[test]
    fn register_after_publish_is_refused() {
        let cell = ResultCell::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        cell.publish("done");

        assert_eq!(
            cell.try_register(&recorder(1, &log)),
            Registration::AlreadyDone
        );
        assert_eq!(cell.waiter_count(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn try_read_reports_pending_and_abandoned() {
        let pending: ResultCell<u8> = ResultCell::new();
        assert_eq!(
            pending.try_read(),
            Err(ContractViolation::ReadBeforeCompletion)
        );

        pending.abandon();
        assert!(pending.is_abandoned());
        assert!(!pending.is_completed());
        assert_eq!(pending.try_read(), Err(ContractViolation::Abandoned));
    }

    #[test]
    fn abandon_wakes_waiters_once() {
        let cell: ResultCell<()> = ResultCell::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        cell.try_register(&recorder(3, &log));
        cell.abandon();
        cell.abandon();

        assert_eq!(*log.lock().unwrap(), vec![3]);
    }

    #[test]
    fn deregister_keeps_the_others_in_order() {
        let cell = ResultCell::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let wakers: Vec<Waker> = (0..3).map(|id| recorder(id, &log)).collect();

        for waker in &wakers {
            cell.try_register(waker);
        }

        assert!(cell.deregister(&wakers[1]));
        assert!(!cell.deregister(&wakers[1]));
        assert_eq!(cell.waiter_count(), 2);

        cell.publish(());

        assert_eq!(*log.lock().unwrap(), vec![0, 2]);
        assert!(!cell.deregister(&wakers[0]));
    }

    #[test]
    fn abandon_after_publish_keeps_value() {
        let cell = ResultCell::new();
        cell.publish(1i64);
        cell.abandon();

        assert!(cell.is_completed());
        assert_eq!(cell.read(), 1);
    }

    #[test]
    #[should_panic(expected = "result cell published twice")]
    fn second_publish_is_fatal() {
        let cell = ResultCell::new();
        cell.publish(1);
        cell.publish(2);
    }

    #[test]
    #[should_panic(expected = "value requested before completion")]
    fn read_before_publish_is_fatal() {
        let cell: ResultCell<String> = ResultCell::new();
        let _ = cell.read();
    }

    #[test]
    fn waiter_may_reenter_cell_while_woken() {
        struct Reentrant {
            cell: Arc<ResultCell<u8>>,
            seen: Arc<StdMutex<Option<u8>>>,
        }

        impl Wake for Reentrant {
            fn wake(self: Arc<Self>) {
                *self.seen.lock().unwrap() = Some(self.cell.read());
            }
        }

        let cell = Arc::new(ResultCell::new());
        let seen = Arc::new(StdMutex::new(None));
        let waker = Waker::from(Arc::new(Reentrant {
            cell: cell.clone(),
            seen: seen.clone(),
        }));

        cell.try_register(&waker);
        cell.publish(9);

        assert_eq!(*seen.lock().unwrap(), Some(9));
    }
}
