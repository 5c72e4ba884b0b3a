use crate::awaitable::Awaitable;
use crate::cell::ResultCell;

use std::fmt;
use std::sync::Arc;

/// The producing side of a result cell, detached from any task.
///
/// A `Promise` holds the single right to publish into its cell. Any number of
/// [`Awaitable`]s obtained from it can wait on the value, from any task.
/// Publishing consumes the promise, so the value can be written only once.
///
/// Dropping a promise that never published abandons its cell: waiters are
/// woken and halt on [`ContractViolation::Abandoned`](crate::ContractViolation)
/// rather than hanging.
///
/// # Examples
///
/// ```
/// use tether::Promise;
///
/// let promise = Promise::new();
/// let waiting = promise.awaitable();
/// let task = tether::spawn(async move { waiting.await + 1 });
///
/// assert!(!task.is_ready());
/// promise.publish(41);
/// assert_eq!(task.result(), 42);
/// ```
pub struct Promise<T> {
    /// `None` once published.
    cell: Option<Arc<ResultCell<T>>>,
}

impl<T> Promise<T> {
    /// Creates a promise with a fresh, pending cell.
    pub fn new() -> Self {
        Self {
            cell: Some(Arc::new(ResultCell::new())),
        }
    }

    /// Returns an awaitable on the promised value.
    ///
    /// After [`publish`](Self::publish) this is no longer reachable, since
    /// the promise is consumed.
    pub fn awaitable(&self) -> Awaitable<T> {
        match &self.cell {
            Some(cell) => Awaitable::deferred(cell.clone()),
            None => unreachable!("a promise is consumed by publishing"),
        }
    }

    /// Returns how many parties are currently waiting on the value.
    pub fn waiter_count(&self) -> usize {
        self.cell.as_ref().map_or(0, |cell| cell.waiter_count())
    }

    /// Publishes `value`, resuming every waiter inline before returning.
    pub fn publish(mut self, value: T) {
        if let Some(cell) = self.cell.take() {
            cell.publish(value);
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            cell.abandon();
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("waiters", &self.waiter_count())
            .finish()
    }
}
