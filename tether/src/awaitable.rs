use crate::cell::{Registration, ResultCell};
use crate::error::{ContractViolation, fatal};
use crate::telemetry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

enum Kind<T> {
    /// The value is already here. `None` once it has been resumed.
    Immediate(Option<T>),

    /// The value lives in a cell published by someone else.
    Deferred(Arc<ResultCell<T>>),
}

/// A value the current computation needs, now or later.
///
/// An `Awaitable` is either *immediate*, carrying its value directly, or
/// *deferred*, pointing at a [`ResultCell`] that some task or promise will
/// publish into. The split between [`is_ready`](Self::is_ready) and
/// [`suspend`](Self::suspend) lets a caller skip suspension entirely whenever
/// the answer is already known.
///
/// `.await`ing an `Awaitable` checks readiness first and only registers the
/// current task's waker when the value is still pending.
pub struct Awaitable<T> {
    kind: Kind<T>,

    /// The waker this awaitable last registered on its cell, if any.
    ///
    /// Used to avoid stacking duplicate registrations when the owning task is
    /// re-polled for an unrelated reason.
    registered: Option<Waker>,
}

// The carried value is never pinned structurally.
impl<T> Unpin for Awaitable<T> {}

impl<T> Awaitable<T> {
    /// Wraps a value that is already available.
    pub fn immediate(value: T) -> Self {
        Self {
            kind: Kind::Immediate(Some(value)),
            registered: None,
        }
    }

    /// Waits on `cell`, which is published elsewhere.
    pub fn deferred(cell: Arc<ResultCell<T>>) -> Self {
        Self {
            kind: Kind::Deferred(cell),
            registered: None,
        }
    }

    /// Returns `true` for the immediate variant.
    pub fn is_immediate(&self) -> bool {
        matches!(self.kind, Kind::Immediate(_))
    }

    /// Returns whether the value can be resumed without suspending.
    ///
    /// Always `true` for an immediate value. For a deferred one, this is a
    /// snapshot of the cell taken under its lock. An abandoned cell counts as
    /// ready so that the caller proceeds and trips over the abandonment in
    /// [`resume`](Self::resume) rather than waiting forever. It is not
    /// reported to telemetry, since no value will ever be ready.
    pub fn is_ready(&self) -> bool {
        match &self.kind {
            Kind::Immediate(_) => {
                telemetry::immediate_ready();
                true
            }
            Kind::Deferred(cell) if cell.is_completed() => {
                telemetry::awaitable_ready();
                true
            }
            Kind::Deferred(cell) if cell.is_abandoned() => true,
            Kind::Deferred(_) => {
                telemetry::awaitable_need_to_wait();
                false
            }
        }
    }

    /// Registers `waker` on the backing cell.
    ///
    /// If the cell finished between the readiness check and this call, the
    /// waker is woken right away instead of being lost.
    ///
    /// A registration made here belongs to the caller: it stays on the cell
    /// until the cell finishes or the caller withdraws it with
    /// [`ResultCell::deregister`]. Registrations made by `.await` are
    /// withdrawn automatically when the awaitable is dropped.
    ///
    /// # Aborts
    ///
    /// Suspending an immediate value is a
    /// [`ContractViolation::SuspendImmediate`].
    #[track_caller]
    pub fn suspend(&self, waker: &Waker) {
        let Kind::Deferred(cell) = &self.kind else {
            fatal(ContractViolation::SuspendImmediate);
        };

        if cell.try_register(waker) == Registration::AlreadyDone {
            waker.wake_by_ref();
        }
    }
}

impl<T: Clone> Awaitable<T> {
    /// Produces the value.
    ///
    /// An immediate awaitable hands over the value it carries; a deferred one
    /// reads its cell.
    ///
    /// # Aborts
    ///
    /// Resuming an immediate awaitable twice, or a deferred one before its
    /// cell finished, halts with the corresponding [`ContractViolation`].
    #[track_caller]
    pub fn resume(&mut self) -> T {
        match &mut self.kind {
            Kind::Immediate(value) => value
                .take()
                .unwrap_or_else(|| fatal(ContractViolation::ImmediateConsumed)),
            Kind::Deferred(cell) => cell.read(),
        }
    }
}

impl<T: Clone> Future for Awaitable<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();

        if let Some(registered) = &this.registered {
            // Already waiting: only a finished cell ends the wait, anything
            // else is a wake-up meant for someone else.
            let Kind::Deferred(cell) = &this.kind else {
                unreachable!("immediate awaitables never register");
            };

            if cell.is_completed() || cell.is_abandoned() {
                this.registered = None;
                return Poll::Ready(this.resume());
            }

            if registered.will_wake(cx.waker()) {
                return Poll::Pending;
            }

            // Polled from a different task: move the registration over.
            cell.deregister(registered);
            this.registered = None;
        } else if this.is_ready() {
            return Poll::Ready(this.resume());
        }

        tracing::trace!("suspending on pending result");
        this.suspend(cx.waker());
        this.registered = Some(cx.waker().clone());

        Poll::Pending
    }
}

impl<T> Drop for Awaitable<T> {
    fn drop(&mut self) {
        // A waiting task that goes away must not leave its waker behind.
        if let (Some(waker), Kind::Deferred(cell)) = (self.registered.take(), &self.kind) {
            cell.deregister(&waker);
        }
    }
}

impl<T> From<Arc<ResultCell<T>>> for Awaitable<T> {
    fn from(cell: Arc<ResultCell<T>>) -> Self {
        Self::deferred(cell)
    }
}

impl<T> fmt::Debug for Awaitable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Immediate(value) => f
                .debug_struct("Awaitable::Immediate")
                .field("taken", &value.is_none())
                .finish(),
            Kind::Deferred(cell) => f
                .debug_struct("Awaitable::Deferred")
                .field("completed", &cell.is_completed())
                .finish(),
        }
    }
}
