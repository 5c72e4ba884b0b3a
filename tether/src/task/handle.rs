use super::core::TaskCore;
use crate::awaitable::Awaitable;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A started computation and its eventual result.
///
/// A `Task` is the exclusive owner of a body started by
/// [`spawn`](super::spawn). It cannot be cloned, only moved. It implements
/// [`Future`], so another task body can `.await` it: if the result is already
/// published the await completes on the spot, otherwise the awaiting body
/// registers on this task's result and is resumed when it is published.
///
/// Dropping a `Task` destroys its body. If the body had not published yet,
/// its result is abandoned: every party still waiting on it is woken and
/// halts with [`ContractViolation::Abandoned`](crate::ContractViolation)
/// instead of waiting forever.
#[must_use = "dropping a task abandons its result"]
pub struct Task<T> {
    core: Arc<TaskCore<T>>,

    /// Used when this handle itself is awaited.
    awaitable: Awaitable<T>,
}

impl<T> Task<T> {
    pub(crate) fn new(core: Arc<TaskCore<T>>) -> Self {
        let awaitable = Awaitable::deferred(core.cell.clone());
        Self { core, awaitable }
    }

    /// Returns `true` once the body has returned and its value is published.
    pub fn is_ready(&self) -> bool {
        self.core.cell.is_completed()
    }

    /// The name given through [`Builder::name`](super::Builder::name).
    pub fn name(&self) -> Option<&str> {
        self.core.name()
    }

    /// Returns a fresh awaitable on this task's result.
    ///
    /// Useful when several bodies need to wait on one task while the handle
    /// stays with its owner.
    pub fn awaitable(&self) -> Awaitable<T> {
        Awaitable::deferred(self.core.cell.clone())
    }
}

impl<T: Clone> Task<T> {
    /// Returns a copy of the published value.
    ///
    /// # Aborts
    ///
    /// Halts with [`ContractViolation::ReadBeforeCompletion`] if the body has
    /// not finished.
    ///
    /// [`ContractViolation::ReadBeforeCompletion`]: crate::ContractViolation::ReadBeforeCompletion
    #[track_caller]
    pub fn result(&self) -> T {
        self.core.cell.read()
    }
}

impl<T: Clone> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.get_mut().awaitable).poll(cx)
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        self.core.abandon();
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name())
            .field("ready", &self.is_ready())
            .finish()
    }
}
