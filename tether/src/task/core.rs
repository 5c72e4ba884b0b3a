use super::builder::Builder;
use super::handle::Task;
use super::state::{ABANDONED, IDLE, NOTIFIED, PUBLISHED, RUNNING};
use super::waker::make_waker;
use crate::cell::ResultCell;
use crate::error::AbortOnUnwind;

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

type Frame<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The shared part of a task: its suspended body and its result cell.
///
/// The public [`Task`] handle owns one strong reference; every waker the body
/// leaves behind in some other cell owns another. Whoever moves `state` into
/// `RUNNING` is the only party allowed to touch `frame` until it moves it out
/// again.
pub(crate) struct TaskCore<T> {
    /// The body. `None` once it returned or was abandoned.
    frame: Mutex<Option<Frame<T>>>,

    /// Where the body's value is published.
    pub(crate) cell: Arc<ResultCell<T>>,

    /// One of the constants in [`super::state`].
    state: AtomicUsize,

    /// Label used in log events.
    name: Option<String>,
}

impl<T> TaskCore<T> {
    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn lock_frame(&self) -> MutexGuard<'_, Option<Frame<T>>> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gives up on the body because its handle is going away.
    ///
    /// If the body is suspended, its frame is destroyed here and the cell is
    /// abandoned. If it is being polled right now, possibly further up this
    /// very stack, only the state changes; the polling side notices once the
    /// poll returns and finishes the job. A body that already published is
    /// left alone.
    pub(crate) fn abandon(&self) {
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                matches!(state, IDLE | RUNNING | NOTIFIED).then_some(ABANDONED)
            });

        if previous == Ok(IDLE) {
            self.finish_abandon();
        }
    }

    fn finish_abandon(&self) {
        let body = self.lock_frame().take();
        drop(body);

        tracing::trace!(task = ?self.name(), "task abandoned");
        self.cell.abandon();
    }
}

impl<T: Send + 'static> TaskCore<T> {
    /// Creates a core that is already in the `RUNNING` state, ready for the
    /// eager first [`drive`](Self::drive).
    pub(crate) fn new<F>(body: F, name: Option<String>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            frame: Mutex::new(Some(Box::pin(body))),
            cell: Arc::new(ResultCell::new()),
            state: AtomicUsize::new(RUNNING),
            name,
        }
    }

    /// Polls the body until it suspends, publishes or gets abandoned.
    ///
    /// The caller must have moved the state into `RUNNING`. A wake-up that
    /// lands while the body is being polled turns `RUNNING` into `NOTIFIED`
    /// and is served by polling again here.
    pub(crate) fn drive(self: &Arc<Self>) {
        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        loop {
            let poll = {
                let mut frame = self.lock_frame();
                let Some(body) = frame.as_mut() else {
                    return;
                };

                let guard = AbortOnUnwind;
                let poll = body.as_mut().poll(&mut cx);
                mem::forget(guard);
                poll
            };

            match poll {
                Poll::Pending => {
                    if self
                        .state
                        .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        tracing::trace!(task = ?self.name(), "task suspended");
                        return;
                    }

                    if self
                        .state
                        .compare_exchange(NOTIFIED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        // The handle was dropped during the poll.
                        self.finish_abandon();
                        return;
                    }
                }
                Poll::Ready(value) => {
                    let published = self
                        .state
                        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                            matches!(state, RUNNING | NOTIFIED).then_some(PUBLISHED)
                        })
                        .is_ok();

                    if !published {
                        drop(value);
                        self.finish_abandon();
                        return;
                    }

                    let body = self.lock_frame().take();
                    drop(body);

                    tracing::trace!(task = ?self.name(), "task completed");
                    self.cell.publish(value);
                    return;
                }
            }
        }
    }

    /// Resumes a suspended body on the calling thread.
    ///
    /// - `IDLE`: claims the body and drives it right here.
    /// - `RUNNING`: records the wake-up as `NOTIFIED` for the poller.
    /// - anything else: nothing left to resume.
    pub(crate) fn wake(self: &Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        tracing::trace!(task = ?self.name(), "task resumed");
                        self.drive();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // NOTIFIED, PUBLISHED or ABANDONED.
                _ => return,
            }
        }
    }
}

/// Starts `body` as a task on the calling thread.
///
/// The body runs immediately, up to its first await on a result that is not
/// available yet (or to completion). By the time this returns, the body has
/// made all the progress it can without outside help, and
/// [`Task::is_ready`] tells whether it finished.
///
/// Later resumptions happen inline, on whichever thread publishes the result
/// the body is waiting for.
///
/// # Examples
///
/// ```
/// let answer = tether::spawn(async { 42 });
/// assert!(answer.is_ready());
///
/// let doubled = tether::spawn(async move { answer.await * 2 });
/// assert_eq!(doubled.result(), 84);
/// ```
pub fn spawn<F, T>(body: F) -> Task<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    Builder::new().spawn(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicBool;
    use std::task::Waker;

    /// Suspends once, waking itself while still being polled.
    struct SelfWake(bool);

    impl Future for SelfWake {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                return Poll::Ready(());
            }
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    /// Suspends until woken from outside, keeping the waker it was given.
    struct Parked {
        waker: Arc<Mutex<Option<Waker>>>,
        released: Arc<AtomicBool>,
    }

    impl Future for Parked {
        type Output = ();

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.released.load(Ordering::SeqCst) {
                return Poll::Ready(());
            }
            *self.waker.lock().unwrap() = Some(cx.waker().clone());
            Poll::Pending
        }
    }

    #[test]
    fn wake_during_poll_repolls_instead_of_reentering() {
        let core = Arc::new(TaskCore::new(SelfWake(false), None));
        core.drive();

        assert_eq!(core.state.load(Ordering::SeqCst), PUBLISHED);
        assert!(core.cell.is_completed());
        assert!(core.lock_frame().is_none());
    }

    #[test]
    fn external_wake_resumes_idle_body() {
        let waker = Arc::new(Mutex::new(None));
        let released = Arc::new(AtomicBool::new(false));
        let core = Arc::new(TaskCore::new(
            Parked {
                waker: waker.clone(),
                released: released.clone(),
            },
            Some("parked".into()),
        ));

        core.drive();
        assert_eq!(core.state.load(Ordering::SeqCst), IDLE);

        released.store(true, Ordering::SeqCst);
        waker.lock().unwrap().take().unwrap().wake();

        assert_eq!(core.state.load(Ordering::SeqCst), PUBLISHED);
        assert!(core.cell.is_completed());
    }

    #[test]
    fn abandon_idle_body_drops_frame_and_cell() {
        let waker = Arc::new(Mutex::new(None));
        let core = Arc::new(TaskCore::new(
            Parked {
                waker: waker.clone(),
                released: Arc::new(AtomicBool::new(false)),
            },
            None,
        ));

        core.drive();
        core.abandon();

        assert_eq!(core.state.load(Ordering::SeqCst), ABANDONED);
        assert!(core.lock_frame().is_none());
        assert!(core.cell.is_abandoned());

        // A stale waker is harmless once the body is gone.
        waker.lock().unwrap().take().unwrap().wake();
        assert_eq!(core.state.load(Ordering::SeqCst), ABANDONED);
    }

    #[test]
    fn abandon_after_publish_is_a_no_op() {
        let core = Arc::new(TaskCore::new(async { 3 }, None));
        core.drive();
        core.abandon();

        assert_eq!(core.state.load(Ordering::SeqCst), PUBLISHED);
        assert_eq!(core.cell.read(), 3);
    }
}
