//! Driver states of a task.
//!
//! From the outside a task is either running or published. Internally the
//! driver splits "running" into three sub-states so that a wake-up arriving
//! while the body is being polled is recorded instead of re-entering it.

/// The body is suspended on some pending result and nobody is polling it.
pub(crate) const IDLE: usize = 0;

/// The body is being polled.
///
/// At most one thread observes this state at a time; it alone may touch the
/// frame.
pub(crate) const RUNNING: usize = 1;

/// The body was woken while being polled.
///
/// The thread polling it polls once more instead of going idle.
pub(crate) const NOTIFIED: usize = 2;

/// The body returned and its value was handed to the result cell.
///
/// Terminal.
pub(crate) const PUBLISHED: usize = 3;

/// The owning handle was dropped before the body returned.
///
/// Terminal. The frame has been or is about to be destroyed and the result
/// cell is abandoned.
pub(crate) const ABANDONED: usize = 4;
