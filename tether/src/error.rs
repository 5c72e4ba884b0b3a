use thiserror::Error;

/// A broken usage contract.
///
/// None of these are recoverable runtime conditions: they mean the embedding
/// code used a cell, an awaitable or a task in a way the primitive does not
/// allow. Every public operation that detects one halts through [`fatal`].
/// Only [`ResultCell::try_read`](crate::ResultCell::try_read) hands one back
/// as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// A result was read while its cell was still pending.
    #[error("value requested before completion")]
    ReadBeforeCompletion,

    /// `suspend` was called on an immediate awaitable.
    #[error("should never attempt to suspend on an immediate value")]
    SuspendImmediate,

    /// A cell received a second `publish`.
    #[error("result cell published twice")]
    DoublePublish,

    /// The value carried by an immediate awaitable was taken twice.
    #[error("immediate value already resumed")]
    ImmediateConsumed,

    /// The producer of a cell was dropped before it published.
    #[error("awaited result was abandoned before it was published")]
    Abandoned,
}

/// Logs the violation and halts the process.
///
/// The crate's own unit tests panic instead, so `#[should_panic]` can observe
/// the violation.
#[cold]
#[track_caller]
pub(crate) fn fatal(violation: ContractViolation) -> ! {
    tracing::error!(%violation, "fatal contract violation");

    #[cfg(test)]
    panic!("{violation}");

    #[cfg(not(test))]
    halt(&violation)
}

#[cfg(not(test))]
fn halt(reason: &dyn std::fmt::Display) -> ! {
    eprintln!("tether: fatal: {reason}");
    std::process::abort()
}

/// Turns a panic unwinding through its scope into a process abort.
///
/// Armed around every poll of a task body: a body that panics must not
/// unwind into whoever happened to resume it, leaving a half-drained waiter
/// list behind.
pub(crate) struct AbortOnUnwind;

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("task body panicked");

            #[cfg(not(test))]
            halt(&"task body panicked");
        }
    }
}
