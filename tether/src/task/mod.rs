//! Eagerly started tasks.
//!
//! A task wraps a body, any `Future + Send + 'static`, and runs it on the
//! thread that spawns it until the body awaits something that is not ready.
//! From then on the body is resumed by whoever publishes that value, inline,
//! on the publisher's thread. There is no scheduler and no run queue.
//!
//! It includes:
//! - the task handle, which is itself awaitable,
//! - a builder for naming tasks,
//! - the driver state machine and its waker.

pub(crate) mod state;
pub(crate) mod waker;

mod builder;
mod core;
mod handle;

pub use self::builder::Builder;
pub use self::core::spawn;
pub use self::handle::Task;
