//! # Tether
//!
//! **Tether** is a minimal cooperative task primitive: start a unit of
//! asynchronous work, let it run until it needs a result that is not there
//! yet, park it, and resume it automatically the moment that result is
//! published. No thread per task, no scheduler, no event loop.
//!
//! It is built from a handful of pieces:
//!
//! - [`ResultCell`]: a single-assignment slot plus the FIFO list of wakers
//!   waiting on it
//! - [`Awaitable`]: a value that is either already here or will arrive
//!   through a cell
//! - [`Task`]: the owner of a started body, itself awaitable
//! - [`Promise`]: the publishing side of a cell, for values produced outside
//!   any task
//!
//! Tasks start **eagerly**: [`spawn`] polls the body before returning. A body
//! that awaits a pending result registers its waker on that result's cell;
//! publishing the cell resumes it inline on the publisher's stack.
//!
//! ## Quick Start
//!
//! ```rust
//! #[tether::task]
//! async fn foo() -> i32 {
//!     42
//! }
//!
//! #[tether::task]
//! async fn bar() {
//!     assert_eq!(foo().await, 42);
//! }
//!
//! let task = bar();
//! assert!(task.is_ready());
//! ```
//!
//! ## Failure
//!
//! There is no error channel. Misusing a cell (reading it early, publishing
//! it twice, ...) or panicking inside a body aborts the process. See
//! [`ContractViolation`].
//!
//! ## Modules
//!
//! - [`task`] — Spawning, the task handle and its builder
//! - [`telemetry`] — Await-readiness counters

mod awaitable;
mod cell;
mod error;
mod promise;

pub mod task;
pub mod telemetry;

pub use awaitable::Awaitable;
pub use cell::{Registration, ResultCell};
pub use error::ContractViolation;
pub use promise::Promise;
pub use task::{Task, spawn};

pub use tether_macros::*;
