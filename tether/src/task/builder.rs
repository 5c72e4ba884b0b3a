use super::core::TaskCore;
use super::handle::Task;

use std::future::Future;
use std::sync::Arc;

/// Builder for configuring a task before starting it.
///
/// Currently, it supports attaching a name, which shows up in log events and
/// in [`Task::name`].
///
/// # Examples
///
/// ```
/// use tether::task::Builder;
///
/// let task = Builder::new().name("answer").spawn(async { 42 });
///
/// assert_eq!(task.name(), Some("answer"));
/// assert_eq!(task.result(), 42);
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    /// Label attached to the task.
    name: Option<String>,
}

impl Builder {
    /// Creates a builder for an unnamed task.
    pub fn new() -> Self {
        Self { name: None }
    }

    /// Sets the task name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Starts `body` on the calling thread and returns its handle.
    ///
    /// See [`spawn`](super::spawn) for the execution contract.
    pub fn spawn<F, T>(self, body: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let core = Arc::new(TaskCore::new(body, self.name));

        tracing::trace!(task = ?core.name(), "task spawned");
        core.drive();

        Task::new(core)
    }
}
