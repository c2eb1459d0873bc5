use crate::task::TaskOutcome;

use futures::future::{BoxFuture, Shared};
use std::fmt;

pub(crate) type SharedOutcome<R, E> = Shared<BoxFuture<'static, TaskOutcome<R, E>>>;

/// A handle to a task the scheduler has started.
///
/// Handles are cheap to clone and every clone can await the same outcome.
/// The scheduler keeps one per started task, settled or not, which is what
/// [`crate::BatchScheduler::all`] and [`crate::BatchScheduler::all_settled`]
/// are built from.
pub struct TaskHandle<R, E> {
  pub(crate) task_id: u64,
  pub(crate) outcome: SharedOutcome<R, E>,
}

impl<R, E> TaskHandle<R, E>
where
  R: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  /// Returns the unique ID of this task.
  pub fn id(&self) -> u64 {
    self.task_id
  }

  /// Returns `true` once the task has succeeded, failed or panicked.
  pub fn is_settled(&self) -> bool {
    self.outcome.peek().is_some()
  }

  /// Returns the outcome without waiting, or `None` while the task is in flight.
  pub fn outcome(&self) -> Option<TaskOutcome<R, E>> {
    self.outcome.peek().cloned()
  }

  /// Awaits the settlement of the task and returns its outcome.
  pub async fn await_result(self) -> TaskOutcome<R, E> {
    self.outcome.await
  }
}

impl<R, E> Clone for TaskHandle<R, E> {
  fn clone(&self) -> Self {
    Self {
      task_id: self.task_id,
      outcome: self.outcome.clone(),
    }
  }
}

impl<R, E> fmt::Debug for TaskHandle<R, E>
where
  R: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskHandle")
      .field("task_id", &self.task_id)
      .field("settled", &self.is_settled())
      .finish()
  }
}
