use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

lazy_static::lazy_static! {
  static ref NEXT_BATCH_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// The future a task produces once invoked.
pub type TaskFuture<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'static>>;

/// The settlement record of a started task.
pub type TaskOutcome<R, E> = Result<R, TaskError<E>>;

type TaskFactory<R, E> = Box<dyn FnOnce() -> TaskFuture<R, E> + Send + 'static>;

/// A queued unit of work that has not been started yet.
///
/// The wrapped closure is only invoked when the scheduler gives the task a
/// slot, so nothing runs while the task sits in the queue.
pub struct BatchTask<R, E> {
  pub(crate) task_id: u64,
  factory: TaskFactory<R, E>,
}

impl<R, E> BatchTask<R, E> {
  pub fn new<F, Fut>(factory: F) -> Self
  where
    R: 'static,
    E: 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
  {
    Self {
      task_id: NEXT_BATCH_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed),
      factory: Box::new(move || Box::pin(factory()) as TaskFuture<R, E>),
    }
  }

  /// Returns the process-unique ID of this task.
  pub fn id(&self) -> u64 {
    self.task_id
  }

  /// Invokes the task, consuming it.
  pub(crate) fn invoke(self) -> TaskFuture<R, E> {
    (self.factory)()
  }
}

impl<R, E> fmt::Debug for BatchTask<R, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BatchTask")
      .field("task_id", &self.task_id)
      .finish_non_exhaustive()
  }
}
