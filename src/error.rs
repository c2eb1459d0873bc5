use thiserror::Error;

/// Errors raised by the scheduler itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
  #[error("Scheduler width must be at least 1, a zero-width scheduler would never start a task")]
  ZeroWidth,
}

/// Why a started task did not produce a value.
///
/// Task failures are isolated: they never stop the scheduler and never reach
/// the completion signal. They surface only through [`crate::BatchScheduler::all`],
/// [`crate::BatchScheduler::all_settled`] and [`crate::TaskHandle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError<E> {
  #[error("Task failed: {0}")]
  Failed(E),

  #[error("Task panicked during execution")]
  Panicked,
}

impl<E> TaskError<E> {
  /// Returns the task's own error value, if it failed rather than panicked.
  pub fn into_failure(self) -> Option<E> {
    match self {
      TaskError::Failed(e) => Some(e),
      TaskError::Panicked => None,
    }
  }
}
