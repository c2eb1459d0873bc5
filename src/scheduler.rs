use crate::error::{SchedulerError, TaskError};
use crate::handle::{SharedOutcome, TaskHandle};
use crate::signal::CompletionSignal;
use crate::task::{BatchTask, TaskOutcome};

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

struct SchedulerState<R, E> {
  queued: VecDeque<BatchTask<R, E>>,
  /// Every task ever started, in start order. Never shrinks.
  running: Vec<TaskHandle<R, E>>,
  /// Started but not yet settled.
  active: usize,
  started: bool,
}

/// Runs queued tasks at most `width` at a time.
///
/// Tasks start in FIFO order. Whenever a running task settles, successfully
/// or not, the freed slot is refilled from the front of the queue. The
/// [`CompletionSignal`] fires once the scheduler has been started, the queue is
/// empty and no started task is still in flight.
pub struct BatchScheduler<R, E> {
  scheduler_name: Arc<String>,
  width: usize,
  state: Mutex<SchedulerState<R, E>>,
  completion: CompletionSignal,
  tokio_handle: TokioHandle,
}

impl<R, E> BatchScheduler<R, E>
where
  R: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  /// Creates an idle scheduler that will spawn its tasks on `tokio_handle`.
  ///
  /// # Errors
  /// Returns `SchedulerError::ZeroWidth` if `width` is 0, since such a
  /// scheduler could never start a task nor fire its completion signal.
  pub fn new(width: usize, tokio_handle: TokioHandle, scheduler_name: &str) -> Result<Arc<Self>, SchedulerError> {
    if width == 0 {
      warn!(scheduler_name, "Rejected scheduler construction with zero width.");
      return Err(SchedulerError::ZeroWidth);
    }

    debug!(scheduler_name, width, "Scheduler created.");
    Ok(Arc::new(Self {
      scheduler_name: Arc::new(scheduler_name.to_string()),
      width,
      state: Mutex::new(SchedulerState {
        queued: VecDeque::new(),
        running: Vec::new(),
        active: 0,
        started: false,
      }),
      completion: CompletionSignal::new(),
      tokio_handle,
    }))
  }

  /// Label used on every log line of this scheduler.
  pub fn name(&self) -> &str {
    &self.scheduler_name
  }

  /// Maximum number of tasks in flight at once.
  pub fn width(&self) -> usize {
    self.width
  }

  /// Appends tasks to the back of the queue and returns the queue length.
  ///
  /// Nothing is started here. Tasks added after [`BatchScheduler::start`] wait
  /// for a running task to settle and are then picked up in FIFO order. After
  /// completion the scheduler is inert and the tasks remain queued forever.
  pub fn enqueue<I>(&self, tasks: I) -> usize
  where
    I: IntoIterator<Item = BatchTask<R, E>>,
  {
    let mut state = self.state.lock();
    let before = state.queued.len();
    state.queued.extend(tasks);
    debug!(
      scheduler_name = %*self.scheduler_name,
      added = state.queued.len() - before,
      queued = state.queued.len(),
      "Enqueued tasks."
    );

    if state.started && self.completion.is_fired() {
      warn!(
        scheduler_name = %*self.scheduler_name,
        "Tasks enqueued after the batch completed. They will not be started."
      );
    }
    state.queued.len()
  }

  /// Enqueues a single closure as a task. See [`BatchScheduler::enqueue`].
  pub fn enqueue_fn<F, Fut>(&self, factory: F) -> usize
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
  {
    self.enqueue([BatchTask::new(factory)])
  }

  /// Starts up to `width` queued tasks and returns the completion signal.
  ///
  /// Calling this again is a no-op that returns the same signal.
  pub fn start(self: &Arc<Self>) -> CompletionSignal {
    let mut state = self.state.lock();
    if state.started {
      debug!(scheduler_name = %*self.scheduler_name, "Start called on an already started scheduler. Ignoring.");
      return self.completion.clone();
    }
    state.started = true;

    info!(
      scheduler_name = %*self.scheduler_name,
      width = self.width,
      queued = state.queued.len(),
      "Starting scheduler."
    );
    self.fill_slots(&mut state);
    self.complete_if_drained(&state);
    self.completion.clone()
  }

  /// Number of tasks waiting for a slot.
  pub fn queued_count(&self) -> usize {
    self.state.lock().queued.len()
  }

  /// Number of tasks ever started, including those that have settled.
  ///
  /// Use [`BatchScheduler::active_count`] for the number still in flight.
  pub fn running_count(&self) -> usize {
    self.state.lock().running.len()
  }

  /// Number of started tasks that have not settled yet. Never exceeds `width`.
  pub fn active_count(&self) -> usize {
    self.state.lock().active
  }

  /// Returns `true` once [`BatchScheduler::start`] has been called.
  pub fn is_started(&self) -> bool {
    self.state.lock().started
  }

  /// Returns `true` once the completion signal has fired.
  pub fn is_complete(&self) -> bool {
    self.completion.is_fired()
  }

  /// Handles of every task started so far, in start order.
  pub fn handles(&self) -> Vec<TaskHandle<R, E>> {
    self.state.lock().running.clone()
  }

  /// Resolves to every started task's value in start order, or to the first
  /// failure observed. Failing early does not abort the remaining tasks.
  ///
  /// Only tasks started before this call are included.
  pub async fn all(&self) -> Result<Vec<R>, TaskError<E>> {
    try_join_all(self.snapshot_outcomes()).await
  }

  /// Resolves once every task started before this call has settled, with one
  /// outcome per task in start order.
  pub async fn all_settled(&self) -> Vec<TaskOutcome<R, E>> {
    join_all(self.snapshot_outcomes()).await
  }

  fn snapshot_outcomes(&self) -> Vec<SharedOutcome<R, E>> {
    let state = self.state.lock();
    state.running.iter().map(|handle| handle.outcome.clone()).collect()
  }

  fn fill_slots(self: &Arc<Self>, state: &mut SchedulerState<R, E>) {
    while state.active < self.width {
      let Some(task) = state.queued.pop_front() else {
        trace!(scheduler_name = %*self.scheduler_name, active = state.active, "Queue empty, slot left idle.");
        break;
      };
      self.launch(state, task);
    }
  }

  fn launch(self: &Arc<Self>, state: &mut SchedulerState<R, E>, task: BatchTask<R, E>) {
    let task_id = task.task_id;
    let scheduler_name_for_task = self.scheduler_name.clone();

    // Invoking the factory happens inside the guarded future so a panic there
    // settles the task like any other panic.
    let outcome = AssertUnwindSafe(async move { task.invoke().await })
      .catch_unwind()
      .map(move |result| match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TaskError::Failed(e)),
        Err(_panic_payload) => {
          error!(scheduler_name = %*scheduler_name_for_task, %task_id, "Task panicked during execution.");
          Err(TaskError::Panicked)
        }
      })
      .boxed()
      .shared();

    state.active += 1;
    state.running.push(TaskHandle {
      task_id,
      outcome: outcome.clone(),
    });
    debug!(
      scheduler_name = %*self.scheduler_name,
      %task_id,
      active = state.active,
      queued = state.queued.len(),
      "Launched task."
    );

    let scheduler = Arc::clone(self);
    self.tokio_handle.spawn(
      async move {
        let succeeded = outcome.await.is_ok();
        scheduler.on_settled(task_id, succeeded);
      }
      .instrument(info_span!("batch_task", scheduler_name = %*self.scheduler_name, %task_id)),
    );
  }

  fn on_settled(self: &Arc<Self>, task_id: u64, succeeded: bool) {
    let mut state = self.state.lock();
    debug_assert!(state.active > 0, "settlement without an active task");
    state.active = state.active.saturating_sub(1);
    debug!(
      scheduler_name = %*self.scheduler_name,
      %task_id,
      succeeded,
      active = state.active,
      queued = state.queued.len(),
      "Task settled."
    );

    // One settlement frees one slot, so at most one task starts here.
    if let Some(next) = state.queued.pop_front() {
      self.launch(&mut state, next);
    }
    self.complete_if_drained(&state);
  }

  fn complete_if_drained(&self, state: &SchedulerState<R, E>) {
    if state.active == 0 && state.queued.is_empty() && self.completion.fire() {
      info!(
        scheduler_name = %*self.scheduler_name,
        started_tasks = state.running.len(),
        "All tasks settled. Completion signal fired."
      );
    }
  }
}

impl<R, E> Drop for BatchScheduler<R, E> {
  fn drop(&mut self) {
    let state = self.state.get_mut();
    if !state.queued.is_empty() {
      warn!(
        scheduler_name = %*self.scheduler_name,
        discarded = state.queued.len(),
        "Scheduler dropped with tasks that were never started."
      );
    } else {
      trace!(scheduler_name = %*self.scheduler_name, "Scheduler dropped.");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  #[tokio::test]
  async fn test_start_launches_at_most_width_tasks() {
    let scheduler = BatchScheduler::<usize, ()>::new(2, TokioHandle::current(), "fill").unwrap();
    for i in 0..5 {
      scheduler.enqueue_fn(move || async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(i)
      });
    }

    scheduler.start();
    assert_eq!(scheduler.active_count(), 2);
    assert_eq!(scheduler.running_count(), 2);
    assert_eq!(scheduler.queued_count(), 3);
  }

  #[tokio::test]
  async fn test_active_count_returns_to_zero() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let scheduler = BatchScheduler::<(), ()>::new(3, TokioHandle::current(), "drain").unwrap();
    for _ in 0..7 {
      let invocations = invocations.clone();
      scheduler.enqueue_fn(move || async move {
        invocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
      });
    }

    scheduler.start().await;
    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.running_count(), 7);
    assert_eq!(invocations.load(Ordering::SeqCst), 7);
    assert!(scheduler.is_complete());
  }
}
