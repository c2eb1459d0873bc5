use futures_batch::{BatchScheduler, TaskError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn flaky_job(id: u32) -> Result<u32, String> {
  tokio::time::sleep(Duration::from_millis(100 * u64::from(id))).await;
  if id % 2 == 0 {
    return Err(format!("job {} could not reach its backend", id));
  }
  Ok(id * 10)
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();

  info!("--- Failure Isolation Example ---");

  let scheduler = BatchScheduler::<u32, String>::new(2, Handle::current(), "flaky_batch")
    .expect("width is non-zero");
  for id in 1..=5 {
    scheduler.enqueue_fn(move || flaky_job(id));
  }

  // Failures never reach the completion signal, only the outcome views.
  scheduler.start().await;

  for (handle, outcome) in scheduler.handles().iter().zip(scheduler.all_settled().await) {
    match outcome {
      Ok(value) => info!("Task {}: succeeded with {}", handle.id(), value),
      Err(TaskError::Failed(reason)) => info!("Task {}: failed: {}", handle.id(), reason),
      Err(TaskError::Panicked) => info!("Task {}: panicked", handle.id()),
    }
  }

  if let Err(e) = scheduler.all().await {
    info!("all() rejected with the first failure: {}", e);
  }
  info!("--- Failure Isolation Example End ---");
}
