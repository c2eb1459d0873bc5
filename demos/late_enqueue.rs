use futures_batch::BatchScheduler;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn step(label: &'static str, millis: u64) -> Result<&'static str, String> {
  info!("{} running", label);
  tokio::time::sleep(Duration::from_millis(millis)).await;
  Ok(label)
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Late Enqueue Example (Width: 2) ---");

  let scheduler = BatchScheduler::<&'static str, String>::new(2, Handle::current(), "late_batch")
    .expect("width is non-zero");
  scheduler.enqueue_fn(|| step("early-a", 300));

  let done = scheduler.start();
  // Starting twice hands back the same signal and starts nothing new.
  assert!(done.same_signal(&scheduler.start()));

  // Late tasks wait in the queue until early-a settles and frees a slot.
  let waiting = scheduler.enqueue_fn(|| step("late-b", 100));
  info!("Enqueued late-b, waiting in queue: {}", waiting);
  let waiting = scheduler.enqueue_fn(|| step("late-c", 100));
  info!("Enqueued late-c, waiting in queue: {}", waiting);

  done.await;
  info!("Outcomes in start order: {:?}", scheduler.all_settled().await);
  info!("--- Late Enqueue Example End ---");
}
