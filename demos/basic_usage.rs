use futures_batch::BatchScheduler;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn fetch_page(page: u32) -> Result<String, String> {
  info!("Fetching page {}", page);
  tokio::time::sleep(Duration::from_millis(200 + 50 * u64::from(page % 3))).await;
  Ok(format!("page {} body", page))
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Basic Usage Example (Width: 3) ---");

  let scheduler = match BatchScheduler::<String, String>::new(3, Handle::current(), "basic_batch") {
    Ok(scheduler) => scheduler,
    Err(e) => {
      tracing::error!("Could not create scheduler: {}", e);
      return;
    }
  };

  for page in 0..8 {
    scheduler.enqueue_fn(move || fetch_page(page));
  }
  info!("Queued {} tasks.", scheduler.queued_count());

  let done = scheduler.start();
  info!(
    "Started. Active: {}, still queued: {}",
    scheduler.active_count(),
    scheduler.queued_count()
  );

  done.await;
  info!("Batch finished after starting {} tasks.", scheduler.running_count());

  match scheduler.all().await {
    Ok(pages) => {
      for body in pages {
        info!("Result: {}", body);
      }
    }
    Err(e) => info!("A task failed: {}", e),
  }
  info!("--- Basic Usage Example End ---");
}
