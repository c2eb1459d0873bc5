use futures::future::{BoxFuture, FutureExt};
use futures_intrusive::sync::ManualResetEvent;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

/// A single-fire notification that a scheduler's batch is finished.
///
/// Every clone observes the same underlying event. The signal is created
/// unfired together with its scheduler, so every call to
/// [`crate::BatchScheduler::start`] hands out the same signal.
#[derive(Clone)]
pub struct CompletionSignal {
  event: Arc<ManualResetEvent>,
}

impl CompletionSignal {
  pub(crate) fn new() -> Self {
    Self {
      event: Arc::new(ManualResetEvent::new(false)),
    }
  }

  /// Fires the signal. Returns `false` if it had already fired.
  pub(crate) fn fire(&self) -> bool {
    if self.event.is_set() {
      return false;
    }
    self.event.set();
    true
  }

  /// Returns `true` once the batch has finished.
  pub fn is_fired(&self) -> bool {
    self.event.is_set()
  }

  /// Waits until the signal fires. Returns immediately if it already has.
  pub async fn wait(&self) {
    self.event.wait().await
  }

  /// Returns `true` if both values refer to the same signal.
  pub fn same_signal(&self, other: &CompletionSignal) -> bool {
    Arc::ptr_eq(&self.event, &other.event)
  }
}

impl IntoFuture for CompletionSignal {
  type Output = ();
  type IntoFuture = BoxFuture<'static, ()>;

  fn into_future(self) -> Self::IntoFuture {
    async move { self.event.wait().await }.boxed()
  }
}

impl fmt::Debug for CompletionSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompletionSignal")
      .field("fired", &self.is_fired())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_signal_fires_once() {
    let signal = CompletionSignal::new();
    assert!(!signal.is_fired());
    assert!(signal.fire());
    assert!(signal.is_fired());
    assert!(!signal.fire(), "Second fire must be a no-op");
    signal.wait().await;
  }

  #[tokio::test]
  async fn test_clones_share_the_event() {
    let signal = CompletionSignal::new();
    let waiter = signal.clone();
    assert!(signal.same_signal(&waiter));
    assert!(!signal.same_signal(&CompletionSignal::new()));

    let join = tokio::spawn(async move { waiter.await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!join.is_finished());

    signal.fire();
    tokio::time::timeout(Duration::from_secs(1), join)
      .await
      .expect("Waiter should wake after fire")
      .unwrap();
  }
}
