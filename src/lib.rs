//! A Tokio-based batch scheduler that runs queued futures with a fixed
//! concurrency width, refilling one slot per settlement, and exposes a
//! single completion signal for the whole batch.

mod error;
mod handle;
mod scheduler;
mod signal;
mod task;

pub use error::{SchedulerError, TaskError};
pub use handle::TaskHandle;
pub use scheduler::BatchScheduler;
pub use signal::CompletionSignal;
pub use task::{BatchTask, TaskFuture, TaskOutcome};
