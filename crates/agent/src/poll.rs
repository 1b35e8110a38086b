//! Periodic operating-mode poll.
//!
//! A single task alternates `sleep(interval)` and one sample, so a
//! slow sample delays the next iteration instead of overlapping it.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Delay between mode samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Call `sample` every `interval` until `cancel` fires.
///
/// Once `cancel` has fired no further sample is taken, even if the
/// interval elapsed in the same wakeup.
pub async fn run<F>(interval: Duration, cancel: CancellationToken, mut sample: F)
where
    F: FnMut() + Send,
{
    tracing::info!(interval_ms = interval.as_millis() as u64, "Mode poll started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!("Mode poll stopping");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                if cancel.is_cancelled() {
                    break;
                }
                sample();
            }
        }
    }
}
