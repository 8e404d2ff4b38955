use std::time::{Duration, Instant};

/// Timeout for events crossing the session loop (ms).
pub const EVENT_TIMEOUT_MS: u64 = 5000;

/// Polls `condition` until it holds or `timeout_ms` elapses.
pub async fn eventually<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
