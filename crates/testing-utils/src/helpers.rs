//! Test helper utilities and common testing patterns

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

static UNIQUE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    ///
    /// Useful when a background task (such as the reconnect worker) has to
    /// make progress before the test can continue.
    pub async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if condition() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }

        condition()
    }

    /// Generate unique test names based on timestamp
    pub fn unique_name(prefix: &str) -> String {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let sequence = UNIQUE_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_{timestamp}_{sequence}")
    }
}
