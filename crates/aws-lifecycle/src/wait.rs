//! Fixed delays and poll-until-ready waiting.
//!
//! The lifecycle run sleeps for fixed durations by default. `wait_for_resource`
//! is the polling alternative: exponential backoff with jitter and a timeout.

use anyhow::Result;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for resource waiting with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time to wait before timeout
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Sleep for a fixed duration; zero returns immediately.
pub async fn pause(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    debug!(secs = duration.as_secs(), "Sleeping");
    tokio::time::sleep(duration).await;
}

/// Human-readable duration for progress lines ("1 minute", "30 seconds")
pub fn describe_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}

/// Wait for a resource to become ready with exponential backoff.
///
/// `check` returns `Ok(true)` when ready and `Ok(false)` to try again. An
/// error from `check` ends the wait immediately.
///
/// # Example
/// ```ignore
/// wait_for_resource(
///     WaitConfig::default(),
///     || async { s3.bucket_exists("my-bucket").await },
///     "S3 bucket my-bucket",
/// ).await?;
/// ```
pub async fn wait_for_resource<F, Fut>(
    config: WaitConfig,
    check: F,
    resource_name: &str,
) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .build();

    loop {
        attempts += 1;

        if start.elapsed() >= config.timeout {
            anyhow::bail!(
                "Timeout waiting for {} after {:?} ({} attempts)",
                resource_name,
                config.timeout,
                attempts
            );
        }

        match check().await {
            Ok(true) => {
                debug!(resource = %resource_name, attempts, "Resource ready");
                return Ok(());
            }
            Ok(false) => {
                let delay = delays.next().unwrap_or(config.max_delay);
                debug!(
                    resource = %resource_name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Resource not ready, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(resource = %resource_name, error = ?e, "Resource check failed");
                return Err(e);
            }
        }
    }
}
