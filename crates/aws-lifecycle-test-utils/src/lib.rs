//! Shared test utilities for aws-lifecycle
//!
//! Region detection and unique resource names for the live AWS tests, which
//! cannot reuse the fixed bucket and queue names without colliding.

use aws_lifecycle_common::defaults::{DEFAULT_REGION, FIFO_SUFFIX};
use chrono::Utc;

/// Get the AWS region for tests.
///
/// Checks `AWS_REGION`, then `AWS_DEFAULT_REGION`, then falls back to the
/// region the lifecycle run targets.
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| DEFAULT_REGION.to_string())
}

/// Generate a unique run ID for test resources.
///
/// Format: `test-{timestamp_ms}-{counter}`.
pub fn test_run_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("test-{}-{}", ts, counter)
}

/// Generate a unique bucket name: `aws-lifecycle-test-...`
pub fn test_bucket_name() -> String {
    format!("aws-lifecycle-{}", test_run_id())
}

/// Generate a unique FIFO queue name: `aws-lifecycle-test-....fifo`
pub fn test_queue_name() -> String {
    format!("aws-lifecycle-{}{}", test_run_id(), FIFO_SUFFIX)
}
