//! Operation traits for the three provider subsystems
//!
//! The orchestrator is written against these traits so it can drive real
//! AWS clients, the in-memory provider, or mocks in unit tests.
//!
//! Note: parameters are borrowed `&str`/`&Path` values; mockall handles them
//! because no method returns a borrow.

use super::types::{
    InstanceState, InstanceSummary, LaunchInstanceConfig, ObjectSummary, QueueConfig,
    ReceivedMessage,
};
use anyhow::Result;
use std::path::Path;

/// EC2 calls used by a lifecycle run
#[allow(async_fn_in_trait)] // Single-threaded driver, futures need not be Send
#[cfg_attr(test, mockall::automock)]
pub trait Ec2Operations {
    /// Launch one instance and return its instance id
    async fn launch_instance(&self, config: &LaunchInstanceConfig) -> Result<String>;

    /// List every instance visible to the session
    async fn describe_instances(&self) -> Result<Vec<InstanceSummary>>;

    /// Current state of one instance
    async fn instance_state(&self, instance_id: &str) -> Result<InstanceState>;

    /// Request termination (returns before the instance is gone)
    async fn terminate_instance(&self, instance_id: &str) -> Result<()>;
}

/// S3 calls used by a lifecycle run
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait S3Operations {
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Whether the bucket exists and is reachable with these credentials
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Names of every bucket owned by the account
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Upload a local file under `key`
    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;

    /// Every object in the bucket (all pages)
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Delete an (already empty) bucket
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// SQS calls used by a lifecycle run
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait SqsOperations {
    /// Create a queue and return its URL
    async fn create_queue(&self, config: &QueueConfig) -> Result<String>;

    /// Whether the queue exists and is reachable
    async fn queue_exists(&self, queue_url: &str) -> Result<bool>;

    /// URLs of every queue visible to the session; empty when there are none
    async fn list_queues(&self) -> Result<Vec<String>>;

    /// Send one message and return its message id
    async fn send_message(&self, queue_url: &str, body: &str, group_id: &str) -> Result<String>;

    /// Receive up to `max_messages` deliveries
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>>;

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()>;

    async fn delete_queue(&self, queue_url: &str) -> Result<()>;
}
