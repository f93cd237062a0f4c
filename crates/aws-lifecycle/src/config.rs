//! Configuration types for a lifecycle run

use crate::aws::types::{LaunchInstanceConfig, QueueConfig};
use crate::wait::WaitConfig;
use aws_lifecycle_common::defaults::*;
use std::path::PathBuf;
use std::time::Duration;

/// The three resources and where they live
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// AWS region
    pub region: String,
    /// Machine image for the instance
    pub image_id: String,
    /// EC2 instance type
    pub instance_type: String,
    /// EC2 key pair name
    pub key_name: String,
    /// S3 bucket name
    pub bucket_name: String,
    /// SQS FIFO queue name (ends in `.fifo`)
    pub queue_name: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            image_id: DEFAULT_IMAGE_ID.to_string(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            key_name: DEFAULT_KEY_NAME.to_string(),
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
        }
    }
}

impl ResourceConfig {
    pub fn launch_config(&self) -> LaunchInstanceConfig {
        LaunchInstanceConfig::new(&self.image_id, &self.instance_type, &self.key_name)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::fifo(&self.queue_name)
    }
}

/// What gets uploaded and sent while the resources are up
#[derive(Debug, Clone)]
pub struct ExerciseConfig {
    /// Directory the empty upload file is written to
    pub upload_dir: PathBuf,
    /// File name, also used as the object key
    pub file_name: String,
    /// Message body
    pub message_body: String,
    /// FIFO message group id
    pub group_id: String,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("."),
            file_name: DEFAULT_UPLOAD_FILE.to_string(),
            message_body: DEFAULT_MESSAGE_BODY.to_string(),
            group_id: DEFAULT_MESSAGE_GROUP_ID.to_string(),
        }
    }
}

impl ExerciseConfig {
    /// Local path of the upload file
    pub fn upload_path(&self) -> PathBuf {
        self.upload_dir.join(&self.file_name)
    }
}

/// Fixed pauses between steps
#[derive(Debug, Clone, PartialEq)]
pub struct DelayConfig {
    pub after_create: Duration,
    pub after_upload: Duration,
    pub after_send: Duration,
    pub before_teardown: Duration,
    pub after_teardown: Duration,
    pub before_final_listing: Duration,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            after_create: Duration::from_secs(AFTER_CREATE_DELAY_SECS),
            after_upload: Duration::from_secs(AFTER_UPLOAD_DELAY_SECS),
            after_send: Duration::from_secs(AFTER_SEND_DELAY_SECS),
            before_teardown: Duration::from_secs(BEFORE_TEARDOWN_DELAY_SECS),
            after_teardown: Duration::from_secs(AFTER_TEARDOWN_DELAY_SECS),
            before_final_listing: Duration::from_secs(BEFORE_FINAL_LISTING_DELAY_SECS),
        }
    }
}

impl DelayConfig {
    /// Every pause set to zero
    pub fn none() -> Self {
        Self {
            after_create: Duration::ZERO,
            after_upload: Duration::ZERO,
            after_send: Duration::ZERO,
            before_teardown: Duration::ZERO,
            after_teardown: Duration::ZERO,
            before_final_listing: Duration::ZERO,
        }
    }

    /// Sum of all pauses in one run
    pub fn total(&self) -> Duration {
        self.after_create
            + self.after_upload
            + self.after_send
            + self.before_teardown
            + self.after_teardown
            + self.before_final_listing
    }
}

/// How the run decides the new resources are usable
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// Sleep for `DelayConfig::after_create`, check nothing
    FixedDelay,
    /// Poll each resource until ready
    Poll(WaitConfig),
}

/// Runtime behavior flags
#[derive(Debug, Clone)]
pub struct RuntimeFlags {
    pub readiness: Readiness,
    /// Delete already-created resources when a later step fails
    pub rollback_on_failure: bool,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            readiness: Readiness::FixedDelay,
            rollback_on_failure: false,
        }
    }
}

/// Configuration for a lifecycle run
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub resources: ResourceConfig,
    pub exercise: ExerciseConfig,
    pub delays: DelayConfig,
    pub flags: RuntimeFlags,
}
