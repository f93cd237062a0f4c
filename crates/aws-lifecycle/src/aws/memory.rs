//! In-memory provider backend
//!
//! `MemoryCloud` implements the EC2, S3 and SQS operation traits against one
//! shared in-process state, so a lifecycle run can execute without an AWS
//! account. Failures carry the real AWS error codes. Time is read from
//! `tokio::time`, which lets tests drive it with a paused clock.
//!
//! Deleted resources stay visible to listings for `stale_reads`, mimicking
//! the provider's eventual consistency.

use super::error::classify_aws_error;
use super::operations::{Ec2Operations, S3Operations, SqsOperations};
use super::types::{
    InstanceState, InstanceSummary, LaunchInstanceConfig, ObjectSummary, QueueConfig,
    ReceivedMessage,
};
use anyhow::{Context, Result};
use aws_lifecycle_common::defaults::FIFO_SUFFIX;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Account id used in fabricated queue URLs
const ACCOUNT_ID: &str = "000000000000";

/// Largest batch SQS allows on receive
const MAX_RECEIVE_BATCH: i32 = 10;

/// Behaviour knobs for the in-memory provider
#[derive(Debug, Clone)]
pub struct MemoryCloudConfig {
    pub region: String,
    /// Time from launch until an instance reports `running`
    pub boot_time: Duration,
    /// Time from terminate until an instance reports `terminated`
    pub shutdown_time: Duration,
    /// How long deleted resources keep showing up in listings
    pub stale_reads: Duration,
    /// How long a received message stays invisible
    pub visibility_timeout: Duration,
    /// Window for content-based deduplication
    pub deduplication_window: Duration,
}

impl Default for MemoryCloudConfig {
    fn default() -> Self {
        Self {
            region: aws_lifecycle_common::defaults::DEFAULT_REGION.to_string(),
            boot_time: Duration::from_secs(20),
            shutdown_time: Duration::from_secs(5),
            stale_reads: Duration::ZERO,
            visibility_timeout: Duration::from_secs(30),
            deduplication_window: Duration::from_secs(300),
        }
    }
}

struct MemoryInstance {
    instance_id: String,
    launched_at: Instant,
    terminated_at: Option<Instant>,
}

struct MemoryBucket {
    /// Buckets owned by another account only exist to reserve the name
    owned: bool,
    objects: BTreeMap<String, Vec<u8>>,
    deleted_at: Option<Instant>,
}

struct MemoryMessage {
    message_id: String,
    body: String,
    group_id: Option<String>,
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
}

struct MemoryQueue {
    url: String,
    fifo: bool,
    content_based_deduplication: bool,
    messages: VecDeque<MemoryMessage>,
    /// body -> (first sent, message id)
    sent_bodies: HashMap<String, (Instant, String)>,
    deleted_at: Option<Instant>,
}

#[derive(Default)]
struct MemoryState {
    instances: Vec<MemoryInstance>,
    buckets: BTreeMap<String, MemoryBucket>,
    /// Keyed by queue name
    queues: BTreeMap<String, MemoryQueue>,
}

/// Shared in-memory provider; clone handles freely
#[derive(Clone, Default)]
pub struct MemoryCloud {
    config: Arc<MemoryCloudConfig>,
    state: Arc<Mutex<MemoryState>>,
}

/// EC2 handle onto a [`MemoryCloud`]
#[derive(Clone)]
pub struct MemoryEc2(MemoryCloud);

/// S3 handle onto a [`MemoryCloud`]
#[derive(Clone)]
pub struct MemoryS3(MemoryCloud);

/// SQS handle onto a [`MemoryCloud`]
#[derive(Clone)]
pub struct MemorySqs(MemoryCloud);

fn fault(code: &str, message: impl Into<String>) -> anyhow::Error {
    let message: String = message.into();
    anyhow::Error::new(classify_aws_error(Some(code), Some(&message)))
}

fn expired(deleted_at: Option<Instant>, window: Duration, now: Instant) -> bool {
    deleted_at.is_some_and(|at| now.duration_since(at) >= window)
}

impl MemoryCloud {
    pub fn new(config: MemoryCloudConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::default(),
        }
    }

    pub fn ec2(&self) -> MemoryEc2 {
        MemoryEc2(self.clone())
    }

    pub fn s3(&self) -> MemoryS3 {
        MemoryS3(self.clone())
    }

    pub fn sqs(&self) -> MemorySqs {
        MemorySqs(self.clone())
    }

    /// Reserve a bucket name as if another account owned it
    pub fn reserve_foreign_bucket(&self, bucket: &str) {
        self.lock().buckets.insert(
            bucket.to_string(),
            MemoryBucket {
                owned: false,
                objects: BTreeMap::new(),
                deleted_at: None,
            },
        );
    }

    /// Objects currently stored in a live bucket, `None` if it does not exist
    pub fn bucket_objects(&self, bucket: &str) -> Option<Vec<ObjectSummary>> {
        let state = self.lock();
        state
            .buckets
            .get(bucket)
            .filter(|b| b.owned && b.deleted_at.is_none())
            .map(|b| {
                b.objects
                    .iter()
                    .map(|(key, data)| ObjectSummary {
                        key: key.clone(),
                        size: data.len() as i64,
                    })
                    .collect()
            })
    }

    /// Messages held by a live queue (visible or in flight)
    pub fn queue_depth(&self, queue_url: &str) -> Option<usize> {
        let state = self.lock();
        state
            .queues
            .values()
            .find(|q| q.url == queue_url && q.deleted_at.is_none())
            .map(|q| q.messages.len())
    }

    /// Instances not yet terminated, regardless of listing visibility
    pub fn live_instance_count(&self) -> usize {
        self.lock()
            .instances
            .iter()
            .filter(|i| i.terminated_at.is_none())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lock the state and drop deleted resources whose stale window has passed
    fn settled(&self) -> (MutexGuard<'_, MemoryState>, Instant) {
        let now = Instant::now();
        let window = self.config.stale_reads;
        let mut state = self.lock();

        state
            .instances
            .retain(|i| !expired(i.terminated_at, window, now));
        state
            .buckets
            .retain(|_, b| !expired(b.deleted_at, window, now));
        state
            .queues
            .retain(|_, q| !expired(q.deleted_at, window, now));

        (state, now)
    }

    fn instance_state(&self, instance: &MemoryInstance, now: Instant) -> InstanceState {
        match instance.terminated_at {
            Some(at) if now.duration_since(at) >= self.config.shutdown_time => {
                InstanceState::Terminated
            }
            Some(_) => InstanceState::ShuttingDown,
            None if now.duration_since(instance.launched_at) >= self.config.boot_time => {
                InstanceState::Running
            }
            None => InstanceState::Pending,
        }
    }

    fn queue_url(&self, name: &str) -> String {
        format!(
            "https://sqs.{}.amazonaws.com/{}/{}",
            self.config.region, ACCOUNT_ID, name
        )
    }
}

fn live_queue<'a>(state: &'a mut MemoryState, queue_url: &str) -> Result<&'a mut MemoryQueue> {
    state
        .queues
        .values_mut()
        .find(|q| q.url == queue_url && q.deleted_at.is_none())
        .ok_or_else(|| {
            fault(
                "AWS.SimpleQueueService.NonExistentQueue",
                format!("The specified queue does not exist: {}", queue_url),
            )
        })
}

fn live_bucket<'a>(state: &'a mut MemoryState, bucket: &str) -> Result<&'a mut MemoryBucket> {
    state
        .buckets
        .get_mut(bucket)
        .filter(|b| b.owned && b.deleted_at.is_none())
        .ok_or_else(|| {
            fault(
                "NoSuchBucket",
                format!("The specified bucket does not exist: {}", bucket),
            )
        })
}

impl Ec2Operations for MemoryEc2 {
    async fn launch_instance(&self, config: &LaunchInstanceConfig) -> Result<String> {
        if !config.image_id.starts_with("ami-") {
            return Err(fault(
                "InvalidAMIID.Malformed",
                format!("Invalid id: \"{}\"", config.image_id),
            ));
        }

        let (mut state, now) = self.0.settled();
        let instance_id = format!("i-{}", &Uuid::new_v4().simple().to_string()[..17]);
        state.instances.push(MemoryInstance {
            instance_id: instance_id.clone(),
            launched_at: now,
            terminated_at: None,
        });

        debug!(instance_id = %instance_id, "Launched in-memory instance");
        Ok(instance_id)
    }

    async fn describe_instances(&self) -> Result<Vec<InstanceSummary>> {
        let (state, now) = self.0.settled();
        Ok(state
            .instances
            .iter()
            .map(|i| InstanceSummary {
                instance_id: i.instance_id.clone(),
                state: self.0.instance_state(i, now),
            })
            .collect())
    }

    async fn instance_state(&self, instance_id: &str) -> Result<InstanceState> {
        let (state, now) = self.0.settled();
        state
            .instances
            .iter()
            .find(|i| i.instance_id == instance_id)
            .map(|i| self.0.instance_state(i, now))
            .ok_or_else(|| {
                fault(
                    "InvalidInstanceID.NotFound",
                    format!("The instance ID '{}' does not exist", instance_id),
                )
            })
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        let (mut state, now) = self.0.settled();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.instance_id == instance_id)
            .ok_or_else(|| {
                fault(
                    "InvalidInstanceID.NotFound",
                    format!("The instance ID '{}' does not exist", instance_id),
                )
            })?;

        // Terminating twice is accepted, as on EC2
        instance.terminated_at.get_or_insert(now);
        Ok(())
    }
}

impl S3Operations for MemoryS3 {
    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let (mut state, _) = self.0.settled();

        if let Some(existing) = state.buckets.get(bucket) {
            return Err(match (existing.owned, existing.deleted_at) {
                (_, Some(_)) => fault(
                    "OperationAborted",
                    "A conflicting conditional operation is currently in progress against this resource.",
                ),
                (true, None) => fault(
                    "BucketAlreadyOwnedByYou",
                    "Your previous request to create the named bucket succeeded and you already own it.",
                ),
                (false, None) => fault(
                    "BucketAlreadyExists",
                    "The requested bucket name is not available.",
                ),
            });
        }

        state.buckets.insert(
            bucket.to_string(),
            MemoryBucket {
                owned: true,
                objects: BTreeMap::new(),
                deleted_at: None,
            },
        );
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let (state, _) = self.0.settled();
        Ok(state
            .buckets
            .get(bucket)
            .is_some_and(|b| b.owned && b.deleted_at.is_none()))
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let (state, _) = self.0.settled();
        Ok(state
            .buckets
            .iter()
            .filter(|(_, b)| b.owned)
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        let (mut state, _) = self.0.settled();
        live_bucket(&mut state, bucket)?
            .objects
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        let (mut state, _) = self.0.settled();
        Ok(live_bucket(&mut state, bucket)?
            .objects
            .iter()
            .map(|(key, data)| ObjectSummary {
                key: key.clone(),
                size: data.len() as i64,
            })
            .collect())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let (mut state, _) = self.0.settled();
        // Deleting a missing key succeeds on S3
        live_bucket(&mut state, bucket)?.objects.remove(key);
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let (mut state, now) = self.0.settled();
        let entry = live_bucket(&mut state, bucket)?;

        if !entry.objects.is_empty() {
            return Err(fault(
                "BucketNotEmpty",
                "The bucket you tried to delete is not empty",
            ));
        }

        entry.deleted_at = Some(now);
        Ok(())
    }
}

impl SqsOperations for MemorySqs {
    async fn create_queue(&self, config: &QueueConfig) -> Result<String> {
        if config.name.ends_with(FIFO_SUFFIX) != config.fifo {
            return Err(fault(
                "InvalidParameterValue",
                "The name of a FIFO queue can only include alphanumeric characters, hyphens, or underscores, must end with .fifo suffix",
            ));
        }

        let (mut state, _) = self.0.settled();

        if let Some(existing) = state.queues.get(&config.name) {
            if existing.deleted_at.is_some() {
                return Err(fault(
                    "AWS.SimpleQueueService.QueueDeletedRecently",
                    "You must wait 60 seconds after deleting a queue before you can create another with the same name.",
                ));
            }
            if existing.fifo != config.fifo
                || existing.content_based_deduplication != config.content_based_deduplication
            {
                return Err(fault(
                    "QueueAlreadyExists",
                    "A queue already exists with the same name and a different value for attribute(s)",
                ));
            }
            // Same name and attributes: SQS hands back the existing queue
            return Ok(existing.url.clone());
        }

        let url = self.0.queue_url(&config.name);
        state.queues.insert(
            config.name.clone(),
            MemoryQueue {
                url: url.clone(),
                fifo: config.fifo,
                content_based_deduplication: config.content_based_deduplication,
                messages: VecDeque::new(),
                sent_bodies: HashMap::new(),
                deleted_at: None,
            },
        );
        Ok(url)
    }

    async fn queue_exists(&self, queue_url: &str) -> Result<bool> {
        let (mut state, _) = self.0.settled();
        Ok(live_queue(&mut state, queue_url).is_ok())
    }

    async fn list_queues(&self) -> Result<Vec<String>> {
        let (state, _) = self.0.settled();
        Ok(state.queues.values().map(|q| q.url.clone()).collect())
    }

    async fn send_message(&self, queue_url: &str, body: &str, group_id: &str) -> Result<String> {
        let window = self.0.config.deduplication_window;
        let (mut state, now) = self.0.settled();
        let queue = live_queue(&mut state, queue_url)?;

        if queue.fifo && group_id.is_empty() {
            return Err(fault(
                "MissingParameter",
                "The request must contain the parameter MessageGroupId.",
            ));
        }

        if queue.content_based_deduplication {
            queue
                .sent_bodies
                .retain(|_, (sent_at, _)| now.duration_since(*sent_at) < window);
            if let Some((_, message_id)) = queue.sent_bodies.get(body) {
                debug!(queue_url = %queue_url, "Duplicate body inside deduplication window");
                return Ok(message_id.clone());
            }
        }

        let message_id = Uuid::new_v4().to_string();
        if queue.content_based_deduplication {
            queue
                .sent_bodies
                .insert(body.to_string(), (now, message_id.clone()));
        }
        queue.messages.push_back(MemoryMessage {
            message_id: message_id.clone(),
            body: body.to_string(),
            group_id: queue.fifo.then(|| group_id.to_string()),
            receipt_handle: None,
            invisible_until: None,
        });

        Ok(message_id)
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>> {
        if !(1..=MAX_RECEIVE_BATCH).contains(&max_messages) {
            return Err(fault(
                "InvalidParameterValue",
                format!(
                    "Value {} for parameter MaxNumberOfMessages is invalid. Reason: Must be between 1 and 10.",
                    max_messages
                ),
            ));
        }

        let visibility = self.0.config.visibility_timeout;
        let (mut state, now) = self.0.settled();
        let queue = live_queue(&mut state, queue_url)?;
        let in_flight = |m: &MemoryMessage| m.invisible_until.is_some_and(|until| until > now);

        // A FIFO group with a delivery in flight is blocked until it resolves
        let mut blocked_groups: Vec<String> = queue
            .messages
            .iter()
            .filter(|m| in_flight(*m))
            .filter_map(|m| m.group_id.clone())
            .collect();

        let mut received = Vec::new();
        for message in queue.messages.iter_mut() {
            if received.len() >= max_messages as usize {
                break;
            }
            if in_flight(&*message) {
                continue;
            }
            if let Some(group) = &message.group_id {
                if blocked_groups.contains(group) {
                    continue;
                }
                blocked_groups.push(group.clone());
            }

            let receipt_handle = Uuid::new_v4().to_string();
            message.receipt_handle = Some(receipt_handle.clone());
            message.invisible_until = Some(now + visibility);
            received.push(ReceivedMessage {
                message_id: message.message_id.clone(),
                body: message.body.clone(),
                receipt_handle,
            });
        }

        Ok(received)
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        let (mut state, _) = self.0.settled();
        let queue = live_queue(&mut state, queue_url)?;

        let position = queue
            .messages
            .iter()
            .position(|m| m.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| {
                fault(
                    "ReceiptHandleIsInvalid",
                    format!("The input receipt handle \"{}\" is not valid.", receipt_handle),
                )
            })?;

        queue.messages.remove(position);
        Ok(())
    }

    async fn delete_queue(&self, queue_url: &str) -> Result<()> {
        let (mut state, now) = self.0.settled();
        live_queue(&mut state, queue_url)?.deleted_at = Some(now);
        Ok(())
    }
}
