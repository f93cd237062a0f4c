//! Lifecycle orchestration
//!
//! Runs the fixed sequence: create the instance, bucket and queue, wait, list,
//! upload a file, send and consume a message, tear everything down, wait, and
//! list again so the propagation lag is visible.

pub mod exercise;
pub mod inventory;
pub mod provision;
pub mod rollback;
pub mod teardown;
pub mod types;

pub use inventory::{Inventory, list_resources};
pub use rollback::{CleanupResult, CompensationStack};
pub use teardown::{delete_resources, teardown_orphans};
pub use types::CreatedResources;

use anyhow::Result;
use aws_lifecycle_common::ResourceKind;
use tracing::{error, info, instrument};

use crate::aws::memory::{MemoryEc2, MemoryS3, MemorySqs};
use crate::aws::{
    AwsContext, Ec2Client, Ec2Operations, FromAwsContext, MemoryCloud, S3Client, S3Operations,
    SqsClient, SqsOperations,
};
use crate::config::RunConfig;
use crate::wait::{describe_duration, pause};

/// The three provider handles a run talks to
pub struct Clients<E, S, Q> {
    pub ec2: E,
    pub s3: S,
    pub sqs: Q,
}

impl Clients<Ec2Client, S3Client, SqsClient> {
    /// Real AWS clients sharing one loaded SDK config
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            ec2: Ec2Client::from_context(ctx),
            s3: S3Client::from_context(ctx),
            sqs: SqsClient::from_context(ctx),
        }
    }
}

impl Clients<MemoryEc2, MemoryS3, MemorySqs> {
    /// Handles onto one in-memory provider
    pub fn memory(cloud: &MemoryCloud) -> Self {
        Self {
            ec2: cloud.ec2(),
            s3: cloud.s3(),
            sqs: cloud.sqs(),
        }
    }
}

/// What a completed run observed
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub resources: CreatedResources,
    /// Listing taken once the resources were ready
    pub initial: Inventory,
    /// Body of the consumed message, if one arrived
    pub received_body: Option<String>,
    /// Listing taken after teardown
    pub final_listing: Inventory,
}

/// Run the whole lifecycle.
///
/// On failure the resources created so far are either rolled back (when
/// `rollback_on_failure` is set) or logged as orphaned. The original error is
/// returned in both cases.
#[instrument(skip_all, fields(region = %config.resources.region))]
pub async fn run_lifecycle<E, S, Q>(
    clients: &Clients<E, S, Q>,
    config: &RunConfig,
) -> Result<RunSummary>
where
    E: Ec2Operations,
    S: S3Operations,
    Q: SqsOperations,
{
    let mut stack = CompensationStack::new();

    match drive(clients, config, &mut stack).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            error!(error = ?e, "Lifecycle run failed");
            if config.flags.rollback_on_failure {
                let results = stack.unwind(clients).await;
                let failed = results
                    .iter()
                    .filter(|(_, _, r)| *r == CleanupResult::Failed)
                    .count();
                info!(total = results.len(), failed, "Rollback finished");
            } else {
                stack.report_orphans();
            }
            Err(e)
        }
    }
}

async fn drive<E, S, Q>(
    clients: &Clients<E, S, Q>,
    config: &RunConfig,
    stack: &mut CompensationStack,
) -> Result<RunSummary>
where
    E: Ec2Operations,
    S: S3Operations,
    Q: SqsOperations,
{
    let resources = &config.resources;
    let delays = &config.delays;

    let instance_id = provision::create_instance(&clients.ec2, resources).await?;
    stack.push(ResourceKind::Ec2Instance, &instance_id);
    let bucket_name = provision::create_bucket(&clients.s3, resources).await?;
    stack.push(ResourceKind::S3Bucket, &bucket_name);
    let queue_url = provision::create_queue(&clients.sqs, resources).await?;
    stack.push(ResourceKind::SqsQueue, &queue_url);

    let created = CreatedResources {
        instance_id,
        bucket_name,
        queue_url,
    };
    info!(
        instance_id = %created.instance_id,
        bucket = %created.bucket_name,
        queue_url = %created.queue_url,
        "Resources created"
    );

    provision::await_readiness(clients, &created, config).await?;

    let initial = list_resources(clients).await?;
    initial.print();

    exercise::upload_file(&clients.s3, &created.bucket_name, &config.exercise, delays).await?;
    exercise::send_message(&clients.sqs, &created.queue_url, &config.exercise, delays).await?;
    let received_body = exercise::receive_and_delete(&clients.sqs, &created.queue_url).await?;

    pause(delays.before_teardown).await;

    delete_resources(clients, &created, stack).await?;

    pause(delays.after_teardown).await;
    println!(
        "Waiting for {}...\n",
        describe_duration(delays.before_final_listing)
    );
    pause(delays.before_final_listing).await;

    let final_listing = list_resources(clients).await?;
    final_listing.print();
    println!(
        "Here we can see that the sqs queue still appears but it's actually deleted, just that it takes some time to reflect...\n"
    );

    Ok(RunSummary {
        resources: created,
        initial,
        received_body,
        final_listing,
    })
}
