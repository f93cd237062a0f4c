//! Resource teardown
//!
//! The instance is terminated first, the bucket is emptied before it is
//! deleted, the queue goes last. Nothing waits for the deletions to settle.

use anyhow::{Context, Result};
use aws_lifecycle_common::ResourceKind;
use tracing::{debug, info};

use super::Clients;
use super::rollback::{CleanupResult, CompensationStack, cleanup_resource};
use super::types::CreatedResources;
use crate::aws::{Ec2Operations, S3Operations, SqsOperations};

/// Delete every object in the bucket; returns how many were deleted
pub async fn empty_bucket<S: S3Operations>(s3: &S, bucket: &str) -> Result<usize> {
    let objects = s3
        .list_objects(bucket)
        .await
        .with_context(|| format!("Listing objects in {}", bucket))?;

    for object in &objects {
        s3.delete_object(bucket, &object.key)
            .await
            .with_context(|| format!("Deleting s3://{}/{}", bucket, object.key))?;
    }

    debug!(bucket = %bucket, count = objects.len(), "Bucket emptied");
    Ok(objects.len())
}

/// Empty then delete a bucket
pub async fn destroy_bucket<S: S3Operations>(s3: &S, bucket: &str) -> Result<()> {
    empty_bucket(s3, bucket).await?;
    s3.delete_bucket(bucket)
        .await
        .with_context(|| format!("Deleting S3 bucket {}", bucket))
}

/// Tear down the three resources of a run, stopping at the first failure.
///
/// Each resource leaves `stack` as soon as its deletion succeeds, so after a
/// failure the stack holds exactly what is still live.
pub async fn delete_resources<E, S, Q>(
    clients: &Clients<E, S, Q>,
    created: &CreatedResources,
    stack: &mut CompensationStack,
) -> Result<()>
where
    E: Ec2Operations,
    S: S3Operations,
    Q: SqsOperations,
{
    println!("Terminating EC2 instance {}...\n", created.instance_id);
    clients
        .ec2
        .terminate_instance(&created.instance_id)
        .await
        .with_context(|| format!("Terminating EC2 instance {}", created.instance_id))?;
    stack.resolve(ResourceKind::Ec2Instance, &created.instance_id);

    println!(
        "Emptying and deleting S3 bucket {}...\n",
        created.bucket_name
    );
    destroy_bucket(&clients.s3, &created.bucket_name).await?;
    stack.resolve(ResourceKind::S3Bucket, &created.bucket_name);

    println!("Deleting SQS queue {}...\n", created.queue_url);
    clients
        .sqs
        .delete_queue(&created.queue_url)
        .await
        .with_context(|| format!("Deleting SQS queue {}", created.queue_url))?;
    stack.resolve(ResourceKind::SqsQueue, &created.queue_url);

    println!("All resources deleted.\n");
    Ok(())
}

/// Remove resources left behind by an earlier run.
///
/// Unlike [`delete_resources`] every target is attempted; resources that are
/// already gone count as deleted. Fails if any target could not be removed.
pub async fn teardown_orphans<E, S, Q>(
    clients: &Clients<E, S, Q>,
    mut targets: Vec<(ResourceKind, String)>,
) -> Result<()>
where
    E: Ec2Operations,
    S: S3Operations,
    Q: SqsOperations,
{
    if targets.is_empty() {
        anyhow::bail!("Nothing to tear down: pass --instance-id, --bucket or --queue-url");
    }

    targets.sort_by_key(|(kind, _)| kind.teardown_order());

    let mut failed = Vec::new();
    for (kind, id) in &targets {
        match cleanup_resource(clients, *kind, id).await {
            CleanupResult::Deleted => println!("Deleted {} {}", kind, id),
            CleanupResult::AlreadyDeleted => println!("{} {} was already gone", kind, id),
            CleanupResult::Failed => failed.push(format!("{} {}", kind, id)),
        }
    }

    info!(total = targets.len(), failed = failed.len(), "Teardown finished");

    if !failed.is_empty() {
        anyhow::bail!("Failed to delete: {}", failed.join(", "));
    }
    Ok(())
}
