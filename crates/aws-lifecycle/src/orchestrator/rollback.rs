//! Compensation for partially completed runs
//!
//! Every resource is recorded as soon as it exists. When a later step fails
//! the run either unwinds the stack (newest first) or reports what was left
//! behind.

use aws_lifecycle_common::ResourceKind;
use tracing::{info, warn};

use super::Clients;
use super::teardown::destroy_bucket;
use crate::aws::{Ec2Operations, S3Operations, SqsOperations, classify_anyhow_error};

/// Result of a single resource cleanup operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupResult {
    /// Resource was successfully deleted
    Deleted,
    /// Resource was already deleted (not found)
    AlreadyDeleted,
    /// Cleanup failed with error
    Failed,
}

/// Delete a single resource and handle "not found" errors gracefully.
pub async fn cleanup_resource<E, S, Q>(
    clients: &Clients<E, S, Q>,
    kind: ResourceKind,
    resource_id: &str,
) -> CleanupResult
where
    E: Ec2Operations,
    S: S3Operations,
    Q: SqsOperations,
{
    let result = match kind {
        ResourceKind::Ec2Instance => clients.ec2.terminate_instance(resource_id).await,
        ResourceKind::S3Bucket => destroy_bucket(&clients.s3, resource_id).await,
        ResourceKind::SqsQueue => clients.sqs.delete_queue(resource_id).await,
    };

    match result {
        Ok(()) => {
            info!(resource_type = %kind, resource_id = %resource_id, "Deleted");
            CleanupResult::Deleted
        }
        Err(e) if classify_anyhow_error(&e).is_not_found() => {
            info!(resource_type = %kind, resource_id = %resource_id, "Already deleted");
            CleanupResult::AlreadyDeleted
        }
        Err(e) => {
            warn!(
                resource_type = %kind,
                resource_id = %resource_id,
                error = ?e,
                "Cleanup failed"
            );
            CleanupResult::Failed
        }
    }
}

/// Resources created so far, in creation order
#[derive(Debug, Default)]
pub struct CompensationStack {
    entries: Vec<(ResourceKind, String)>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resource that now exists
    pub fn push(&mut self, kind: ResourceKind, resource_id: impl Into<String>) {
        self.entries.push((kind, resource_id.into()));
    }

    /// Forget a resource that was deleted normally
    pub fn resolve(&mut self, kind: ResourceKind, resource_id: &str) {
        self.entries
            .retain(|(k, id)| !(*k == kind && id == resource_id));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delete every recorded resource, newest first.
    ///
    /// Failures are logged and skipped so one stuck resource does not keep
    /// the others alive.
    pub async fn unwind<E, S, Q>(
        &mut self,
        clients: &Clients<E, S, Q>,
    ) -> Vec<(ResourceKind, String, CleanupResult)>
    where
        E: Ec2Operations,
        S: S3Operations,
        Q: SqsOperations,
    {
        let mut results = Vec::with_capacity(self.entries.len());

        while let Some((kind, resource_id)) = self.entries.pop() {
            warn!(resource_type = %kind, resource_id = %resource_id, "Rolling back");
            let result = cleanup_resource(clients, kind, &resource_id).await;
            results.push((kind, resource_id, result));
        }

        results
    }

    /// Log every recorded resource as orphaned
    pub fn report_orphans(&self) {
        for (kind, resource_id) in &self.entries {
            warn!(
                resource_type = %kind,
                resource_id = %resource_id,
                "Resource left running after failure"
            );
        }
        if !self.is_empty() {
            eprintln!(
                "Resources left behind (remove with `aws-lifecycle teardown`): {}",
                self.entries
                    .iter()
                    .map(|(kind, id)| format!("{} {}", kind, id))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AwsError, MockEc2Operations, MockS3Operations, MockSqsOperations};
    use mockall::Sequence;

    fn not_found(code: &str) -> anyhow::Error {
        anyhow::Error::new(AwsError::NotFound {
            code: code.to_string(),
            message: "gone".to_string(),
        })
    }

    #[tokio::test]
    async fn test_unwind_runs_newest_first() {
        let mut seq = Sequence::new();
        let mut ec2 = MockEc2Operations::new();
        let mut s3 = MockS3Operations::new();
        let mut sqs = MockSqsOperations::new();

        sqs.expect_delete_queue()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        s3.expect_list_objects()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));
        s3.expect_delete_bucket()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        ec2.expect_terminate_instance()
            .withf(|id| id == "i-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let clients = Clients { ec2, s3, sqs };
        let mut stack = CompensationStack::new();
        stack.push(ResourceKind::Ec2Instance, "i-1");
        stack.push(ResourceKind::S3Bucket, "bkt");
        stack.push(ResourceKind::SqsQueue, "https://q");

        let results = stack.unwind(&clients).await;
        assert!(stack.is_empty());
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, _, r)| *r == CleanupResult::Deleted));
    }

    #[test]
    fn test_resolve_forgets_only_that_resource() {
        let mut stack = CompensationStack::new();
        stack.push(ResourceKind::Ec2Instance, "i-1");
        stack.push(ResourceKind::S3Bucket, "bkt");

        stack.resolve(ResourceKind::Ec2Instance, "i-2");
        stack.resolve(ResourceKind::Ec2Instance, "i-1");
        assert_eq!(stack.entries, vec![(ResourceKind::S3Bucket, "bkt".to_string())]);

        stack.resolve(ResourceKind::S3Bucket, "bkt");
        assert!(stack.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_counts_as_already_deleted() {
        let mut s3 = MockS3Operations::new();
        s3.expect_list_objects()
            .returning(|_| Err(not_found("NoSuchBucket")));

        let clients = Clients {
            ec2: MockEc2Operations::new(),
            s3,
            sqs: MockSqsOperations::new(),
        };

        let result = cleanup_resource(&clients, ResourceKind::S3Bucket, "bkt").await;
        assert_eq!(result, CleanupResult::AlreadyDeleted);
    }

    #[tokio::test]
    async fn test_unwind_keeps_going_after_failure() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_terminate_instance()
            .times(1)
            .returning(|_| Ok(()));
        let mut sqs = MockSqsOperations::new();
        sqs.expect_delete_queue()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("AccessDenied")));

        let clients = Clients {
            ec2,
            s3: MockS3Operations::new(),
            sqs,
        };
        let mut stack = CompensationStack::new();
        stack.push(ResourceKind::Ec2Instance, "i-1");
        stack.push(ResourceKind::SqsQueue, "https://q");

        let results = stack.unwind(&clients).await;
        assert_eq!(results[0].2, CleanupResult::Failed);
        assert_eq!(results[1].2, CleanupResult::Deleted);
    }
}
