//! Core types for the orchestrator

/// Identifiers of the three resources created by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResources {
    /// EC2 instance ID
    pub instance_id: String,
    /// S3 bucket name
    pub bucket_name: String,
    /// SQS queue URL
    pub queue_url: String,
}
