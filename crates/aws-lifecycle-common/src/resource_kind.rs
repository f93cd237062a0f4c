//! Managed AWS resource kinds and teardown ordering

use std::fmt;

/// Types of AWS resources created by a lifecycle run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// EC2 instance, identified by instance id
    Ec2Instance,
    /// S3 bucket, identified by name
    S3Bucket,
    /// SQS queue, identified by URL
    SqsQueue,
}

impl ResourceKind {
    /// All kinds, in creation order
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Ec2Instance,
        ResourceKind::S3Bucket,
        ResourceKind::SqsQueue,
    ];

    /// Position in the teardown sequence (lower number = deleted first)
    ///
    /// The instance is terminated first because termination is asynchronous
    /// on the provider side and takes the longest to settle.
    pub fn teardown_order(self) -> u8 {
        match self {
            ResourceKind::Ec2Instance => 0,
            ResourceKind::S3Bucket => 1,
            ResourceKind::SqsQueue => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Ec2Instance => "ec2-instance",
            ResourceKind::S3Bucket => "s3-bucket",
            ResourceKind::SqsQueue => "sqs-queue",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
