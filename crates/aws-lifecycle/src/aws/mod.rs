//! AWS client modules
//!
//! Wrappers around the AWS SDK clients for:
//! - EC2: Instance launch, listing and termination
//! - S3: Bucket and object management
//! - SQS: FIFO queue and message management
//!
//! Each client implements an operations trait; `memory` provides an
//! in-process implementation of all three.

pub mod context;
pub mod ec2;
pub mod error;
pub mod memory;
pub mod operations;
pub mod s3;
pub mod sqs;
pub mod types;

pub use context::{AwsContext, FromAwsContext};
pub use ec2::Ec2Client;
pub use memory::{MemoryCloud, MemoryCloudConfig};
pub use s3::S3Client;
pub use sqs::SqsClient;

// Operation traits
pub use operations::{Ec2Operations, S3Operations, SqsOperations};

#[cfg(test)]
pub use operations::{MockEc2Operations, MockS3Operations, MockSqsOperations};

// Error handling
pub use error::{AwsError, classify_anyhow_error, classify_aws_error};
