//! Shared AWS configuration context
//!
//! Provides `AwsContext` for loading the SDK configuration once and deriving
//! the EC2, S3 and SQS clients from the same session.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;

/// Loaded AWS SDK config plus the region it is scoped to.
///
/// # Example
/// ```ignore
/// let aws = AwsContext::new("us-east-1").await;
///
/// let ec2 = Ec2Client::from_context(&aws);
/// let s3 = S3Client::from_context(&aws);
/// let sqs = SqsClient::from_context(&aws);
/// ```
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Load AWS configuration for the specified region.
    ///
    /// Credentials come from the default provider chain (environment,
    /// shared config files, instance roles).
    pub async fn new(region: &str) -> Self {
        Self::with_profile(region, None).await
    }

    /// Load AWS configuration, optionally pinned to a named profile.
    pub async fn with_profile(region: &str, profile: Option<&str>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }

        Self {
            config: Arc::new(loader.load().await),
            region: region.to_string(),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }

    pub fn s3_client(&self) -> aws_sdk_s3::Client {
        aws_sdk_s3::Client::new(self.sdk_config())
    }

    pub fn sqs_client(&self) -> aws_sdk_sqs::Client {
        aws_sdk_sqs::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Clients that can be built from a loaded [`AwsContext`].
pub trait FromAwsContext: Sized {
    fn from_context(ctx: &AwsContext) -> Self;
}
