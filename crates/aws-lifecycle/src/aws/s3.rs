//! S3 bucket and object management

use super::context::{AwsContext, FromAwsContext};
use super::error::classify_anyhow_error;
use super::operations::S3Operations;
use super::types::ObjectSummary;
use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use std::path::Path;
use tracing::{debug, info};

/// `us-east-1` is the default location and must not be sent as a constraint
const DEFAULT_LOCATION: &str = "us-east-1";

/// S3 client bound to one region
pub struct S3Client {
    client: Client,
    region: String,
}

impl FromAwsContext for S3Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
            region: ctx.region().to_string(),
        }
    }
}

impl S3Client {
    /// Create a new S3 client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }
}

impl S3Operations for S3Client {
    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        info!(bucket = %bucket, region = %self.region, "Creating S3 bucket");

        let mut request = self.client.create_bucket().bucket(bucket);

        if self.region != DEFAULT_LOCATION {
            let create_config = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(create_config);
        }

        request.send().await.context("Failed to create bucket")?;
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = anyhow::Error::from(e);
                if classify_anyhow_error(&err).is_not_found() {
                    debug!(bucket = %bucket, "Bucket not visible yet");
                    Ok(false)
                } else {
                    Err(err.context("Failed to check bucket"))
                }
            }
        }
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .context("Failed to list buckets")?;

        let names: Vec<String> = response
            .buckets()
            .iter()
            .filter_map(|b| b.name())
            .map(|s| s.to_string())
            .collect();

        debug!(count = names.len(), "Listed buckets");
        Ok(names)
    }

    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        info!(bucket = %bucket, key = %key, path = %path.display(), "Uploading file");

        let body = ByteStream::from_path(path)
            .await
            .context("Failed to read file")?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .context("Failed to upload file")?;

        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .context("Failed to list objects")?;

            objects.extend(response.contents().iter().filter_map(|object| {
                object.key().map(|key| ObjectSummary {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0),
                })
            }));

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        info!(bucket = %bucket, key = %key, "Deleting object");

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context("Failed to delete object")?;

        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        info!(bucket = %bucket, "Deleting bucket");

        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .context("Failed to delete bucket")?;

        Ok(())
    }
}
