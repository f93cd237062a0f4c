//! Listing every instance, bucket and queue visible to the session

use std::fmt::Write as _;

use anyhow::{Context, Result};
use tracing::debug;

use super::Clients;
use crate::aws::types::InstanceSummary;
use crate::aws::{Ec2Operations, S3Operations, SqsOperations};

/// Snapshot of one listing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub instances: Vec<InstanceSummary>,
    pub buckets: Vec<String>,
    pub queues: Vec<String>,
}

impl Inventory {
    pub fn has_instance(&self, instance_id: &str) -> bool {
        self.instances.iter().any(|i| i.instance_id == instance_id)
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.iter().any(|b| b == bucket)
    }

    pub fn has_queue(&self, queue_url: &str) -> bool {
        self.queues.iter().any(|q| q == queue_url)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.buckets.is_empty() && self.queues.is_empty()
    }

    /// The listing as printed to stdout
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("\nListing EC2 instances:\n");
        for instance in &self.instances {
            let _ = writeln!(
                out,
                "Instance ID: {} - State: {}",
                instance.instance_id, instance.state
            );
        }

        out.push_str("\nListing S3 buckets:\n");
        for bucket in &self.buckets {
            let _ = writeln!(out, "Bucket Name: {}\n", bucket);
        }

        out.push_str("\nListing SQS queues:\n");
        if self.queues.is_empty() {
            out.push_str("No SQS queues found.\n\n");
        } else {
            for queue_url in &self.queues {
                let _ = writeln!(out, "Queue URL: {}\n", queue_url);
            }
        }

        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

/// Enumerate all three resource kinds
pub async fn list_resources<E, S, Q>(clients: &Clients<E, S, Q>) -> Result<Inventory>
where
    E: Ec2Operations,
    S: S3Operations,
    Q: SqsOperations,
{
    let instances = clients
        .ec2
        .describe_instances()
        .await
        .context("Listing EC2 instances")?;
    let buckets = clients
        .s3
        .list_buckets()
        .await
        .context("Listing S3 buckets")?;
    let queues = clients
        .sqs
        .list_queues()
        .await
        .context("Listing SQS queues")?;

    debug!(
        instances = instances.len(),
        buckets = buckets.len(),
        queues = queues.len(),
        "Listed resources"
    );

    Ok(Inventory {
        instances,
        buckets,
        queues,
    })
}
