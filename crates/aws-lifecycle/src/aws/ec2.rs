//! EC2 instance management

use super::context::{AwsContext, FromAwsContext};
use super::operations::Ec2Operations;
use super::types::{InstanceState, InstanceSummary, LaunchInstanceConfig};
use anyhow::{Context, Result};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{Instance, InstanceType};
use tracing::{debug, info};

/// EC2 client bound to one region
pub struct Ec2Client {
    client: Client,
}

impl FromAwsContext for Ec2Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }
}

fn summarize(instance: &Instance) -> Option<InstanceSummary> {
    let instance_id = instance.instance_id()?.to_string();
    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(|name| InstanceState::from_name(name.as_str()))
        .unwrap_or(InstanceState::Pending);

    Some(InstanceSummary { instance_id, state })
}

impl Ec2Operations for Ec2Client {
    async fn launch_instance(&self, config: &LaunchInstanceConfig) -> Result<String> {
        info!(
            image_id = %config.image_id,
            instance_type = %config.instance_type,
            key_name = %config.key_name,
            "Launching instance"
        );

        let response = self
            .client
            .run_instances()
            .image_id(&config.image_id)
            .instance_type(InstanceType::from(config.instance_type.as_str()))
            .key_name(&config.key_name)
            .min_count(1)
            .max_count(1)
            .send()
            .await
            .context("Failed to launch instance")?;

        let instance_id = response
            .instances()
            .first()
            .and_then(|i| i.instance_id())
            .context("No instance returned")?
            .to_string();

        info!(instance_id = %instance_id, "Instance launched");
        Ok(instance_id)
    }

    async fn describe_instances(&self) -> Result<Vec<InstanceSummary>> {
        let mut instances = Vec::new();
        let mut next_token = None;

        loop {
            let response = self
                .client
                .describe_instances()
                .set_next_token(next_token.take())
                .send()
                .await
                .context("Failed to describe instances")?;

            instances.extend(
                response
                    .reservations()
                    .iter()
                    .flat_map(|r| r.instances())
                    .filter_map(summarize),
            );

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(count = instances.len(), "Described instances");
        Ok(instances)
    }

    async fn instance_state(&self, instance_id: &str) -> Result<InstanceState> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context("Failed to describe instance")?;

        let summary = response
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .find_map(summarize)
            .with_context(|| format!("Instance {} not found", instance_id))?;

        debug!(instance_id = %instance_id, state = %summary.state, "Instance state");
        Ok(summary.state)
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        info!(instance_id = %instance_id, "Terminating instance");

        self.client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context("Failed to terminate instance")?;

        Ok(())
    }
}
