//! Resource creation and readiness

use anyhow::{Context, Result};
use tracing::info;

use super::Clients;
use super::types::CreatedResources;
use crate::aws::types::InstanceState;
use crate::aws::{Ec2Operations, S3Operations, SqsOperations, classify_anyhow_error};
use crate::config::{Readiness, ResourceConfig, RunConfig};
use crate::wait::{describe_duration, pause, wait_for_resource};

/// Launch the instance and return its id
pub async fn create_instance<E: Ec2Operations>(
    ec2: &E,
    resources: &ResourceConfig,
) -> Result<String> {
    println!("Creating EC2 instance...\n");
    let instance_id = ec2
        .launch_instance(&resources.launch_config())
        .await
        .context("Creating EC2 instance")?;
    println!("EC2 instance created with Instance ID: {}\n", instance_id);
    Ok(instance_id)
}

/// Create the bucket and return its name
pub async fn create_bucket<S: S3Operations>(
    s3: &S,
    resources: &ResourceConfig,
) -> Result<String> {
    println!("Creating S3 bucket...\n");
    s3.create_bucket(&resources.bucket_name)
        .await
        .with_context(|| format!("Creating S3 bucket {}", resources.bucket_name))?;
    println!("S3 bucket created with name: {}\n", resources.bucket_name);
    Ok(resources.bucket_name.clone())
}

/// Create the FIFO queue and return its URL
pub async fn create_queue<Q: SqsOperations>(
    sqs: &Q,
    resources: &ResourceConfig,
) -> Result<String> {
    println!("Creating SQS FIFO queue...");
    let queue_url = sqs
        .create_queue(&resources.queue_config())
        .await
        .with_context(|| format!("Creating SQS queue {}", resources.queue_name))?;
    println!("SQS queue created with URL: {}", queue_url);
    Ok(queue_url)
}

/// Block until the new resources may be used.
///
/// With a fixed delay nothing is checked. With polling each resource is
/// waited on in turn, instance first.
pub async fn await_readiness<E, S, Q>(
    clients: &Clients<E, S, Q>,
    created: &CreatedResources,
    config: &RunConfig,
) -> Result<()>
where
    E: Ec2Operations,
    S: S3Operations,
    Q: SqsOperations,
{
    match &config.flags.readiness {
        Readiness::FixedDelay => {
            println!(
                "\nRequest sent, wait for {}...",
                describe_duration(config.delays.after_create)
            );
            pause(config.delays.after_create).await;
        }
        Readiness::Poll(wait) => {
            println!("\nRequest sent, waiting for resources to become ready...");

            let instance_id = created.instance_id.as_str();
            wait_for_resource(
                wait.clone(),
                || async move {
                    // A fresh instance id can be unknown to DescribeInstances for a while
                    match clients.ec2.instance_state(instance_id).await {
                        Ok(state) => Ok(state == InstanceState::Running),
                        Err(e) if classify_anyhow_error(&e).is_not_found() => Ok(false),
                        Err(e) => Err(e),
                    }
                },
                &format!("EC2 instance {}", instance_id),
            )
            .await?;

            let bucket = created.bucket_name.as_str();
            wait_for_resource(
                wait.clone(),
                || async move { clients.s3.bucket_exists(bucket).await },
                &format!("S3 bucket {}", bucket),
            )
            .await?;

            let queue_url = created.queue_url.as_str();
            wait_for_resource(
                wait.clone(),
                || async move { clients.sqs.queue_exists(queue_url).await },
                &format!("SQS queue {}", queue_url),
            )
            .await?;

            info!("All resources ready");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AwsError, MockEc2Operations, MockS3Operations, MockSqsOperations};
    use crate::wait::WaitConfig;

    fn polling_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.flags.readiness = Readiness::Poll(WaitConfig::default());
        config
    }

    fn created() -> CreatedResources {
        CreatedResources {
            instance_id: "i-0123456789abcdef0".to_string(),
            bucket_name: "bkt".to_string(),
            queue_url: "https://q.fifo".to_string(),
        }
    }

    fn ready_storage() -> (MockS3Operations, MockSqsOperations) {
        let mut s3 = MockS3Operations::new();
        s3.expect_bucket_exists().times(1).returning(|_| Ok(true));
        let mut sqs = MockSqsOperations::new();
        sqs.expect_queue_exists().times(1).returning(|_| Ok(true));
        (s3, sqs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_instance_id_keeps_polling() {
        let mut ec2 = MockEc2Operations::new();
        let mut first = true;
        ec2.expect_instance_state()
            .withf(|id| id == "i-0123456789abcdef0")
            .times(2)
            .returning(move |_| {
                if std::mem::take(&mut first) {
                    Err(anyhow::Error::new(AwsError::NotFound {
                        code: "InvalidInstanceID.NotFound".to_string(),
                        message: "The instance ID does not exist".to_string(),
                    }))
                } else {
                    Ok(InstanceState::Running)
                }
            });
        let (s3, sqs) = ready_storage();

        let clients = Clients { ec2, s3, sqs };
        await_readiness(&clients, &created(), &polling_config())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_instance_errors_abort_polling() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_instance_state()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("UnauthorizedOperation")));
        let mut s3 = MockS3Operations::new();
        s3.expect_bucket_exists().never();

        let clients = Clients {
            ec2,
            s3,
            sqs: MockSqsOperations::new(),
        };
        await_readiness(&clients, &created(), &polling_config())
            .await
            .unwrap_err();
    }
}
