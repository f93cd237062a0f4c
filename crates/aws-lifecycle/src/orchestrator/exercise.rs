//! Using the resources: upload an object, send and consume a message

use anyhow::{Context, Result};
use aws_lifecycle_common::defaults::RECEIVE_BATCH_SIZE;
use tracing::{debug, info};

use crate::aws::{S3Operations, SqsOperations};
use crate::config::{DelayConfig, ExerciseConfig};
use crate::wait::pause;

/// Write an empty local file and upload it under its own name.
///
/// The local file is left in place afterwards.
pub async fn upload_file<S: S3Operations>(
    s3: &S,
    bucket: &str,
    exercise: &ExerciseConfig,
    delays: &DelayConfig,
) -> Result<()> {
    let path = exercise.upload_path();
    tokio::fs::write(&path, b"")
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    println!("Uploading {} to S3 bucket...\n", exercise.file_name);
    s3.upload_file(bucket, &exercise.file_name, &path)
        .await
        .with_context(|| format!("Uploading {} to {}", exercise.file_name, bucket))?;
    println!(
        "File '{}' uploaded to S3 bucket '{}'\n",
        exercise.file_name, bucket
    );

    pause(delays.after_upload).await;
    Ok(())
}

/// Send the test message to the queue
pub async fn send_message<Q: SqsOperations>(
    sqs: &Q,
    queue_url: &str,
    exercise: &ExerciseConfig,
    delays: &DelayConfig,
) -> Result<()> {
    println!("Sending message to SQS queue...\n");
    let message_id = sqs
        .send_message(queue_url, &exercise.message_body, &exercise.group_id)
        .await
        .context("Sending message")?;
    info!(message_id = %message_id, group_id = %exercise.group_id, "Message sent");
    println!("Message sent to SQS queue.\n");

    pause(delays.after_send).await;
    Ok(())
}

/// Receive at most one message and delete it by its receipt handle.
///
/// An empty queue is not an error; `None` is returned.
pub async fn receive_and_delete<Q: SqsOperations>(
    sqs: &Q,
    queue_url: &str,
) -> Result<Option<String>> {
    println!("Retrieving and deleting message from SQS queue...\n");

    let messages = sqs
        .receive_messages(queue_url, RECEIVE_BATCH_SIZE)
        .await
        .context("Receiving message")?;

    let Some(message) = messages.into_iter().next() else {
        println!("No messages found in the queue.\n");
        return Ok(None);
    };

    println!("Message Body: {}\n", message.body);
    sqs.delete_message(queue_url, &message.receipt_handle)
        .await
        .context("Deleting message")?;
    debug!(message_id = %message.message_id, "Message deleted");
    println!("Message deleted from SQS queue.\n");

    Ok(Some(message.body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::MockSqsOperations;
    use crate::aws::types::ReceivedMessage;

    #[tokio::test]
    async fn test_receive_deletes_by_receipt_handle() {
        let mut sqs = MockSqsOperations::new();
        sqs.expect_receive_messages()
            .withf(|url, max| url == "q" && *max == 1)
            .times(1)
            .returning(|_, _| {
                Ok(vec![ReceivedMessage {
                    message_id: "m-1".to_string(),
                    body: "hello".to_string(),
                    receipt_handle: "rh-1".to_string(),
                }])
            });
        sqs.expect_delete_message()
            .withf(|url, handle| url == "q" && handle == "rh-1")
            .times(1)
            .returning(|_, _| Ok(()));

        let body = receive_and_delete(&sqs, "q").await.unwrap();
        assert_eq!(body.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_empty_receive_is_not_an_error() {
        let mut sqs = MockSqsOperations::new();
        sqs.expect_receive_messages()
            .returning(|_, _| Ok(Vec::new()));
        sqs.expect_delete_message().never();

        assert_eq!(receive_and_delete(&sqs, "q").await.unwrap(), None);
    }
}
