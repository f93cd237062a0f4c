//! AWS error classification
//!
//! Maps provider error codes (read through `ProvideErrorMetadata`) onto a
//! small set of categories. Classification feeds user-facing hints and lets
//! rollback treat a missing resource as already deleted; nothing here retries.

use thiserror::Error;

/// AWS error categories
#[derive(Debug, Clone, Error)]
pub enum AwsError {
    /// Resource does not exist (or no longer exists)
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    /// Resource name is already taken
    #[error("{code}: {message}")]
    AlreadyExists { code: String, message: String },

    /// Bucket still holds objects
    #[error("BucketNotEmpty: {message}")]
    BucketNotEmpty { message: String },

    /// Rate limit exceeded
    #[error("{code}: {message}")]
    Throttled { code: String, message: String },

    /// Any other provider error
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists { .. })
    }

    /// The provider error code, when one was reported
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::NotFound { code, .. }
            | AwsError::AlreadyExists { code, .. }
            | AwsError::Throttled { code, .. } => Some(code),
            AwsError::BucketNotEmpty { .. } => Some("BucketNotEmpty"),
            AwsError::Sdk { code, .. } => code.as_deref(),
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        self.code().and_then(suggestion_for_code)
    }
}

/// Error codes meaning the target resource is gone
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "NoSuchBucket",
    "NoSuchKey",
    "NotFound",
    "AWS.SimpleQueueService.NonExistentQueue",
    "QueueDoesNotExist",
];

/// Error codes meaning the name is already in use
const ALREADY_EXISTS_CODES: &[&str] = &[
    "BucketAlreadyExists",
    "BucketAlreadyOwnedByYou",
    "QueueAlreadyExists",
    "QueueNameExists",
];

/// Error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "SlowDown",
];

/// Classify a provider error from its code and message.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound {
            code: c.to_string(),
            message,
        },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => AwsError::AlreadyExists {
            code: c.to_string(),
            message,
        },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled {
            code: c.to_string(),
            message,
        },
        Some("BucketNotEmpty") => AwsError::BucketNotEmpty { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Downcast one error in the chain to `SdkError<$op>` and classify it.
macro_rules! classify_sdk_cause {
    ($cause:expr, $sdk:ident, $($op:path),+ $(,)?) => {
        $(
            if let Some(e) = $cause.downcast_ref::<$sdk::error::SdkError<$op>>() {
                let meta = $sdk::error::ProvideErrorMetadata::meta(e);
                return classify_aws_error(meta.code(), meta.message());
            }
        )+
    };
}

/// Classify an `anyhow::Error` by walking its chain.
///
/// Errors raised by the in-memory provider are `AwsError` values already.
/// SDK operation errors are read through `ProvideErrorMetadata`. Anything
/// else falls back to scanning the debug representation for a known code.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<AwsError>() {
            return e.clone();
        }

        classify_sdk_cause!(
            cause,
            aws_sdk_ec2,
            aws_sdk_ec2::operation::run_instances::RunInstancesError,
            aws_sdk_ec2::operation::describe_instances::DescribeInstancesError,
            aws_sdk_ec2::operation::terminate_instances::TerminateInstancesError,
        );
        classify_sdk_cause!(
            cause,
            aws_sdk_s3,
            aws_sdk_s3::operation::create_bucket::CreateBucketError,
            aws_sdk_s3::operation::head_bucket::HeadBucketError,
            aws_sdk_s3::operation::list_buckets::ListBucketsError,
            aws_sdk_s3::operation::put_object::PutObjectError,
            aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error,
            aws_sdk_s3::operation::delete_object::DeleteObjectError,
            aws_sdk_s3::operation::delete_bucket::DeleteBucketError,
        );
        classify_sdk_cause!(
            cause,
            aws_sdk_sqs,
            aws_sdk_sqs::operation::create_queue::CreateQueueError,
            aws_sdk_sqs::operation::get_queue_attributes::GetQueueAttributesError,
            aws_sdk_sqs::operation::list_queues::ListQueuesError,
            aws_sdk_sqs::operation::send_message::SendMessageError,
            aws_sdk_sqs::operation::receive_message::ReceiveMessageError,
            aws_sdk_sqs::operation::delete_message::DeleteMessageError,
            aws_sdk_sqs::operation::delete_queue::DeleteQueueError,
        );
    }

    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&error.to_string()));
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Codes recognised when scanning a debug string (a code that is a prefix of
/// another, like `Throttling`, comes after it)
const ALL_KNOWN_CODES: &[&str] = &[
    "AWS.SimpleQueueService.NonExistentQueue",
    "AWS.SimpleQueueService.QueueDeletedRecently",
    "InvalidInstanceID.NotFound",
    "InvalidKeyPair.NotFound",
    "InvalidAMIID.NotFound",
    "InvalidAMIID.Malformed",
    "BucketAlreadyOwnedByYou",
    "BucketAlreadyExists",
    "QueueDoesNotExist",
    "QueueAlreadyExists",
    "BucketNotEmpty",
    "NoSuchBucket",
    "NoSuchKey",
    "InstanceLimitExceeded",
    "VcpuLimitExceeded",
    "UnauthorizedOperation",
    "AccessDenied",
    "ThrottlingException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "Throttling",
    "SlowDown",
];

/// Extract an AWS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    ALL_KNOWN_CODES
        .iter()
        .find(|code| debug_str.contains(*code))
        .map(|code| (*code).to_string())
}

/// Error code to remediation hint
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "InvalidAMIID.NotFound",
        "AMI ids are region-specific. Check that the image exists in this region.",
    ),
    ("InvalidAMIID.Malformed", "The image id is not a valid AMI id (expected ami-xxxxxxxx)."),
    (
        "InvalidKeyPair.NotFound",
        "Create the EC2 key pair in this region or change the key-pair name.",
    ),
    (
        "BucketAlreadyExists",
        "S3 bucket names are global across all AWS accounts. Choose another bucket name.",
    ),
    (
        "BucketAlreadyOwnedByYou",
        "The bucket is left over from an earlier run. Delete it with the teardown command.",
    ),
    ("BucketNotEmpty", "Empty the bucket before deleting it."),
    (
        "AWS.SimpleQueueService.QueueDeletedRecently",
        "SQS blocks reusing a queue name for 60 seconds after deletion. Wait and re-run.",
    ),
    (
        "QueueAlreadyExists",
        "A queue with this name exists with different attributes. Delete it first.",
    ),
    ("InstanceLimitExceeded", "Request a service limit increase via AWS Service Quotas console."),
    ("VcpuLimitExceeded", "Request a service limit increase via AWS Service Quotas console."),
    (
        "UnauthorizedOperation",
        "The credentials lack permission for this call. Check the IAM policy or --aws-profile.",
    ),
    (
        "AccessDenied",
        "The credentials lack permission for this call. Check the IAM policy or --aws-profile.",
    ),
    ("Throttling", "AWS API rate limit hit. Wait a moment and re-run."),
    ("ThrottlingException", "AWS API rate limit hit. Wait a moment and re-run."),
    ("RequestLimitExceeded", "AWS API rate limit hit. Wait a moment and re-run."),
];

fn suggestion_for_code(code: &str) -> Option<&'static str> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_aws_error(Some(code), Some("some message"));
            assert!(err.is_not_found(), "Expected NotFound for code: {code}");
            assert_eq!(err.code(), Some(*code));
        }
    }

    #[test]
    fn already_exists_codes() {
        for code in ALREADY_EXISTS_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(
                err.is_already_exists(),
                "Expected AlreadyExists for code: {code}"
            );
        }
    }

    #[test]
    fn throttling_codes() {
        for code in THROTTLING_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(matches!(err, AwsError::Throttled { .. }));
        }
    }

    #[test]
    fn bucket_not_empty() {
        let err = classify_aws_error(Some("BucketNotEmpty"), Some("still has objects"));
        assert!(matches!(err, AwsError::BucketNotEmpty { .. }));
        assert_eq!(err.code(), Some("BucketNotEmpty"));
        assert_eq!(err.suggestion(), Some("Empty the bucket before deleting it."));
    }

    #[test]
    fn unknown_and_missing_codes() {
        let err = classify_aws_error(Some("SomeNewError"), Some("details"));
        assert!(matches!(err, AwsError::Sdk { .. }));
        assert_eq!(err.code(), Some("SomeNewError"));

        let err2 = classify_aws_error(None, Some("something failed"));
        assert!(matches!(err2, AwsError::Sdk { code: None, .. }));
        assert!(err2.suggestion().is_none());
    }

    #[test]
    fn classify_anyhow_finds_aws_error_under_context() {
        let err = anyhow::Error::new(classify_aws_error(Some("NoSuchBucket"), Some("gone")))
            .context("Failed to delete bucket");
        assert!(classify_anyhow_error(&err).is_not_found());
    }

    #[test]
    fn classify_anyhow_falls_back_to_debug_string() {
        let err = anyhow::anyhow!(r#"service error {{ code: Some("InvalidKeyPair.NotFound") }}"#);
        let classified = classify_anyhow_error(&err);
        assert_eq!(classified.code(), Some("InvalidKeyPair.NotFound"));
        assert!(classified.suggestion().is_some());
    }

    #[test]
    fn longer_code_wins_over_its_prefix() {
        let extracted = extract_error_code("ThrottlingException: Rate exceeded");
        assert_eq!(extracted.as_deref(), Some("ThrottlingException"));
        let extracted = extract_error_code("Throttling: Rate exceeded");
        assert_eq!(extracted.as_deref(), Some("Throttling"));
    }

    #[test]
    fn specific_queue_code_wins_over_generic_not_found() {
        let extracted = extract_error_code("AWS.SimpleQueueService.NonExistentQueue: gone");
        assert_eq!(
            extracted.as_deref(),
            Some("AWS.SimpleQueueService.NonExistentQueue")
        );
    }

    #[test]
    fn extract_none_from_unrelated_string() {
        assert!(extract_error_code("connection refused").is_none());
    }

    #[test]
    fn suggestions_for_known_codes() {
        for (code, _) in SUGGESTIONS {
            assert!(
                suggestion_for_code(code).is_some(),
                "No suggestion for code: {code}"
            );
        }
        assert!(suggestion_for_code("SomeUnknownCode").is_none());
    }
}
