//! Fixed identifiers and timings for a lifecycle run
//!
//! These are literals on purpose: the run always targets the same region,
//! image, key pair, bucket and queue.

/// AWS region all three resources live in
pub const DEFAULT_REGION: &str = "us-east-1";

/// Machine image for the instance (region-specific)
pub const DEFAULT_IMAGE_ID: &str = "ami-0e86e20dae9224db8";

/// EC2 instance type
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";

/// EC2 key pair attached to the instance
pub const DEFAULT_KEY_NAME: &str = "animesh-cc-project1-key-pair";

/// S3 bucket name (globally unique namespace)
pub const DEFAULT_BUCKET_NAME: &str = "animesh-cc-project1-s3-bucket";

/// SQS queue name; the `.fifo` suffix is mandatory for FIFO queues
pub const DEFAULT_QUEUE_NAME: &str = "animesh-cc-project1-sqs-queue.fifo";

/// Suffix AWS requires on FIFO queue names
pub const FIFO_SUFFIX: &str = ".fifo";

/// Local file created empty and uploaded under its own name
pub const DEFAULT_UPLOAD_FILE: &str = "CSE546test.txt";

/// Body of the message sent to the queue
pub const DEFAULT_MESSAGE_BODY: &str = "This is a test message";

/// FIFO message group id
pub const DEFAULT_MESSAGE_GROUP_ID: &str = "testGroup1";

/// Seconds to wait after creating the resources
pub const AFTER_CREATE_DELAY_SECS: u64 = 60;

/// Seconds to wait after uploading the file
pub const AFTER_UPLOAD_DELAY_SECS: u64 = 10;

/// Seconds to wait after sending the message
pub const AFTER_SEND_DELAY_SECS: u64 = 10;

/// Seconds to wait before deleting the resources
pub const BEFORE_TEARDOWN_DELAY_SECS: u64 = 10;

/// Seconds to wait right after deleting the resources
pub const AFTER_TEARDOWN_DELAY_SECS: u64 = 10;

/// Seconds to wait before the final listing
pub const BEFORE_FINAL_LISTING_DELAY_SECS: u64 = 30;

/// Maximum number of messages requested per receive
pub const RECEIVE_BATCH_SIZE: i32 = 1;
