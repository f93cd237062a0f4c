//! Lifecycle tests against the in-memory provider
//!
//! Time is paused, so the fixed minute-long sleeps finish instantly while the
//! provider still sees them elapse.

use std::time::Duration;

use aws_lifecycle::aws::memory::{MemoryEc2, MemoryS3, MemorySqs};
use aws_lifecycle::aws::types::{InstanceState, ObjectSummary};
use aws_lifecycle::aws::{MemoryCloud, MemoryCloudConfig, S3Operations, SqsOperations};
use aws_lifecycle::config::{DelayConfig, Readiness, RunConfig};
use aws_lifecycle::orchestrator::{self, Clients, exercise, provision, teardown};
use aws_lifecycle::wait::WaitConfig;
use aws_lifecycle_common::defaults::{DEFAULT_BUCKET_NAME, DEFAULT_UPLOAD_FILE};
use tempfile::TempDir;

type MemoryClients = Clients<MemoryEc2, MemoryS3, MemorySqs>;

fn setup(stale_reads: Duration) -> (MemoryCloud, MemoryClients) {
    let cloud = MemoryCloud::new(MemoryCloudConfig {
        stale_reads,
        ..Default::default()
    });
    let clients = Clients::memory(&cloud);
    (cloud, clients)
}

fn run_config(upload_dir: &TempDir) -> RunConfig {
    let mut config = RunConfig::default();
    config.exercise.upload_dir = upload_dir.path().to_path_buf();
    config
}

#[tokio::test(start_paused = true)]
async fn test_created_resources_show_up_in_listing() {
    let (_cloud, clients) = setup(Duration::ZERO);
    let resources = RunConfig::default().resources;

    let instance_id = provision::create_instance(&clients.ec2, &resources)
        .await
        .unwrap();
    let bucket = provision::create_bucket(&clients.s3, &resources)
        .await
        .unwrap();
    let queue_url = provision::create_queue(&clients.sqs, &resources)
        .await
        .unwrap();

    assert!(instance_id.starts_with("i-"));
    assert_eq!(bucket, DEFAULT_BUCKET_NAME);
    assert!(queue_url.ends_with("/animesh-cc-project1-sqs-queue.fifo"));

    let inventory = orchestrator::list_resources(&clients).await.unwrap();
    assert!(inventory.has_instance(&instance_id));
    assert!(inventory.has_bucket(&bucket));
    assert!(inventory.has_queue(&queue_url));
    assert_eq!(inventory.instances[0].state, InstanceState::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_upload_leaves_one_empty_object() {
    let (cloud, clients) = setup(Duration::ZERO);
    let dir = TempDir::new().unwrap();
    let config = run_config(&dir);

    clients.s3.create_bucket(DEFAULT_BUCKET_NAME).await.unwrap();
    exercise::upload_file(
        &clients.s3,
        DEFAULT_BUCKET_NAME,
        &config.exercise,
        &config.delays,
    )
    .await
    .unwrap();

    assert_eq!(
        cloud.bucket_objects(DEFAULT_BUCKET_NAME).unwrap(),
        vec![ObjectSummary {
            key: DEFAULT_UPLOAD_FILE.to_string(),
            size: 0,
        }]
    );
    // The local file stays behind
    assert!(dir.path().join(DEFAULT_UPLOAD_FILE).exists());
}

#[tokio::test(start_paused = true)]
async fn test_message_round_trip_then_empty_queue() {
    let (cloud, clients) = setup(Duration::ZERO);
    let dir = TempDir::new().unwrap();
    let config = run_config(&dir);

    let queue_url = provision::create_queue(&clients.sqs, &config.resources)
        .await
        .unwrap();
    exercise::send_message(&clients.sqs, &queue_url, &config.exercise, &config.delays)
        .await
        .unwrap();

    let body = exercise::receive_and_delete(&clients.sqs, &queue_url)
        .await
        .unwrap();
    assert_eq!(body.as_deref(), Some("This is a test message"));
    assert_eq!(cloud.queue_depth(&queue_url), Some(0));

    let again = exercise::receive_and_delete(&clients.sqs, &queue_url)
        .await
        .unwrap();
    assert_eq!(again, None);
}

#[tokio::test(start_paused = true)]
async fn test_bucket_emptied_before_delete() {
    let (cloud, clients) = setup(Duration::ZERO);
    let dir = TempDir::new().unwrap();
    let config = run_config(&dir);

    clients.s3.create_bucket(DEFAULT_BUCKET_NAME).await.unwrap();
    exercise::upload_file(
        &clients.s3,
        DEFAULT_BUCKET_NAME,
        &config.exercise,
        &config.delays,
    )
    .await
    .unwrap();

    // A non-empty bucket refuses deletion
    let err = clients
        .s3
        .delete_bucket(DEFAULT_BUCKET_NAME)
        .await
        .unwrap_err();
    assert!(format!("{err:?}").contains("BucketNotEmpty"));

    let deleted = teardown::empty_bucket(&clients.s3, DEFAULT_BUCKET_NAME)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(cloud.bucket_objects(DEFAULT_BUCKET_NAME), Some(Vec::new()));

    clients.s3.delete_bucket(DEFAULT_BUCKET_NAME).await.unwrap();
    assert_eq!(cloud.bucket_objects(DEFAULT_BUCKET_NAME), None);
}

#[tokio::test(start_paused = true)]
async fn test_taken_bucket_name_orphans_instance() {
    let (cloud, clients) = setup(Duration::ZERO);
    cloud.reserve_foreign_bucket(DEFAULT_BUCKET_NAME);
    let dir = TempDir::new().unwrap();

    let err = orchestrator::run_lifecycle(&clients, &run_config(&dir))
        .await
        .unwrap_err();

    assert!(format!("{err:?}").contains("BucketAlreadyExists"));
    assert_eq!(cloud.live_instance_count(), 1);
    assert!(clients.sqs.list_queues().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_taken_bucket_name_rolls_back_instance() {
    let (cloud, clients) = setup(Duration::ZERO);
    cloud.reserve_foreign_bucket(DEFAULT_BUCKET_NAME);
    let dir = TempDir::new().unwrap();
    let mut config = run_config(&dir);
    config.flags.rollback_on_failure = true;

    let err = orchestrator::run_lifecycle(&clients, &config)
        .await
        .unwrap_err();

    assert!(format!("{err:?}").contains("BucketAlreadyExists"));
    assert_eq!(cloud.live_instance_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_full_run_without_stale_reads_ends_empty() {
    let (cloud, clients) = setup(Duration::ZERO);
    let dir = TempDir::new().unwrap();
    let config = run_config(&dir);

    let start = tokio::time::Instant::now();
    let summary = orchestrator::run_lifecycle(&clients, &config)
        .await
        .unwrap();
    assert!(start.elapsed() >= config.delays.total());

    // Listed after the one-minute wait, so the instance has booted
    let booted = summary
        .initial
        .instances
        .iter()
        .find(|i| i.instance_id == summary.resources.instance_id)
        .unwrap();
    assert_eq!(booted.state, InstanceState::Running);
    assert!(summary.initial.has_bucket(&summary.resources.bucket_name));
    assert!(summary.initial.has_queue(&summary.resources.queue_url));

    assert_eq!(
        summary.received_body.as_deref(),
        Some("This is a test message")
    );
    assert!(summary.final_listing.is_empty());
    assert_eq!(cloud.live_instance_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_reads_keep_deleted_queue_listed() {
    // Longer than the 40 seconds between teardown and the final listing
    let (_cloud, clients) = setup(Duration::from_secs(60));
    let dir = TempDir::new().unwrap();

    let summary = orchestrator::run_lifecycle(&clients, &run_config(&dir))
        .await
        .unwrap();

    let listing = &summary.final_listing;
    assert!(listing.has_queue(&summary.resources.queue_url));
    assert!(listing.has_bucket(&summary.resources.bucket_name));
    let instance = listing
        .instances
        .iter()
        .find(|i| i.instance_id == summary.resources.instance_id)
        .unwrap();
    assert_eq!(instance.state, InstanceState::Terminated);

    // Gone from the listing but still deleted: the queue cannot be used
    let err = clients
        .sqs
        .receive_messages(&summary.resources.queue_url, 1)
        .await
        .unwrap_err();
    assert!(format!("{err:?}").contains("NonExistentQueue"));
}

#[tokio::test(start_paused = true)]
async fn test_polling_run_without_fixed_delays() {
    let (_cloud, clients) = setup(Duration::ZERO);
    let dir = TempDir::new().unwrap();
    let mut config = run_config(&dir);
    config.delays = DelayConfig::none();
    config.flags.readiness = Readiness::Poll(WaitConfig::default());

    let summary = orchestrator::run_lifecycle(&clients, &config)
        .await
        .unwrap();

    // Polling waited for the instance to boot even with no fixed sleep
    assert!(summary.initial.instances.iter().all(|i| i.state == InstanceState::Running));
    assert!(summary.final_listing.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_orphans_after_failed_run() {
    let (cloud, clients) = setup(Duration::ZERO);
    let dir = TempDir::new().unwrap();
    let config = run_config(&dir);

    let instance_id = provision::create_instance(&clients.ec2, &config.resources)
        .await
        .unwrap();
    let bucket = provision::create_bucket(&clients.s3, &config.resources)
        .await
        .unwrap();
    exercise::upload_file(&clients.s3, &bucket, &config.exercise, &DelayConfig::none())
        .await
        .unwrap();

    orchestrator::teardown_orphans(
        &clients,
        vec![
            (aws_lifecycle_common::ResourceKind::S3Bucket, bucket.clone()),
            (aws_lifecycle_common::ResourceKind::Ec2Instance, instance_id),
        ],
    )
    .await
    .unwrap();

    assert_eq!(cloud.live_instance_count(), 0);
    assert_eq!(cloud.bucket_objects(&bucket), None);
}
