//! aws-lifecycle: create, use and delete an EC2 instance, S3 bucket and SQS queue
//!
//! Progress goes to stdout; diagnostics go to stderr through `tracing`.

use std::time::Duration;

use anyhow::Result;
use aws_lifecycle::aws::{AwsContext, MemoryCloud, MemoryCloudConfig, classify_anyhow_error};
use aws_lifecycle::config::{DelayConfig, Readiness, RunConfig};
use aws_lifecycle::orchestrator::{self, Clients};
use aws_lifecycle::wait::WaitConfig;
use aws_lifecycle_common::ResourceKind;
use aws_lifecycle_common::defaults::DEFAULT_REGION;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aws-lifecycle")]
#[command(about = "Provision, exercise and tear down an EC2 instance, S3 bucket and SQS queue")]
#[command(version)]
struct Args {
    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long, global = true, env = "AWS_PROFILE")]
    aws_profile: Option<String>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    /// Real AWS account
    Aws,
    /// In-process simulation, nothing is billed
    Memory,
}

/// Arguments for the run command
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Where the resources are created
    #[arg(long, value_enum, default_value_t = Backend::Aws)]
    backend: Backend,

    /// Poll each resource until ready instead of sleeping a fixed minute
    #[arg(long)]
    poll: bool,

    /// Skip every fixed sleep
    #[arg(long)]
    skip_delays: bool,

    /// Delete already-created resources when a step fails
    #[arg(long)]
    rollback_on_failure: bool,

    /// Seconds deleted resources stay listed (memory backend only)
    #[arg(long)]
    stale_read_secs: Option<u64>,
}

impl RunArgs {
    /// Reject flags that have no effect on the chosen backend
    fn validate(&self) -> Result<()> {
        if self.backend == Backend::Aws && self.stale_read_secs.is_some() {
            anyhow::bail!("--stale-read-secs only applies to --backend memory");
        }
        Ok(())
    }
}

impl From<&RunArgs> for RunConfig {
    fn from(args: &RunArgs) -> Self {
        let mut config = RunConfig::default();
        if args.skip_delays {
            config.delays = DelayConfig::none();
        }
        if args.poll {
            config.flags.readiness = Readiness::Poll(WaitConfig::default());
        }
        config.flags.rollback_on_failure = args.rollback_on_failure;
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full create, use and delete sequence
    Run(RunArgs),

    /// List instances, buckets and queues once
    List,

    /// Delete resources left behind by a failed run
    Teardown {
        /// EC2 instance to terminate
        #[arg(long)]
        instance_id: Option<String>,

        /// S3 bucket to empty and delete
        #[arg(long)]
        bucket: Option<String>,

        /// SQS queue URL to delete
        #[arg(long)]
        queue_url: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {hint}");
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    // RUST_LOG wins; the SDK crates stay quiet unless asked for
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{default_level},aws_config=warn,aws_smithy_runtime=warn,hyper=warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(profile) = &args.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    match &args.command {
        Command::Run(run_args) => {
            run_args.validate()?;
            let config = RunConfig::from(run_args);
            info!(
                backend = ?run_args.backend,
                readiness = ?config.flags.readiness,
                rollback = config.flags.rollback_on_failure,
                total_delay_secs = config.delays.total().as_secs(),
                "Starting lifecycle run"
            );

            match run_args.backend {
                Backend::Aws => {
                    let aws = load_context(&config.resources.region, &args).await;
                    let clients = Clients::from_context(&aws);
                    orchestrator::run_lifecycle(&clients, &config).await?;
                }
                Backend::Memory => {
                    let stale_reads = Duration::from_secs(run_args.stale_read_secs.unwrap_or(0));
                    let cloud = MemoryCloud::new(MemoryCloudConfig {
                        region: config.resources.region.clone(),
                        stale_reads,
                        ..Default::default()
                    });
                    let clients = Clients::memory(&cloud);
                    orchestrator::run_lifecycle(&clients, &config).await?;
                }
            }
        }

        Command::List => {
            let aws = load_context(DEFAULT_REGION, &args).await;
            let clients = Clients::from_context(&aws);
            orchestrator::list_resources(&clients).await?.print();
        }

        Command::Teardown {
            instance_id,
            bucket,
            queue_url,
        } => {
            let targets: Vec<(ResourceKind, String)> = [
                (ResourceKind::Ec2Instance, instance_id),
                (ResourceKind::S3Bucket, bucket),
                (ResourceKind::SqsQueue, queue_url),
            ]
            .into_iter()
            .filter_map(|(kind, id)| id.clone().map(|id| (kind, id)))
            .collect();

            let aws = load_context(DEFAULT_REGION, &args).await;
            let clients = Clients::from_context(&aws);
            orchestrator::teardown_orphans(&clients, targets).await?;
        }
    }

    Ok(())
}

async fn load_context(region: &str, args: &Args) -> AwsContext {
    AwsContext::with_profile(region, args.aws_profile.as_deref()).await
}
