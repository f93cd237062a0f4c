//! aws-lifecycle - provision, exercise and tear down AWS resources
//!
//! This crate drives an EC2 instance, an S3 bucket and an SQS FIFO queue
//! through their whole lifecycle, against real AWS or an in-memory provider.

pub mod aws;
pub mod config;
pub mod orchestrator;
pub mod wait;
