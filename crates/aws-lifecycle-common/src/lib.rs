//! aws-lifecycle-common - Shared constants and types
//!
//! This crate holds the fixed identifiers used by the lifecycle run and the
//! resource kinds it manages, without any AWS SDK dependencies.
//!
//! ## Modules
//!
//! - [`defaults`]: Hardcoded resource identifiers, payloads and delays
//! - [`resource_kind`]: Managed resource kinds and their teardown order

pub mod defaults;
pub mod resource_kind;

pub use resource_kind::ResourceKind;
