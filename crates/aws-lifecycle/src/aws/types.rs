//! Provider-neutral request and response types

use std::fmt;

/// EC2 instance lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    /// A state name this crate does not know about, kept verbatim
    Other(String),
}

impl InstanceState {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Other(name) => name,
        }
    }

    /// Parse the provider's state name
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "shutting-down" => InstanceState::ShuttingDown,
            "terminated" => InstanceState::Terminated,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            other => InstanceState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instance as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSummary {
    pub instance_id: String,
    pub state: InstanceState,
}

/// One object in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
}

/// A message delivery returned by a receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub body: String,
    /// Token required to delete this particular delivery
    pub receipt_handle: String,
}

/// Configuration for launching an EC2 instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchInstanceConfig {
    /// Machine image (e.g., "ami-0e86e20dae9224db8")
    pub image_id: String,
    /// EC2 instance type (e.g., "t2.micro")
    pub instance_type: String,
    /// Key pair name for SSH access
    pub key_name: String,
}

impl LaunchInstanceConfig {
    pub fn new(
        image_id: impl Into<String>,
        instance_type: impl Into<String>,
        key_name: impl Into<String>,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            instance_type: instance_type.into(),
            key_name: key_name.into(),
        }
    }
}

/// Configuration for creating an SQS queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub name: String,
    pub fifo: bool,
    pub content_based_deduplication: bool,
}

impl QueueConfig {
    /// A FIFO queue with content-based deduplication
    pub fn fifo(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fifo: true,
            content_based_deduplication: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_state_names_round_trip() {
        for name in [
            "pending",
            "running",
            "shutting-down",
            "terminated",
            "stopping",
            "stopped",
        ] {
            let state = InstanceState::from_name(name);
            assert!(!matches!(state, InstanceState::Other(_)), "{name} should be known");
            assert_eq!(state.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_state_is_kept_verbatim() {
        let state = InstanceState::from_name("hibernating");
        assert_eq!(state, InstanceState::Other("hibernating".to_string()));
        assert_eq!(state.to_string(), "hibernating");
    }

    #[test]
    fn test_fifo_queue_config() {
        let config = QueueConfig::fifo("jobs.fifo");
        assert!(config.fifo);
        assert!(config.content_based_deduplication);
    }
}
