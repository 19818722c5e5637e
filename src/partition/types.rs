use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one independently queryable partition (e.g. `eu-west-1`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PartitionId(pub String);

impl PartitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartitionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PartitionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state of a record as reported by the partition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Terminated => "terminated",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record returned by a partition query.
///
/// Records carry no identity beyond `record_id` and no relationships to each other.
/// `display_name` and both addresses may be empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub display_name: String,
    pub record_id: String,
    #[serde(default)]
    pub primary_address: String,
    #[serde(default)]
    pub secondary_address: String,
    pub zone: String,
    pub lifecycle_state: LifecycleState,
}

impl Record {
    /// Running record with only an id and zone set.
    pub fn new(record_id: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            display_name: String::new(),
            record_id: record_id.into(),
            primary_address: String::new(),
            secondary_address: String::new(),
            zone: zone.into(),
            lifecycle_state: LifecycleState::Running,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.lifecycle_state = state;
        self
    }

    pub fn with_addresses(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.primary_address = primary.into();
        self.secondary_address = secondary.into();
        self
    }
}
