//! Partition Service Protocol
//!
//! Endpoints and Data Transfer Objects exchanged between the HTTP client
//! (`source::http`) and the demo partition service (`server`). All bodies are JSON.

use crate::partition::filter::FilterPredicate;
use crate::partition::types::{PartitionId, Record};
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Lists every partition, discovered through the `home` query parameter.
pub const ENDPOINT_PARTITIONS: &str = "/partitions";
/// Records of one partition. The id travels as a single percent-encoded segment.
pub const ENDPOINT_RECORDS: &str = "/partitions/:id/records";

const PARTITIONS_SEGMENT: &str = "partitions";
const RECORDS_SEGMENT: &str = "records";

/// Path segments of `ENDPOINT_PARTITIONS`, relative to the service base URL.
pub fn partitions_segments() -> [&'static str; 1] {
    [PARTITIONS_SEGMENT]
}

/// Path segments of `ENDPOINT_RECORDS` for `partition`, not yet encoded.
pub fn records_segments(partition: &PartitionId) -> [&str; 3] {
    [PARTITIONS_SEGMENT, partition.as_str(), RECORDS_SEGMENT]
}

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ListPartitionsResponse {
    /// Partition the listing was served through.
    pub home: PartitionId,
    pub partitions: Vec<PartitionId>,
}

/// Body of a records query. Predicates are applied in order and ANDed.
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchRecordsRequest {
    pub filters: Vec<FilterPredicate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchRecordsResponse {
    pub partition: PartitionId,
    pub records: Vec<Record>,
}

/// Body returned with every non-2xx status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
