//! Log endpoint payloads.
//!
//! Both log endpoints take a byte offset (`last_position`) and answer with the
//! lines found at or after it plus the offset to resume from.

use serde::{Deserialize, Serialize};

use crate::status::{ImageStatus, JobStatus};

/// Query string for both log endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub last_position: u64,
}

/// `GET /api/image/{id}/logs` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLogsResponse {
    /// Lines read from the build log, terminators included.
    #[serde(default)]
    pub lines: Vec<String>,
    /// Offset to pass as `last_position` next time.
    pub new_position: u64,
    /// Current build status. Older backends omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ImageStatus>,
}

/// `GET /api/job/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogsResponse {
    pub job: JobRecord,
    #[serde(default)]
    pub lines: Vec<String>,
    pub new_position: u64,
}

/// A job row as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: u64,
    #[serde(default)]
    pub script_id: Option<String>,
    pub status: JobStatus,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Unix seconds; absent while the job is still going.
    #[serde(default)]
    pub finished_at: Option<i64>,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}
