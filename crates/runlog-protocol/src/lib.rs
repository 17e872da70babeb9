//! Runlog Protocol Types
//!
//! Defines the JSON payloads exchanged with the image/script runner backend
//! and the fixed numeric status tables shared by both sides.

pub mod error;
pub mod logs;
pub mod resources;
pub mod status;

pub use error::{ErrorCode, StatusError};
pub use logs::{ImageLogsResponse, JobLogsResponse, JobRecord, LogsQuery};
pub use resources::{
    ImageEnvelope, ImageRecord, RunScriptResponse, Schedule, SchedulePage, ScheduleUpdate,
};
pub use status::{ExecutionStatus, ImageStatus, JobStatus, OwnerKind};

/// Path prefix shared by every backend route.
pub const API_PREFIX: &str = "/api";
