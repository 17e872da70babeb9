//! Execution status tables.
//!
//! Codes are transmitted as small integers and must match the backend exactly:
//!
//! | code | image build     | job run  |
//! |------|-----------------|----------|
//! | 0    | DORMANT         | PENDING  |
//! | 1    | BUILDING        | RUNNING  |
//! | 2    | BUILD_SUCCESS   | SUCCESS  |
//! | 3    | BUILD_FAILED    | FAILED   |
//! | 4    | -               | KILLED   |
//!
//! Some endpoints report the lowercase name instead of the code, so both
//! forms are accepted on input. Output is always the code.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StatusError;

/// The kind of execution that owns a log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// An image build.
    Image,
    /// A script run.
    Job,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status as it appears on the wire, before it is checked against a table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Code(u64),
    Name(String),
}

/// Image build status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStatus", into = "u8")]
pub enum ImageStatus {
    Dormant,
    Building,
    BuildSuccess,
    BuildFailed,
}

impl ImageStatus {
    pub const ALL: [ImageStatus; 4] = [
        Self::Dormant,
        Self::Building,
        Self::BuildSuccess,
        Self::BuildFailed,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Self::Dormant => 0,
            Self::Building => 1,
            Self::BuildSuccess => 2,
            Self::BuildFailed => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dormant => "DORMANT",
            Self::Building => "BUILDING",
            Self::BuildSuccess => "BUILD_SUCCESS",
            Self::BuildFailed => "BUILD_FAILED",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ImageStatus> for u8 {
    fn from(status: ImageStatus) -> Self {
        status.code()
    }
}

impl TryFrom<RawStatus> for ImageStatus {
    type Error = StatusError;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw {
            RawStatus::Code(code) => u8::try_from(code)
                .ok()
                .and_then(Self::from_code)
                .ok_or(StatusError::UnknownCode {
                    kind: OwnerKind::Image,
                    code,
                }),
            RawStatus::Name(name) => Self::from_name(&name).ok_or(StatusError::UnknownName {
                kind: OwnerKind::Image,
                name,
            }),
        }
    }
}

/// Job run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStatus", into = "u8")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
    Killed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        Self::Pending,
        Self::Running,
        Self::Success,
        Self::Failed,
        Self::Killed,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Success => 2,
            Self::Failed => 3,
            Self::Killed => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<JobStatus> for u8 {
    fn from(status: JobStatus) -> Self {
        status.code()
    }
}

impl TryFrom<RawStatus> for JobStatus {
    type Error = StatusError;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw {
            RawStatus::Code(code) => u8::try_from(code)
                .ok()
                .and_then(Self::from_code)
                .ok_or(StatusError::UnknownCode {
                    kind: OwnerKind::Job,
                    code,
                }),
            RawStatus::Name(name) => Self::from_name(&name).ok_or(StatusError::UnknownName {
                kind: OwnerKind::Job,
                name,
            }),
        }
    }
}

/// Status of either owner kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    Image(ImageStatus),
    Job(JobStatus),
}

impl ExecutionStatus {
    pub fn kind(&self) -> OwnerKind {
        match self {
            Self::Image(_) => OwnerKind::Image,
            Self::Job(_) => OwnerKind::Job,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Image(s) => s.code(),
            Self::Job(s) => s.code(),
        }
    }

    /// Resolve a raw code for the given owner kind.
    pub fn from_code(kind: OwnerKind, code: u8) -> Result<Self, StatusError> {
        let status = match kind {
            OwnerKind::Image => ImageStatus::from_code(code).map(Self::Image),
            OwnerKind::Job => JobStatus::from_code(code).map(Self::Job),
        };
        status.ok_or(StatusError::UnknownCode {
            kind,
            code: u64::from(code),
        })
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(s) => s.fmt(f),
            Self::Job(s) => s.fmt(f),
        }
    }
}

impl From<ImageStatus> for ExecutionStatus {
    fn from(status: ImageStatus) -> Self {
        Self::Image(status)
    }
}

impl From<JobStatus> for ExecutionStatus {
    fn from(status: JobStatus) -> Self {
        Self::Job(status)
    }
}
