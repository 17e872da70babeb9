//! Image, script-run and schedule payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::ImageStatus;

/// An image row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ImageStatus,
}

/// `GET /api/image/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEnvelope {
    pub image: ImageRecord,
}

/// `POST /api/script/{id}` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunScriptResponse {
    pub job_id: u64,
}

/// A cron schedule attached to a script.
///
/// The cron expression is carried verbatim; it is never evaluated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: u64,
    pub script_id: String,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub running: bool,
    /// Unix seconds.
    #[serde(default)]
    pub last_run: Option<i64>,
    /// Unix seconds.
    pub created_at: i64,
}

impl Schedule {
    pub fn last_run_at(&self) -> Option<DateTime<Utc>> {
        self.last_run.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }
}

/// `GET /api/schedule` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePage {
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

/// `PATCH /api/schedule/{id}` body. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ScheduleUpdate {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            cron: None,
            enabled: Some(enabled),
        }
    }
}
