//! HTTP-backed log fetcher.

use async_trait::async_trait;
use tracing::debug;

use runlog_protocol::{ExecutionStatus, JobStatus, OwnerKind};

use crate::tail::{Cursor, FetchBatch, FetchError, LogFetcher, OwnerRef};

use super::client::{ApiError, BackendClient};

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound { what, .. } => FetchError::NotFound(what),
            err if err.is_retryable() => FetchError::Transient(err.to_string()),
            err => FetchError::ProtocolViolation(err.to_string()),
        }
    }
}

/// Fetches image and job logs from the runner backend.
///
/// Every batch carries a status:
///
/// - Image log responses may omit it; the image record is then read to
///   attach one. A failed lookup fails the fetch.
/// - A 404 on a log route can mean the owner is gone or that its log file
///   has not been written yet. The owner's existence decides: a live owner
///   yields an empty batch at the requested cursor.
#[derive(Debug, Clone)]
pub struct HttpLogFetcher {
    client: BackendClient,
}

impl HttpLogFetcher {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn fetch_image(&self, id: &str, cursor: Cursor) -> Result<FetchBatch, FetchError> {
        let response = match self.client.image_logs(id, cursor.position()).await {
            Ok(response) => response,
            Err(ApiError::NotFound { .. }) => {
                // Same answer for an unknown image and a build log not yet
                // written; the record lookup tells them apart.
                let image = self.client.image(id).await?;
                debug!(image = id, status = %image.status, "build log not written yet");
                return Ok(FetchBatch::new(
                    Vec::new(),
                    cursor,
                    Some(ExecutionStatus::Image(image.status)),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let status = match response.status {
            Some(status) => status,
            None => self.client.image(id).await?.status,
        };

        Ok(FetchBatch::new(
            strip_terminators(response.lines),
            Cursor::new(response.new_position),
            Some(ExecutionStatus::Image(status)),
        ))
    }

    async fn fetch_job(&self, id: &str, cursor: Cursor) -> Result<FetchBatch, FetchError> {
        let response = match self.client.job_logs(id, cursor.position()).await {
            Ok(response) => response,
            Err(ApiError::NotFound { message, .. }) if names_missing_log(&message) => {
                // The worker has not opened the job's log yet.
                debug!(job = id, "job log not written yet: {message}");
                return Ok(FetchBatch::new(
                    Vec::new(),
                    cursor,
                    Some(ExecutionStatus::Job(JobStatus::Pending)),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(FetchBatch::new(
            strip_terminators(response.lines),
            Cursor::new(response.new_position),
            Some(ExecutionStatus::Job(response.job.status)),
        ))
    }
}

#[async_trait]
impl LogFetcher for HttpLogFetcher {
    async fn fetch(&self, owner: &OwnerRef, cursor: Cursor) -> Result<FetchBatch, FetchError> {
        match owner.kind {
            OwnerKind::Image => self.fetch_image(&owner.id, cursor).await,
            OwnerKind::Job => self.fetch_job(&owner.id, cursor).await,
        }
    }
}

/// Whether a job route 404 body is about the log file rather than the job.
///
/// The backend answers "Job doesn't exist." for an unknown job and "No logs
/// found." or "Log file '...' does not exist." for a job that has not
/// written output yet.
fn names_missing_log(message: &str) -> bool {
    message.to_ascii_lowercase().contains("log")
}

/// The backend returns lines as read from the log file, terminator included.
fn strip_terminators(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().map(strip_terminator).collect()
}

fn strip_terminator(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}
