//! Backend HTTP client
//!
//! Thin typed wrapper over the runner backend's REST routes. Every call is a
//! single request: retry policy belongs to the caller (the tail session
//! retries on its own cadence, one-shot CLI commands do not retry).

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use runlog_protocol::{
    ErrorCode, ImageEnvelope, ImageLogsResponse, ImageRecord, JobLogsResponse, LogsQuery,
    RunScriptResponse, SchedulePage, ScheduleUpdate, API_PREFIX,
};

/// Longest error body carried into an [`ApiError`].
const MAX_ERROR_BODY: usize = 512;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend root, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Per-request timeout (connect + response)
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Backend call errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404. `message` is the response body, which is the only way to tell
    /// a missing owner from a missing log file on the log routes.
    #[error("{what} not found")]
    NotFound { what: String, message: String },

    #[error("{what} rejected ({code}): {message}")]
    Rejected {
        what: String,
        code: ErrorCode,
        message: String,
    },

    #[error("server error {status} for {what}: {message}")]
    Server {
        what: String,
        status: u16,
        message: String,
    },

    #[error("request for {what} failed: {source}")]
    Transport {
        what: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("undecodable response for {what}: {detail}")]
    Decode { what: String, detail: String },

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ApiError {
    /// Error code for a failed HTTP exchange, if the server answered.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ApiError::NotFound { .. } => Some(ErrorCode::NotFound),
            ApiError::Rejected { code, .. } => Some(*code),
            ApiError::Server { .. } => Some(ErrorCode::ServerError),
            _ => None,
        }
    }

    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            other => other.code().is_some_and(|c| c.is_retryable()),
        }
    }
}

/// Typed client for the runner backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(ApiError::Build)?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    // === Logs ===

    /// `GET /api/image/{id}/logs?last_position=N`
    pub async fn image_logs(
        &self,
        image_id: &str,
        last_position: u64,
    ) -> Result<ImageLogsResponse, ApiError> {
        let what = format!("image {image_id}");
        let request = self
            .http
            .get(self.url(&format!("/image/{image_id}/logs")))
            .query(&LogsQuery { last_position });
        decode(self.send(request, &what).await?, &what).await
    }

    /// `GET /api/job/{id}?last_position=N`
    pub async fn job_logs(
        &self,
        job_id: &str,
        last_position: u64,
    ) -> Result<JobLogsResponse, ApiError> {
        let what = format!("job {job_id}");
        let request = self
            .http
            .get(self.url(&format!("/job/{job_id}")))
            .query(&LogsQuery { last_position });
        decode(self.send(request, &what).await?, &what).await
    }

    // === Images ===

    /// `GET /api/image/{id}`
    pub async fn image(&self, image_id: &str) -> Result<ImageRecord, ApiError> {
        let what = format!("image {image_id}");
        let request = self.http.get(self.url(&format!("/image/{image_id}")));
        let envelope: ImageEnvelope = decode(self.send(request, &what).await?, &what).await?;
        Ok(envelope.image)
    }

    /// `POST /api/image/{id}/build`
    pub async fn build_image(&self, image_id: &str) -> Result<(), ApiError> {
        let what = format!("image {image_id}");
        let request = self.http.post(self.url(&format!("/image/{image_id}/build")));
        self.send(request, &what).await.map(drop)
    }

    /// `PATCH /api/image/{id}/destroy`
    pub async fn destroy_image(&self, image_id: &str) -> Result<(), ApiError> {
        let what = format!("image {image_id}");
        let request = self.http.patch(self.url(&format!("/image/{image_id}/destroy")));
        self.send(request, &what).await.map(drop)
    }

    // === Scripts and jobs ===

    /// `POST /api/script/{id}`: start a job for the script.
    pub async fn run_script(&self, script_id: &str) -> Result<RunScriptResponse, ApiError> {
        let what = format!("script {script_id}");
        let request = self.http.post(self.url(&format!("/script/{script_id}")));
        decode(self.send(request, &what).await?, &what).await
    }

    /// `PATCH /api/job/{id}/kill`
    pub async fn kill_job(&self, job_id: &str) -> Result<(), ApiError> {
        let what = format!("job {job_id}");
        let request = self.http.patch(self.url(&format!("/job/{job_id}/kill")));
        self.send(request, &what).await.map(drop)
    }

    /// `DELETE /api/job/{id}`
    pub async fn delete_job(&self, job_id: &str) -> Result<(), ApiError> {
        let what = format!("job {job_id}");
        let request = self.http.delete(self.url(&format!("/job/{job_id}")));
        self.send(request, &what).await.map(drop)
    }

    // === Schedules ===

    /// `GET /api/schedule?script_id=S`
    pub async fn schedules(&self, script_id: &str) -> Result<SchedulePage, ApiError> {
        let what = format!("schedules of script {script_id}");
        let request = self
            .http
            .get(self.url("/schedule"))
            .query(&[("script_id", script_id)]);
        decode(self.send(request, &what).await?, &what).await
    }

    /// `PATCH /api/schedule/{id}`
    pub async fn update_schedule(
        &self,
        schedule_id: u64,
        update: &ScheduleUpdate,
    ) -> Result<(), ApiError> {
        let what = format!("schedule {schedule_id}");
        let request = self
            .http
            .patch(self.url(&format!("/schedule/{schedule_id}")))
            .json(update);
        self.send(request, &what).await.map(drop)
    }

    pub async fn set_schedule_enabled(&self, schedule_id: u64, enabled: bool) -> Result<(), ApiError> {
        self.update_schedule(schedule_id, &ScheduleUpdate::enabled(enabled))
            .await
    }

    /// Send a request and turn non-2xx answers into errors.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|source| ApiError::Transport {
            what: what.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(what, status = status.as_u16(), url = %response.url(), "backend response");

        if status.is_success() {
            return Ok(response);
        }

        let mut message = response.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }

        let what = what.to_string();
        Err(match ErrorCode::from_http_status(status.as_u16()) {
            ErrorCode::NotFound => ApiError::NotFound { what, message },
            ErrorCode::ServerError | ErrorCode::Unexpected => ApiError::Server {
                what,
                status: status.as_u16(),
                message,
            },
            code => ApiError::Rejected {
                what,
                code,
                message,
            },
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
    let body = response.bytes().await.map_err(|source| ApiError::Transport {
        what: what.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
        what: what.to_string(),
        detail: e.to_string(),
    })
}
