//! runlog - follow image builds and job runs on a script runner backend
//!
//! Polls the backend's incremental log endpoints, accumulates the lines of
//! one image build or job run at a time, and stops once the execution
//! reaches a terminal status.

pub mod config;
pub mod exit;
pub mod host;
pub mod mock;
pub mod tail;

pub use config::{ConfigError, EffectiveConfig};
pub use host::{ApiError, BackendClient, ClientConfig, HttpLogFetcher};
pub use tail::{
    spawn_session, Cursor, FetchBatch, FetchError, LogFetcher, OwnerRef, SessionHandle,
    SessionState, StopReason, TailManager, TailPolicy, TailSession,
};
