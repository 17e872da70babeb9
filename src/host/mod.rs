//! Backend-facing components
//!
//! - [`BackendClient`]: typed REST client for images, jobs, scripts and schedules
//! - [`HttpLogFetcher`]: [`LogFetcher`](crate::tail::LogFetcher) over that client

pub mod client;
pub mod fetcher;

pub use client::{ApiError, BackendClient, ClientConfig};
pub use fetcher::HttpLogFetcher;
