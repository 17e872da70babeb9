//! Incremental log tailing
//!
//! Polls a [`LogFetcher`] for one image or job at a time, accumulating the
//! lines it returns and stopping once the owner reaches a terminal status.
//!
//! - [`TailSession`]: per-owner state machine, no I/O
//! - [`spawn_session`]: runs a session on a tokio task
//! - [`TailManager`]: one active session per viewer

mod cursor;
mod driver;
mod fetcher;
mod manager;
mod oracle;
mod policy;
mod session;

pub use cursor::{Cursor, CursorRegression};
pub use driver::{spawn_session, spawn_session_with_ticks, IntervalTicks, SessionHandle, TickSource};
pub use fetcher::{FetchBatch, FetchError, LogFetcher, OwnerRef};
pub use manager::TailManager;
pub use oracle::{classify, classify_code, is_success, Classification, TerminalState};
pub use policy::{
    TailPolicy, TailPolicyError, DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_POLL_INTERVAL,
};
pub use session::{SessionState, Step, StopReason, TailSession};
