//! Test doubles for the tail engine
//!
//! - [`ScriptedFetcher`]: replays queued fetch results per owner, records
//!   every call, and can park fetches to simulate slow or in-flight requests
//! - [`ManualTicks`]: tick source advanced by hand instead of by the clock

mod fetcher;
mod ticks;

pub use fetcher::{FetchCall, ScriptedFetcher};
pub use ticks::{manual_ticks, ManualTicks, TickTrigger};
