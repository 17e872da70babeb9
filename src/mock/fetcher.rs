//! Scripted log fetcher.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use runlog_protocol::ExecutionStatus;

use crate::tail::{Cursor, FetchBatch, FetchError, LogFetcher, OwnerRef};

/// A fetch the driver issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub owner: OwnerRef,
    pub cursor: Cursor,
    /// When the fetch started (tokio clock)
    pub at: Instant,
}

struct Scripted {
    result: Result<FetchBatch, FetchError>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct ScriptState {
    /// Queued responses per owner, consumed front to back
    responses: HashMap<OwnerRef, VecDeque<Scripted>>,
    /// Every fetch in call order
    calls: Vec<FetchCall>,
}

/// Fetcher that replays queued responses per owner.
///
/// An owner with an empty queue gets a transient error. Responses can be
/// delayed, and `hold()` parks every fetch until `release()`.
pub struct ScriptedFetcher {
    state: Mutex<ScriptState>,
    /// `true` while fetches may complete
    gate: watch::Sender<bool>,
    /// Number of fetches started
    started: watch::Sender<usize>,
    /// Fetches currently between start and completion
    in_flight: Mutex<HashMap<OwnerRef, usize>>,
    max_in_flight: Mutex<usize>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState::default()),
            gate: watch::Sender::new(true),
            started: watch::Sender::new(0),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight: Mutex::new(0),
        }
    }

    // === Scripting ===

    pub fn push(&self, owner: &OwnerRef, result: Result<FetchBatch, FetchError>) {
        self.push_scripted(owner, Scripted { result, delay: None });
    }

    /// Queue a response that takes `delay` to arrive.
    pub fn push_delayed(
        &self,
        owner: &OwnerRef,
        delay: Duration,
        result: Result<FetchBatch, FetchError>,
    ) {
        self.push_scripted(
            owner,
            Scripted {
                result,
                delay: Some(delay),
            },
        );
    }

    pub fn push_batch(
        &self,
        owner: &OwnerRef,
        lines: &[&str],
        next_cursor: u64,
        status: Option<ExecutionStatus>,
    ) {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.push(
            owner,
            Ok(FetchBatch::new(lines, Cursor::new(next_cursor), status)),
        );
    }

    pub fn push_error(&self, owner: &OwnerRef, error: FetchError) {
        self.push(owner, Err(error));
    }

    fn push_scripted(&self, owner: &OwnerRef, scripted: Scripted) {
        let mut state = self.state.lock().unwrap();
        state
            .responses
            .entry(owner.clone())
            .or_default()
            .push_back(scripted);
    }

    /// Responses still queued for `owner`.
    pub fn remaining(&self, owner: &OwnerRef) -> usize {
        let state = self.state.lock().unwrap();
        state.responses.get(owner).map_or(0, VecDeque::len)
    }

    // === Gating ===

    /// Park every fetch until `release()`.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    // === Assertions ===

    pub fn calls(&self) -> Vec<FetchCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, owner: &OwnerRef) -> Vec<FetchCall> {
        self.calls()
            .into_iter()
            .filter(|c| &c.owner == owner)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Highest number of concurrent fetches seen for a single owner.
    pub fn max_in_flight(&self) -> usize {
        *self.max_in_flight.lock().unwrap()
    }

    /// Wait until at least `count` fetches have started.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut started = self.started.subscribe();
        let _ = started.wait_for(|n| *n >= count).await;
    }

    fn enter(&self, owner: &OwnerRef) {
        let mut in_flight = self.in_flight.lock().unwrap();
        let n = in_flight.entry(owner.clone()).or_default();
        *n += 1;
        let mut max = self.max_in_flight.lock().unwrap();
        *max = (*max).max(*n);
    }

    fn leave(&self, owner: &OwnerRef) {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(n) = in_flight.get_mut(owner) {
            *n = n.saturating_sub(1);
        }
    }
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight count even when the fetch future is dropped.
struct InFlight<'a> {
    fetcher: &'a ScriptedFetcher,
    owner: &'a OwnerRef,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.fetcher.leave(self.owner);
    }
}

#[async_trait]
impl LogFetcher for ScriptedFetcher {
    async fn fetch(&self, owner: &OwnerRef, cursor: Cursor) -> Result<FetchBatch, FetchError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(FetchCall {
                owner: owner.clone(),
                cursor,
                at: Instant::now(),
            });
        }
        self.enter(owner);
        let _guard = InFlight {
            fetcher: self,
            owner,
        };
        self.started.send_modify(|n| *n += 1);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let scripted = {
            let mut state = self.state.lock().unwrap();
            state
                .responses
                .get_mut(owner)
                .and_then(VecDeque::pop_front)
        };

        match scripted {
            Some(Scripted { result, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(FetchError::Transient(format!(
                "no scripted response for {owner}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlog_protocol::JobStatus;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let fetcher = ScriptedFetcher::new();
        let owner = OwnerRef::job("1");
        fetcher.push_batch(&owner, &["a"], 1, Some(JobStatus::Running.into()));
        fetcher.push_error(&owner, FetchError::NotFound("job 1".into()));

        let first = fetcher.fetch(&owner, Cursor::START).await.unwrap();
        assert_eq!(first.lines, vec!["a".to_string()]);
        assert!(matches!(
            fetcher.fetch(&owner, Cursor::new(1)).await,
            Err(FetchError::NotFound(_))
        ));
        assert!(matches!(
            fetcher.fetch(&owner, Cursor::new(1)).await,
            Err(FetchError::Transient(_))
        ));

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].cursor, Cursor::new(1));
        assert_eq!(fetcher.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_queues_are_per_owner() {
        let fetcher = ScriptedFetcher::new();
        let a = OwnerRef::job("a");
        let b = OwnerRef::image("b");
        fetcher.push_batch(&a, &["from a"], 6, None);

        assert!(fetcher.fetch(&b, Cursor::START).await.is_err());
        assert_eq!(fetcher.remaining(&a), 1);
        assert_eq!(fetcher.calls_for(&b).len(), 1);
    }
}
