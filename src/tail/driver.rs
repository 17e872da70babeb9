//! Session driver
//!
//! Runs one [`TailSession`] on its own tokio task:
//!
//! ```text
//! loop {
//!     fetch(owner, cursor)   -- raced against shutdown
//!     apply(result)          -- skipped once shutdown was requested
//!     stop?                  -- terminal / stalled / not found / unavailable
//!     tick                   -- raced against shutdown
//! }
//! ```
//!
//! The next tick is awaited only after the previous fetch completed, so at
//! most one fetch per session is ever in flight.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use super::fetcher::{LogFetcher, OwnerRef};
use super::policy::TailPolicy;
use super::session::{StopReason, Step, TailSession};

/// Source of "fetch again" signals.
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next tick.
    async fn tick(&mut self);
}

/// Fixed cadence backed by `tokio::time::interval`.
///
/// A fetch that overruns the period is followed by one immediate tick, and
/// the cadence restarts from there: missed ticks are never delivered in a
/// burst, and consecutive fetches are otherwise a full period apart.
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    /// First tick fires one `period` from now.
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Spawn a session driven by the policy's poll interval.
pub fn spawn_session(
    fetcher: Arc<dyn LogFetcher>,
    owner: OwnerRef,
    policy: TailPolicy,
) -> SessionHandle {
    let ticks = IntervalTicks::new(policy.poll_interval);
    spawn_session_with_ticks(fetcher, owner, policy, ticks)
}

/// Spawn a session driven by an arbitrary tick source.
pub fn spawn_session_with_ticks<T>(
    fetcher: Arc<dyn LogFetcher>,
    owner: OwnerRef,
    policy: TailPolicy,
    ticks: T,
) -> SessionHandle
where
    T: TickSource + 'static,
{
    let (session_tx, session_rx) = watch::channel(TailSession::new(owner.clone(), &policy));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!(owner = %owner, poll_interval_ms = policy.poll_interval.as_millis() as u64, "tail session started");

    let task = tokio::spawn(drive(fetcher, session_tx, shutdown_rx, ticks));

    SessionHandle {
        owner,
        session: session_rx,
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

async fn drive<T: TickSource>(
    fetcher: Arc<dyn LogFetcher>,
    session: watch::Sender<TailSession>,
    mut shutdown: watch::Receiver<bool>,
    mut ticks: T,
) {
    let owner = session.borrow().owner().clone();

    loop {
        let cursor = session.borrow().cursor();

        let result = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            result = fetcher.fetch(&owner, cursor) => result,
        };

        let mut step = None;
        session.send_if_modified(|s| {
            if is_closed(&shutdown) {
                return false;
            }
            step = Some(s.apply(result));
            true
        });

        match step {
            Some(Step::Continue) => {}
            Some(Step::Stop(_)) => return,
            None => break,
        }

        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            _ = ticks.tick() => {}
        }
    }

    debug!(owner = %owner, "tail session closed");
}

/// Resolves once close was requested or the handle went away.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

fn is_closed(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

/// Owning handle to a running session.
///
/// Dropping the handle closes the session.
pub struct SessionHandle {
    owner: OwnerRef,
    session: watch::Receiver<TailSession>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    /// A receiver that observes every applied fetch result.
    pub fn subscribe(&self) -> watch::Receiver<TailSession> {
        self.session.clone()
    }

    /// Borrow the current session snapshot.
    pub fn borrow(&self) -> watch::Ref<'_, TailSession> {
        self.session.borrow()
    }

    /// Wait until the session stops on its own.
    ///
    /// Returns `None` if it was closed first.
    pub async fn stopped(&self) -> Option<StopReason> {
        let mut rx = self.session.clone();
        let session = rx.wait_for(|s| s.is_stopped()).await.ok()?;
        session.stop_reason()
    }

    /// Close the session and wait for its task to exit.
    ///
    /// Once this returns, the session is never mutated again.
    pub async fn close(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(owner = %self.owner, "tail session handle closed");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("owner", &self.owner)
            .field("state", &self.session.borrow().state())
            .finish()
    }
}
