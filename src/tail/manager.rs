//! Viewer-scoped session lifecycle.
//!
//! A manager holds at most one session. Opening a new owner closes the
//! current session first, so a viewer that switches between jobs never has
//! two streams feeding it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::driver::{spawn_session, SessionHandle};
use super::fetcher::{LogFetcher, OwnerRef};
use super::policy::TailPolicy;
use super::session::TailSession;

pub struct TailManager {
    fetcher: Arc<dyn LogFetcher>,
    policy: TailPolicy,
    current: Option<SessionHandle>,
}

impl TailManager {
    pub fn new(fetcher: Arc<dyn LogFetcher>, policy: TailPolicy) -> Self {
        Self {
            fetcher,
            policy,
            current: None,
        }
    }

    /// Start tailing `owner`, replacing any current session.
    ///
    /// Re-opening the owner already being tailed restarts it from the
    /// beginning of the log.
    pub async fn open(&mut self, owner: OwnerRef) -> watch::Receiver<TailSession> {
        if let Some(previous) = self.current.take() {
            info!(from = %previous.owner(), to = %owner, "switching tail session");
            previous.close().await;
        }

        let handle = spawn_session(self.fetcher.clone(), owner, self.policy);
        let rx = handle.subscribe();
        self.current = Some(handle);
        rx
    }

    /// Close the current session, if any.
    pub async fn close(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.close().await;
        }
    }

    pub fn active_owner(&self) -> Option<&OwnerRef> {
        self.current.as_ref().map(SessionHandle::owner)
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }
}

impl std::fmt::Debug for TailManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailManager")
            .field("policy", &self.policy)
            .field("current", &self.current)
            .finish()
    }
}
