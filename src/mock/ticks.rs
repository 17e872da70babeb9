//! Hand-driven tick source.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::tail::TickSource;

/// Tick source that only advances when its trigger fires.
pub struct ManualTicks {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Fires ticks for a [`ManualTicks`].
#[derive(Clone)]
pub struct TickTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl TickTrigger {
    pub fn fire(&self) {
        let _ = self.tx.send(());
    }
}

pub fn manual_ticks() -> (TickTrigger, ManualTicks) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TickTrigger { tx }, ManualTicks { rx })
}

#[async_trait]
impl TickSource for ManualTicks {
    async fn tick(&mut self) {
        // With every trigger gone the source never ticks again.
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
