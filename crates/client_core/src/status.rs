//! Single-line status channel rendered verbatim by the presentation layer.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

pub const PENDING_NOTICE: &str = "Waiting for confirmation…";
pub const GENERIC_TX_FAILURE: &str = "Transaction failed / rejected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Cleared,
    Pending,
    Confirmed(String),
    Failed(String),
    /// A read-model rebuild failed; the prior snapshot is still shown.
    Diagnostic(String),
    /// Session-level notice, e.g. no wallet connected.
    Advisory(String),
}

impl StatusUpdate {
    pub fn message(&self) -> &str {
        match self {
            StatusUpdate::Cleared => "",
            StatusUpdate::Pending => PENDING_NOTICE,
            StatusUpdate::Confirmed(message)
            | StatusUpdate::Failed(message)
            | StatusUpdate::Diagnostic(message)
            | StatusUpdate::Advisory(message) => message,
        }
    }
}

#[derive(Clone)]
pub struct StatusChannel {
    events: broadcast::Sender<StatusUpdate>,
    latest: Arc<RwLock<StatusUpdate>>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            events,
            latest: Arc::new(RwLock::new(StatusUpdate::Cleared)),
        }
    }

    pub fn publish(&self, update: StatusUpdate) {
        match self.latest.write() {
            Ok(mut latest) => *latest = update.clone(),
            Err(poisoned) => *poisoned.into_inner() = update.clone(),
        }
        let _ = self.events.send(update);
    }

    pub fn latest(&self) -> StatusUpdate {
        match self.latest.read() {
            Ok(latest) => latest.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.events.subscribe()
    }

    /// Updates published after this call; lagged receivers skip what they missed.
    pub fn stream(&self) -> impl Stream<Item = StatusUpdate> {
        BroadcastStream::new(self.events.subscribe()).filter_map(Result::ok)
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}
