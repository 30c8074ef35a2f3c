use std::sync::Arc;

use crate::{
    read_model::{ReadModelError, Snapshot, SnapshotBuilder, SnapshotSlot},
    session::SessionState,
    status::{StatusChannel, StatusUpdate},
};

/// Rebuilds for the current session identity and publishes the result.
///
/// A successful rebuild replaces the slot and clears the status line. A failed
/// one leaves the slot untouched and posts the read-failure diagnostic.
pub struct SnapshotRefresher {
    builder: SnapshotBuilder,
    slot: Arc<SnapshotSlot>,
    session: Arc<SessionState>,
    status: StatusChannel,
}

impl SnapshotRefresher {
    pub fn new(
        builder: SnapshotBuilder,
        slot: Arc<SnapshotSlot>,
        session: Arc<SessionState>,
        status: StatusChannel,
    ) -> Self {
        Self {
            builder,
            slot,
            session,
            status,
        }
    }

    pub async fn refresh(&self) -> Result<Arc<Snapshot>, ReadModelError> {
        let account = self.session.current_account().await;
        match self.builder.rebuild(account.as_ref()).await {
            Ok(snapshot) => {
                let snapshot = self.slot.replace(snapshot).await;
                self.status.publish(StatusUpdate::Cleared);
                Ok(snapshot)
            }
            Err(err) => {
                self.status.publish(StatusUpdate::Diagnostic(err.to_string()));
                Err(err)
            }
        }
    }
}
