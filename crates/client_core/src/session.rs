use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use ledger_integration::WalletSession;
use shared::domain::Address;
use tokio::{
    sync::{broadcast::error::RecvError, RwLock},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    refresh::SnapshotRefresher,
    status::{StatusChannel, StatusUpdate},
};

pub const CONNECT_ADVISORY: &str = "Could not connect – check your wallet";

/// Currently authorized account; `None` is a valid, connected-to-nothing state.
#[derive(Default)]
pub struct SessionState {
    account: RwLock<Option<Address>>,
}

impl SessionState {
    pub async fn current_account(&self) -> Option<Address> {
        self.account.read().await.clone()
    }

    pub async fn set_account(&self, account: Option<Address>) {
        *self.account.write().await = account;
    }
}

pub struct SessionTracker {
    wallet: Arc<dyn WalletSession>,
    state: Arc<SessionState>,
    refresher: Arc<SnapshotRefresher>,
    status: StatusChannel,
    advised: AtomicBool,
}

impl SessionTracker {
    pub fn new(
        wallet: Arc<dyn WalletSession>,
        state: Arc<SessionState>,
        refresher: Arc<SnapshotRefresher>,
        status: StatusChannel,
    ) -> Self {
        Self {
            wallet,
            state,
            refresher,
            status,
            advised: AtomicBool::new(false),
        }
    }

    pub async fn current_account(&self) -> Option<Address> {
        self.state.current_account().await
    }

    /// Asks the wallet for an account, then builds the first snapshot.
    pub async fn connect(&self) -> Option<Address> {
        let account = match self.wallet.request_current_account().await {
            Ok(account) => {
                info!(%account, "wallet session connected");
                Some(account)
            }
            Err(error) => {
                warn!(%error, "wallet session unavailable");
                None
            }
        };
        self.state.set_account(account.clone()).await;
        let _ = self.refresher.refresh().await;
        if account.is_none() {
            self.advise_once(CONNECT_ADVISORY);
        }
        account
    }

    pub async fn apply_account_change(&self, account: Option<Address>) {
        match &account {
            Some(account) => info!(%account, "wallet account changed"),
            None => info!("wallet account disconnected"),
        }
        self.state.set_account(account).await;
        let _ = self.refresher.refresh().await;
    }

    /// Follows wallet account changes until the wallet drops its sender.
    ///
    /// Each change triggers a rebuild; a rebuild already in flight from
    /// elsewhere is not cancelled, so the later assignment to the slot wins.
    pub fn watch_account_changes(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.wallet.subscribe_account_changes();
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(account) => tracker.apply_account_change(account).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "account change notifications lagged; re-reading wallet");
                        let account = tracker.wallet.request_current_account().await.ok();
                        tracker.apply_account_change(account).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn advise_once(&self, message: &str) {
        if !self.advised.swap(true, Ordering::SeqCst) {
            self.status.publish(StatusUpdate::Advisory(message.to_string()));
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
