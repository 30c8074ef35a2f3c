use std::sync::{Arc, Mutex};

use ledger_integration::{ContractReader, TxOptions, WalletSession};
use shared::{
    amount::{pledge_total, Amount},
    domain::{Address, CampaignId},
    protocol::ContractCall,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, warn};

pub mod orchestrator;
pub mod read_model;
pub mod refresh;
pub mod roles;
pub mod session;
pub mod status;
pub mod transport;

pub use orchestrator::{TransactionOrchestrator, TxOutcome};
pub use read_model::{ReadModelError, Snapshot, SnapshotBuilder, SnapshotSlot};
pub use refresh::SnapshotRefresher;
pub use session::{SessionState, SessionTracker};
pub use status::{StatusChannel, StatusUpdate};

pub const CAMPAIGN_NOT_FOUND: &str = "Campaign not found";

/// Composes the read model, session tracking and transaction orchestration
/// behind the intents a dashboard dispatches.
pub struct CrowdfundClient {
    reader: Arc<dyn ContractReader>,
    status: StatusChannel,
    slot: Arc<SnapshotSlot>,
    refresher: Arc<SnapshotRefresher>,
    session: Arc<SessionTracker>,
    orchestrator: TransactionOrchestrator,
    account_watcher: Mutex<Option<JoinHandle<()>>>,
}

impl CrowdfundClient {
    pub fn new(reader: Arc<dyn ContractReader>, wallet: Arc<dyn WalletSession>) -> Arc<Self> {
        let status = StatusChannel::new();
        let slot = Arc::new(SnapshotSlot::default());
        let session_state = Arc::new(SessionState::default());
        let refresher = Arc::new(SnapshotRefresher::new(
            SnapshotBuilder::new(reader.clone()),
            slot.clone(),
            session_state.clone(),
            status.clone(),
        ));
        let session = Arc::new(SessionTracker::new(
            wallet.clone(),
            session_state,
            refresher.clone(),
            status.clone(),
        ));
        let orchestrator = TransactionOrchestrator::new(wallet, refresher.clone(), status.clone());

        Arc::new(Self {
            reader,
            status,
            slot,
            refresher,
            session,
            orchestrator,
            account_watcher: Mutex::new(None),
        })
    }

    /// Starts following account changes, connects the wallet and builds the first snapshot.
    pub async fn start(&self) -> Option<Address> {
        let watcher = self.session.watch_account_changes();
        if let Some(previous) = self.replace_watcher(Some(watcher)) {
            previous.abort();
        }
        self.session.connect().await
    }

    fn replace_watcher(&self, watcher: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        match self.account_watcher.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, watcher),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), watcher),
        }
    }

    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.slot.current().await
    }

    pub async fn refresh(&self) -> Result<Arc<Snapshot>, ReadModelError> {
        self.refresher.refresh().await
    }

    pub async fn current_account(&self) -> Option<Address> {
        self.session.current_account().await
    }

    pub fn status(&self) -> &StatusChannel {
        &self.status
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusUpdate> {
        self.status.subscribe()
    }

    /// Attaches the current campaign fee, read fresh from the contract.
    pub async fn create_campaign(
        &self,
        title: &str,
        pledge_cost: Amount,
        pledges_needed: u64,
    ) -> TxOutcome {
        let fee = match self.reader.fee_amount().await {
            Ok(fee) => fee,
            Err(error) => {
                warn!(%error, "could not read campaign fee");
                return self.orchestrator.reject(read_model::READ_FAILURE_DIAGNOSTIC);
            }
        };
        self.orchestrator
            .submit(
                ContractCall::CreateCampaign {
                    title: title.to_string(),
                    pledge_cost,
                    pledges_needed,
                },
                TxOptions::with_value(fee),
                "Campaign created",
            )
            .await
    }

    /// Prices the pledge from a fresh read of the campaign's unit cost.
    pub async fn fund_campaign(&self, campaign_id: CampaignId, quantity: u64) -> TxOutcome {
        let campaign = match self.reader.campaign(campaign_id).await {
            Ok(campaign) => campaign,
            Err(error) => {
                debug!(%campaign_id, %error, "campaign lookup failed before funding");
                return self.orchestrator.reject(CAMPAIGN_NOT_FOUND);
            }
        };
        let total = pledge_total(&campaign.pledge_cost, quantity);
        self.orchestrator
            .submit(
                ContractCall::FundCampaign {
                    campaign_id,
                    quantity,
                },
                TxOptions::with_value(total),
                "Funded successfully",
            )
            .await
    }

    pub async fn complete_campaign(&self, campaign_id: CampaignId) -> TxOutcome {
        self.orchestrator
            .submit(
                ContractCall::CompleteCampaign { campaign_id },
                TxOptions::default(),
                "Campaign completed",
            )
            .await
    }

    pub async fn cancel_campaign(&self, campaign_id: CampaignId) -> TxOutcome {
        self.orchestrator
            .submit(
                ContractCall::CancelCampaign { campaign_id },
                TxOptions::default(),
                "Campaign cancelled",
            )
            .await
    }

    pub async fn claim_refunds(&self) -> TxOutcome {
        self.orchestrator
            .submit(
                ContractCall::ClaimRefunds,
                TxOptions::default(),
                "Refund claimed",
            )
            .await
    }

    pub async fn withdraw_owner_funds(&self) -> TxOutcome {
        self.orchestrator
            .submit(
                ContractCall::WithdrawOwnerFunds,
                TxOptions::default(),
                "Fees withdrawn",
            )
            .await
    }

    pub async fn destroy_contract(&self) -> TxOutcome {
        self.orchestrator
            .submit(
                ContractCall::DestroyContract,
                TxOptions::default(),
                "Contract destroyed",
            )
            .await
    }

    pub async fn ban_entrepreneur(&self, entrepreneur: Address) -> TxOutcome {
        self.orchestrator
            .submit(
                ContractCall::BanEntrepreneur { entrepreneur },
                TxOptions::default(),
                "Entrepreneur banned",
            )
            .await
    }

    pub async fn change_owner(&self, new_owner: Address) -> TxOutcome {
        self.orchestrator
            .submit(
                ContractCall::ChangeOwner { new_owner },
                TxOptions::default(),
                "Owner changed",
            )
            .await
    }
}

impl Drop for CrowdfundClient {
    fn drop(&mut self) {
        if let Some(watcher) = self.replace_watcher(None) {
            watcher.abort();
        }
    }
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
