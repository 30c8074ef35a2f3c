//! Drives one state-mutating call through pending -> confirmed | failed.

use std::sync::Arc;

use ledger_integration::{TxOptions, WalletSession};
use shared::protocol::{ContractCall, TransactionReceipt};
use tracing::{info, warn};

use crate::{
    refresh::SnapshotRefresher,
    status::{StatusChannel, StatusUpdate, GENERIC_TX_FAILURE},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed {
        receipt: TransactionReceipt,
        /// Whether the follow-up rebuild succeeded; does not affect confirmation.
        refreshed: bool,
    },
    Failed {
        message: String,
    },
}

impl TxOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TxOutcome::Confirmed { .. })
    }
}

pub struct TransactionOrchestrator {
    wallet: Arc<dyn WalletSession>,
    refresher: Arc<SnapshotRefresher>,
    status: StatusChannel,
}

impl TransactionOrchestrator {
    pub fn new(
        wallet: Arc<dyn WalletSession>,
        refresher: Arc<SnapshotRefresher>,
        status: StatusChannel,
    ) -> Self {
        Self {
            wallet,
            refresher,
            status,
        }
    }

    /// No retries and no queueing: concurrent submissions run independently.
    pub async fn submit(
        &self,
        call: ContractCall,
        options: TxOptions,
        success_message: &str,
    ) -> TxOutcome {
        let method = call.method_name();
        self.status.publish(StatusUpdate::Pending);

        match self.wallet.sign_and_submit(call, options).await {
            Ok(receipt) => {
                info!(method, tx_id = %receipt.tx_id, "transaction confirmed");
                let refreshed = self.refresher.refresh().await.is_ok();
                self.status.publish(StatusUpdate::Confirmed(success_message.to_string()));
                TxOutcome::Confirmed { receipt, refreshed }
            }
            Err(err) => {
                warn!(method, error = %err, "transaction failed");
                let message = err
                    .detail()
                    .unwrap_or_else(|| GENERIC_TX_FAILURE.to_string());
                self.status.publish(StatusUpdate::Failed(message.clone()));
                TxOutcome::Failed { message }
            }
        }
    }

    /// Reports an intent that failed before anything reached the wallet.
    pub fn reject(&self, message: &str) -> TxOutcome {
        self.status.publish(StatusUpdate::Failed(message.to_string()));
        TxOutcome::Failed {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
