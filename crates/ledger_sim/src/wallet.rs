use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use ledger_integration::{SubmitError, TxOptions, WalletSession};
use shared::{
    domain::Address,
    error::ErrorCode,
    protocol::{ContractCall, TransactionReceipt, TransactionRequest},
};
use tokio::sync::{broadcast, RwLock};

/// Wallet bound directly to a [`LocalLedger`](crate::LocalLedger), signing as the selected account.
pub struct LocalWallet {
    ledger: Arc<crate::LocalLedger>,
    account: RwLock<Option<Address>>,
    changes: broadcast::Sender<Option<Address>>,
    declines: AtomicBool,
}

impl LocalWallet {
    pub fn new(ledger: Arc<crate::LocalLedger>, account: Option<Address>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            ledger,
            account: RwLock::new(account),
            changes,
            declines: AtomicBool::new(false),
        }
    }

    pub async fn select_account(&self, account: Option<Address>) {
        *self.account.write().await = account.clone();
        let _ = self.changes.send(account);
    }

    /// While set, every signature request is declined as a user would.
    pub fn set_declines_signatures(&self, declines: bool) {
        self.declines.store(declines, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletSession for LocalWallet {
    async fn request_current_account(&self) -> anyhow::Result<Address> {
        self.account
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow::anyhow!("wallet is locked"))
    }

    fn subscribe_account_changes(&self) -> broadcast::Receiver<Option<Address>> {
        self.changes.subscribe()
    }

    async fn sign_and_submit(
        &self,
        call: ContractCall,
        options: TxOptions,
    ) -> Result<TransactionReceipt, SubmitError> {
        let from = self
            .account
            .read()
            .await
            .clone()
            .ok_or(SubmitError::NoAccount)?;
        if self.declines.load(Ordering::SeqCst) {
            return Err(SubmitError::Rejected(
                "user denied transaction signature".to_string(),
            ));
        }

        self.ledger
            .execute(TransactionRequest {
                from,
                call,
                value: options.value,
            })
            .await
            .map_err(|err| match err.code {
                ErrorCode::Internal => SubmitError::Transport(err.message),
                _ => SubmitError::Reverted(err.message),
            })
    }
}
