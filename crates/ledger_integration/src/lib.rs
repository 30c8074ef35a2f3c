use async_trait::async_trait;
use shared::{
    amount::Amount,
    domain::{Address, Campaign, CampaignId},
    protocol::{ContractCall, InvestmentLists, TransactionReceipt},
};
use thiserror::Error;
use tokio::sync::broadcast;

/// Read-only surface of the deployed crowdfunding contract.
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn fee_amount(&self) -> anyhow::Result<Amount>;
    async fn owner(&self) -> anyhow::Result<Address>;
    async fn super_owner(&self) -> anyhow::Result<Address>;
    async fn contract_balance(&self) -> anyhow::Result<Amount>;
    async fn remaining_fees(&self) -> anyhow::Result<Amount>;
    async fn active_campaign_ids(&self) -> anyhow::Result<Vec<CampaignId>>;
    async fn completed_campaign_ids(&self) -> anyhow::Result<Vec<CampaignId>>;
    async fn cancelled_campaign_ids(&self) -> anyhow::Result<Vec<CampaignId>>;
    async fn campaign(&self, campaign_id: CampaignId) -> anyhow::Result<Campaign>;
    async fn investments(&self, account: &Address) -> anyhow::Result<InvestmentLists>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub value: Option<Amount>,
}

impl TxOptions {
    pub fn with_value(value: Amount) -> Self {
        Self { value: Some(value) }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no authorized account in wallet session")]
    NoAccount,
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Reverted(String),
    #[error("{0}")]
    Transport(String),
    #[error("transaction failed without detail")]
    Opaque,
}

impl SubmitError {
    /// Human-readable failure detail, when the wallet or contract supplied one.
    pub fn detail(&self) -> Option<String> {
        match self {
            SubmitError::Opaque => None,
            SubmitError::Rejected(message)
            | SubmitError::Reverted(message)
            | SubmitError::Transport(message)
                if message.trim().is_empty() =>
            {
                None
            }
            other => Some(other.to_string()),
        }
    }
}

/// Browser-wallet style session: who is signing, and the signing itself.
#[async_trait]
pub trait WalletSession: Send + Sync {
    async fn request_current_account(&self) -> anyhow::Result<Address>;
    fn subscribe_account_changes(&self) -> broadcast::Receiver<Option<Address>>;
    async fn sign_and_submit(
        &self,
        call: ContractCall,
        options: TxOptions,
    ) -> Result<TransactionReceipt, SubmitError>;
}

/// Stand-in used when no wallet is installed or unlocked.
pub struct MissingWallet {
    changes: broadcast::Sender<Option<Address>>,
}

impl MissingWallet {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(1);
        Self { changes }
    }
}

impl Default for MissingWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSession for MissingWallet {
    async fn request_current_account(&self) -> anyhow::Result<Address> {
        Err(anyhow::anyhow!("no wallet session available"))
    }

    fn subscribe_account_changes(&self) -> broadcast::Receiver<Option<Address>> {
        self.changes.subscribe()
    }

    async fn sign_and_submit(
        &self,
        _call: ContractCall,
        _options: TxOptions,
    ) -> Result<TransactionReceipt, SubmitError> {
        Err(SubmitError::NoAccount)
    }
}
