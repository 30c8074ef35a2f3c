//! HTTP transport to a ledger gateway speaking the JSON wire protocol.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ledger_integration::{ContractReader, SubmitError, TxOptions, WalletSession};
use reqwest::{Client, StatusCode};
use shared::{
    amount::Amount,
    domain::{Address, Campaign, CampaignId},
    error::{ErrorCode, RpcError},
    protocol::{
        ContractCall, ContractQuery, InvestmentLists, QueryResult, TransactionReceipt,
        TransactionRequest,
    },
};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use url::Url;

pub struct HttpLedgerClient {
    http: Client,
    base_url: Url,
}

impl HttpLedgerClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid ledger url '{base_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint '{path}'"))
    }

    pub async fn query(&self, query: ContractQuery) -> Result<QueryResult> {
        let method = query.method_name();
        let res = self
            .http
            .post(self.endpoint("query")?)
            .json(&query)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?;
        let status = res.status();
        let body = res.bytes().await?;
        if !status.is_success() {
            let detail = serde_json::from_slice::<RpcError>(&body)
                .map(|err| err.message)
                .unwrap_or_else(|_| status.to_string());
            bail!("{method} rejected: {detail}");
        }
        debug!(method, "query answered");
        serde_json::from_slice(&body).with_context(|| format!("malformed {method} response"))
    }

    pub async fn submit(
        &self,
        request: &TransactionRequest,
    ) -> std::result::Result<TransactionReceipt, SubmitError> {
        let url = self
            .endpoint("transactions")
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let res = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;

        if status.is_success() {
            return serde_json::from_slice(&body)
                .map_err(|err| SubmitError::Transport(format!("malformed receipt: {err}")));
        }
        Err(submit_error_from(status, &body))
    }

    async fn read<T>(
        &self,
        query: ContractQuery,
        extract: impl FnOnce(QueryResult) -> Option<T>,
    ) -> Result<T> {
        let method = query.method_name();
        let result = self.query(query).await?;
        extract(result).ok_or_else(|| anyhow!("unexpected result type for {method}"))
    }
}

fn submit_error_from(status: StatusCode, body: &[u8]) -> SubmitError {
    match serde_json::from_slice::<RpcError>(body) {
        Ok(err) if err.code == ErrorCode::Internal => SubmitError::Transport(err.message),
        Ok(err) => SubmitError::Reverted(err.message),
        Err(_) if status.is_server_error() => SubmitError::Transport(status.to_string()),
        Err(_) => SubmitError::Opaque,
    }
}

#[async_trait]
impl ContractReader for HttpLedgerClient {
    async fn fee_amount(&self) -> Result<Amount> {
        self.read(ContractQuery::FeeAmount, QueryResult::into_amount).await
    }

    async fn owner(&self) -> Result<Address> {
        self.read(ContractQuery::Owner, QueryResult::into_address).await
    }

    async fn super_owner(&self) -> Result<Address> {
        self.read(ContractQuery::SuperOwner, QueryResult::into_address).await
    }

    async fn contract_balance(&self) -> Result<Amount> {
        self.read(ContractQuery::ContractBalance, QueryResult::into_amount).await
    }

    async fn remaining_fees(&self) -> Result<Amount> {
        self.read(ContractQuery::RemainingFees, QueryResult::into_amount).await
    }

    async fn active_campaign_ids(&self) -> Result<Vec<CampaignId>> {
        self.read(ContractQuery::ActiveCampaignIds, QueryResult::into_campaign_ids).await
    }

    async fn completed_campaign_ids(&self) -> Result<Vec<CampaignId>> {
        self.read(ContractQuery::CompletedCampaignIds, QueryResult::into_campaign_ids).await
    }

    async fn cancelled_campaign_ids(&self) -> Result<Vec<CampaignId>> {
        self.read(ContractQuery::CancelledCampaignIds, QueryResult::into_campaign_ids).await
    }

    async fn campaign(&self, campaign_id: CampaignId) -> Result<Campaign> {
        self.read(ContractQuery::Campaign { campaign_id }, QueryResult::into_campaign).await
    }

    async fn investments(&self, account: &Address) -> Result<InvestmentLists> {
        self.read(
            ContractQuery::Investments {
                account: account.clone(),
            },
            QueryResult::into_investments,
        )
        .await
    }
}

/// Development wallet holding an unlocked gateway account.
pub struct RemoteWallet {
    ledger: Arc<HttpLedgerClient>,
    account: RwLock<Option<Address>>,
    changes: broadcast::Sender<Option<Address>>,
}

impl RemoteWallet {
    pub fn new(ledger: Arc<HttpLedgerClient>, account: Option<Address>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            ledger,
            account: RwLock::new(account),
            changes,
        }
    }

    pub async fn select_account(&self, account: Option<Address>) {
        *self.account.write().await = account.clone();
        let _ = self.changes.send(account);
    }
}

#[async_trait]
impl WalletSession for RemoteWallet {
    async fn request_current_account(&self) -> Result<Address> {
        self.account
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("no account configured for the wallet"))
    }

    fn subscribe_account_changes(&self) -> broadcast::Receiver<Option<Address>> {
        self.changes.subscribe()
    }

    async fn sign_and_submit(
        &self,
        call: ContractCall,
        options: TxOptions,
    ) -> std::result::Result<TransactionReceipt, SubmitError> {
        let from = self
            .account
            .read()
            .await
            .clone()
            .ok_or(SubmitError::NoAccount)?;
        self.ledger
            .submit(&TransactionRequest {
                from,
                call,
                value: options.value,
            })
            .await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
