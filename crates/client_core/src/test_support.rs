//! Scriptable collaborators shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ledger_integration::{ContractReader, SubmitError, TxOptions, WalletSession};
use shared::{
    amount::Amount,
    domain::{Address, Campaign, CampaignId, CampaignStatus},
    protocol::{ContractCall, InvestmentLists, TransactionReceipt},
};
use tokio::sync::{broadcast, Mutex};

pub const OWNER: &str = "0x00000000000000000000000000000000000000aa";
pub const SUPER_OWNER: &str = "0x00000000000000000000000000000000000000bb";
pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";

pub fn addr(raw: &str) -> Address {
    Address::parse(raw).expect("address")
}

pub fn campaign(id: u64, status: CampaignStatus) -> Campaign {
    Campaign {
        id: CampaignId(id),
        entrepreneur: addr(ALICE),
        title: format!("campaign {id}"),
        pledge_cost: Amount::from(1_000u64),
        pledges_needed: 10,
        pledges_count: 0,
        total_raised: Amount::zero(),
        status,
    }
}

pub struct FakeState {
    pub fee: Amount,
    pub owner: Address,
    pub super_owner: Address,
    pub balance: Amount,
    pub remaining_fees: Amount,
    pub active: Vec<CampaignId>,
    pub completed: Vec<CampaignId>,
    pub cancelled: Vec<CampaignId>,
    pub campaigns: HashMap<CampaignId, Campaign>,
    pub investments: HashMap<String, InvestmentLists>,
    pub failing_queries: HashSet<&'static str>,
    pub failing_details: HashSet<CampaignId>,
    pub owner_delay: Option<Duration>,
    /// Latency applied to every read, outside the state lock.
    pub read_delay: Option<Duration>,
    pub calls: Vec<&'static str>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            fee: Amount::from(20u64),
            owner: addr(OWNER),
            super_owner: addr(SUPER_OWNER),
            balance: Amount::from(500u64),
            remaining_fees: Amount::from(40u64),
            active: Vec::new(),
            completed: Vec::new(),
            cancelled: Vec::new(),
            campaigns: HashMap::new(),
            investments: HashMap::new(),
            failing_queries: HashSet::new(),
            failing_details: HashSet::new(),
            owner_delay: None,
            read_delay: None,
            calls: Vec::new(),
        }
    }
}

impl FakeState {
    pub fn with_campaign(mut self, campaign: Campaign) -> Self {
        match campaign.status {
            CampaignStatus::Active => self.active.push(campaign.id),
            CampaignStatus::Completed => self.completed.push(campaign.id),
            CampaignStatus::Cancelled => self.cancelled.push(campaign.id),
        }
        self.campaigns.insert(campaign.id, campaign);
        self
    }

    pub fn with_investments(mut self, account: &str, ids: &[u64], shares: &[u64]) -> Self {
        self.investments.insert(
            account.to_ascii_lowercase(),
            InvestmentLists {
                ids: ids.iter().copied().map(CampaignId).collect(),
                shares: shares.to_vec(),
            },
        );
        self
    }
}

/// Counts reads of one kind that are outstanding at the same time.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeReader {
    pub state: Mutex<FakeState>,
    /// Scalar and id-list reads.
    pub scalar_reads: InFlight,
    /// Per-campaign detail reads.
    pub detail_reads: InFlight,
}

impl FakeReader {
    pub fn new(state: FakeState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            ..Self::default()
        })
    }

    pub async fn fail_query(&self, query: &'static str) {
        self.state.lock().await.failing_queries.insert(query);
    }

    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.lock().await.calls.clone()
    }

    async fn pause(&self) {
        let delay = self.state.lock().await.read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn scalar<T>(
        &self,
        query: &'static str,
        pick: impl FnOnce(&FakeState) -> T,
    ) -> Result<T> {
        let _in_flight = self.scalar_reads.enter();
        self.pause().await;
        self.lookup(query, pick).await
    }

    async fn lookup<T>(
        &self,
        query: &'static str,
        pick: impl FnOnce(&FakeState) -> T,
    ) -> Result<T> {
        let mut state = self.state.lock().await;
        state.calls.push(query);
        if state.failing_queries.contains(query) {
            return Err(anyhow!("{query} reverted"));
        }
        Ok(pick(&state))
    }
}

#[async_trait]
impl ContractReader for FakeReader {
    async fn fee_amount(&self) -> Result<Amount> {
        self.scalar("fee_amount", |s| s.fee.clone()).await
    }

    async fn owner(&self) -> Result<Address> {
        let delay = self.state.lock().await.owner_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.scalar("owner", |s| s.owner.clone()).await
    }

    async fn super_owner(&self) -> Result<Address> {
        self.scalar("super_owner", |s| s.super_owner.clone()).await
    }

    async fn contract_balance(&self) -> Result<Amount> {
        self.scalar("contract_balance", |s| s.balance.clone()).await
    }

    async fn remaining_fees(&self) -> Result<Amount> {
        self.scalar("remaining_fees", |s| s.remaining_fees.clone())
            .await
    }

    async fn active_campaign_ids(&self) -> Result<Vec<CampaignId>> {
        self.scalar("active_campaign_ids", |s| s.active.clone()).await
    }

    async fn completed_campaign_ids(&self) -> Result<Vec<CampaignId>> {
        self.scalar("completed_campaign_ids", |s| s.completed.clone())
            .await
    }

    async fn cancelled_campaign_ids(&self) -> Result<Vec<CampaignId>> {
        self.scalar("cancelled_campaign_ids", |s| s.cancelled.clone())
            .await
    }

    async fn campaign(&self, campaign_id: CampaignId) -> Result<Campaign> {
        let _in_flight = self.detail_reads.enter();
        self.pause().await;
        let mut state = self.state.lock().await;
        state.calls.push("campaign");
        if state.failing_details.contains(&campaign_id) {
            return Err(anyhow!("campaign {campaign_id} reverted"));
        }
        state
            .campaigns
            .get(&campaign_id)
            .cloned()
            .ok_or_else(|| anyhow!("campaign {campaign_id} does not exist"))
    }

    async fn investments(&self, account: &Address) -> Result<InvestmentLists> {
        let key = account.as_str().to_ascii_lowercase();
        self.pause().await;
        self.lookup("investments", |s| {
            s.investments.get(&key).cloned().unwrap_or_default()
        })
        .await
    }
}

/// Wallet whose signing outcome is scripted per test.
pub struct FakeWallet {
    pub account: Mutex<Option<Address>>,
    pub submitted: Mutex<Vec<(ContractCall, TxOptions)>>,
    pub failure: Mutex<Option<SubmitError>>,
    pub changes: broadcast::Sender<Option<Address>>,
}

impl FakeWallet {
    pub fn new(account: Option<Address>) -> Arc<Self> {
        let (changes, _) = broadcast::channel(16);
        Arc::new(Self {
            account: Mutex::new(account),
            submitted: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            changes,
        })
    }

    pub async fn fail_next(&self, err: SubmitError) {
        *self.failure.lock().await = Some(err);
    }

    pub async fn switch_account(&self, account: Option<Address>) {
        *self.account.lock().await = account.clone();
        let _ = self.changes.send(account);
    }
}

#[async_trait]
impl WalletSession for FakeWallet {
    async fn request_current_account(&self) -> Result<Address> {
        self.account
            .lock()
            .await
            .clone()
            .ok_or_else(|| anyhow!("user rejected the connection request"))
    }

    fn subscribe_account_changes(&self) -> broadcast::Receiver<Option<Address>> {
        self.changes.subscribe()
    }

    async fn sign_and_submit(
        &self,
        call: ContractCall,
        options: TxOptions,
    ) -> std::result::Result<TransactionReceipt, SubmitError> {
        if let Some(err) = self.failure.lock().await.take() {
            return Err(err);
        }
        let from = self
            .account
            .lock()
            .await
            .clone()
            .ok_or(SubmitError::NoAccount)?;
        let receipt = receipt_for(&from, &call, &options);
        self.submitted.lock().await.push((call, options));
        Ok(receipt)
    }
}

fn receipt_for(from: &Address, call: &ContractCall, options: &TxOptions) -> TransactionReceipt {
    serde_json::from_value(serde_json::json!({
        "tx_id": "00000000-0000-4000-8000-000000000001",
        "from": from.as_str(),
        "method": call.method_name(),
        "value": options.value.clone().unwrap_or_default(),
        "applied_at": "2024-01-01T00:00:00Z",
    }))
    .expect("receipt")
}
