//! In-memory development ledger standing in for the deployed crowdfunding contract.
//!
//! Bookkeeping here is only as strict as a local devnet needs; the real
//! contract's rules are authoritative and this crate makes no claim to match them.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use ledger_integration::ContractReader;
use shared::{
    amount::{pledge_total, Amount},
    domain::{Address, Campaign, CampaignId, CampaignStatus},
    error::{ErrorCode, RpcException},
    protocol::{
        ContractCall, ContractQuery, InvestmentLists, QueryResult, TransactionReceipt,
        TransactionRequest,
    },
};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub mod gateway;
mod wallet;

pub use wallet::LocalWallet;

/// Initial contract state at deployment.
#[derive(Debug, Clone)]
pub struct LedgerGenesis {
    pub owner: Address,
    pub super_owner: Address,
    pub campaign_fee: Amount,
}

pub struct LocalLedger {
    state: Mutex<LedgerState>,
}

#[derive(Clone)]
struct LedgerState {
    owner: Address,
    super_owner: Address,
    campaign_fee: Amount,
    balance: Amount,
    remaining_fees: Amount,
    next_campaign_id: u64,
    campaigns: BTreeMap<CampaignId, Campaign>,
    investments: HashMap<String, BTreeMap<CampaignId, u64>>,
    banned: HashSet<String>,
    destroyed: bool,
}

fn account_key(address: &Address) -> String {
    address.as_str().to_ascii_lowercase()
}

fn pledge_overflow() -> RpcException {
    RpcException::new(ErrorCode::Validation, "pledge count overflow")
}

impl LedgerState {
    fn ensure_live(&self) -> Result<(), RpcException> {
        if self.destroyed {
            return Err(RpcException::new(
                ErrorCode::Destroyed,
                "contract has been destroyed",
            ));
        }
        Ok(())
    }

    fn is_privileged(&self, account: &Address) -> bool {
        account.same_account(&self.owner) || account.same_account(&self.super_owner)
    }

    fn ids_with_status(&self, status: CampaignStatus) -> Vec<CampaignId> {
        self.campaigns
            .values()
            .filter(|campaign| campaign.status == status)
            .map(|campaign| campaign.id)
            .collect()
    }

    fn campaign(&self, campaign_id: CampaignId) -> Result<&Campaign, RpcException> {
        self.campaigns.get(&campaign_id).ok_or_else(|| {
            RpcException::new(
                ErrorCode::NotFound,
                format!("campaign {campaign_id} does not exist"),
            )
        })
    }

    fn active_campaign_mut(
        &mut self,
        campaign_id: CampaignId,
    ) -> Result<&mut Campaign, RpcException> {
        let campaign = self.campaigns.get_mut(&campaign_id).ok_or_else(|| {
            RpcException::new(
                ErrorCode::NotFound,
                format!("campaign {campaign_id} does not exist"),
            )
        })?;
        if campaign.status != CampaignStatus::Active {
            return Err(RpcException::reverted(format!(
                "campaign {campaign_id} is not active"
            )));
        }
        Ok(campaign)
    }

    fn investments_of(&self, account: &Address) -> InvestmentLists {
        let mut lists = InvestmentLists::default();
        if let Some(holdings) = self.investments.get(&account_key(account)) {
            for (campaign_id, shares) in holdings {
                lists.ids.push(*campaign_id);
                lists.shares.push(*shares);
            }
        }
        lists
    }

    fn debit_balance(&mut self, amount: &Amount) -> Result<(), RpcException> {
        self.balance = self.balance.checked_sub(amount).ok_or_else(|| {
            RpcException::new(ErrorCode::Internal, "contract balance underflow")
        })?;
        Ok(())
    }

    fn query(&self, query: &ContractQuery) -> Result<QueryResult, RpcException> {
        self.ensure_live()?;
        let result = match query {
            ContractQuery::FeeAmount => QueryResult::Amount(self.campaign_fee.clone()),
            ContractQuery::Owner => QueryResult::Address(self.owner.clone()),
            ContractQuery::SuperOwner => QueryResult::Address(self.super_owner.clone()),
            ContractQuery::ContractBalance => QueryResult::Amount(self.balance.clone()),
            ContractQuery::RemainingFees => QueryResult::Amount(self.remaining_fees.clone()),
            ContractQuery::ActiveCampaignIds => {
                QueryResult::CampaignIds(self.ids_with_status(CampaignStatus::Active))
            }
            ContractQuery::CompletedCampaignIds => {
                QueryResult::CampaignIds(self.ids_with_status(CampaignStatus::Completed))
            }
            ContractQuery::CancelledCampaignIds => {
                QueryResult::CampaignIds(self.ids_with_status(CampaignStatus::Cancelled))
            }
            ContractQuery::Campaign { campaign_id } => {
                QueryResult::Campaign(self.campaign(*campaign_id)?.clone())
            }
            ContractQuery::Investments { account } => {
                QueryResult::Investments(self.investments_of(account))
            }
        };
        Ok(result)
    }

    fn apply(
        &mut self,
        from: &Address,
        call: &ContractCall,
        value: &Amount,
    ) -> Result<(), RpcException> {
        self.ensure_live()?;
        let payable = matches!(
            call,
            ContractCall::CreateCampaign { .. } | ContractCall::FundCampaign { .. }
        );
        if !payable && !value.is_zero() {
            return Err(RpcException::reverted(format!(
                "{} does not accept value",
                call.method_name()
            )));
        }

        match call {
            ContractCall::CreateCampaign {
                title,
                pledge_cost,
                pledges_needed,
            } => {
                if self.is_privileged(from) {
                    return Err(RpcException::reverted("owners cannot create campaigns"));
                }
                if self.banned.contains(&account_key(from)) {
                    return Err(RpcException::reverted("entrepreneur is banned"));
                }
                if title.trim().is_empty() || *pledges_needed == 0 {
                    return Err(RpcException::new(
                        ErrorCode::Validation,
                        "campaign needs a title and a positive pledge goal",
                    ));
                }
                if *value != self.campaign_fee {
                    return Err(RpcException::reverted(format!(
                        "campaign fee is {}",
                        self.campaign_fee
                    )));
                }
                let id = CampaignId(self.next_campaign_id);
                self.next_campaign_id += 1;
                self.campaigns.insert(
                    id,
                    Campaign {
                        id,
                        entrepreneur: from.clone(),
                        title: title.clone(),
                        pledge_cost: pledge_cost.clone(),
                        pledges_needed: *pledges_needed,
                        pledges_count: 0,
                        total_raised: Amount::zero(),
                        status: CampaignStatus::Active,
                    },
                );
                self.balance = &self.balance + value;
                self.remaining_fees = &self.remaining_fees + value;
            }
            ContractCall::FundCampaign {
                campaign_id,
                quantity,
            } => {
                if *quantity == 0 {
                    return Err(RpcException::new(
                        ErrorCode::Validation,
                        "quantity must be positive",
                    ));
                }
                let campaign = self.active_campaign_mut(*campaign_id)?;
                if campaign.entrepreneur.same_account(from) {
                    return Err(RpcException::reverted(
                        "entrepreneur cannot fund own campaign",
                    ));
                }
                let expected = pledge_total(&campaign.pledge_cost, *quantity);
                if *value != expected {
                    return Err(RpcException::reverted(format!(
                        "value must equal {expected}"
                    )));
                }
                campaign.pledges_count = campaign
                    .pledges_count
                    .checked_add(*quantity)
                    .ok_or_else(pledge_overflow)?;
                campaign.total_raised = &campaign.total_raised + value;
                let shares = self
                    .investments
                    .entry(account_key(from))
                    .or_default()
                    .entry(*campaign_id)
                    .or_insert(0);
                *shares = shares.checked_add(*quantity).ok_or_else(pledge_overflow)?;
                self.balance = &self.balance + value;
            }
            ContractCall::CompleteCampaign { campaign_id } => {
                let privileged = self.is_privileged(from);
                let campaign = self.active_campaign_mut(*campaign_id)?;
                if !privileged && !campaign.entrepreneur.same_account(from) {
                    return Err(RpcException::new(
                        ErrorCode::Unauthorized,
                        "only the entrepreneur or an owner may complete",
                    ));
                }
                if !campaign.goal_reached() {
                    return Err(RpcException::reverted("pledge goal not reached"));
                }
                campaign.status = CampaignStatus::Completed;
                let payout = campaign.total_raised.clone();
                self.debit_balance(&payout)?;
            }
            ContractCall::CancelCampaign { campaign_id } => {
                let privileged = self.is_privileged(from);
                let campaign = self.active_campaign_mut(*campaign_id)?;
                if !privileged && !campaign.entrepreneur.same_account(from) {
                    return Err(RpcException::new(
                        ErrorCode::Unauthorized,
                        "only the entrepreneur or an owner may cancel",
                    ));
                }
                campaign.status = CampaignStatus::Cancelled;
            }
            ContractCall::ClaimRefunds => {
                let key = account_key(from);
                let refundable: Vec<(CampaignId, Amount)> = self
                    .investments
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .filter_map(|(campaign_id, shares)| {
                        let campaign = self.campaigns.get(campaign_id)?;
                        (campaign.status == CampaignStatus::Cancelled)
                            .then(|| (*campaign_id, pledge_total(&campaign.pledge_cost, *shares)))
                    })
                    .collect();
                if refundable.is_empty() {
                    return Err(RpcException::reverted("no refunds available"));
                }
                let total = refundable
                    .iter()
                    .fold(Amount::zero(), |acc, (_, refund)| &acc + refund);
                self.debit_balance(&total)?;
                if let Some(holdings) = self.investments.get_mut(&key) {
                    for (campaign_id, _) in &refundable {
                        holdings.remove(campaign_id);
                    }
                }
            }
            ContractCall::WithdrawOwnerFunds => {
                self.require_privileged(from)?;
                if self.remaining_fees.is_zero() {
                    return Err(RpcException::reverted("no fees to withdraw"));
                }
                let fees = std::mem::take(&mut self.remaining_fees);
                self.debit_balance(&fees)?;
            }
            ContractCall::DestroyContract => {
                self.require_privileged(from)?;
                self.balance = Amount::zero();
                self.destroyed = true;
            }
            ContractCall::BanEntrepreneur { entrepreneur } => {
                self.require_privileged(from)?;
                self.banned.insert(account_key(entrepreneur));
            }
            ContractCall::ChangeOwner { new_owner } => {
                self.require_privileged(from)?;
                self.owner = new_owner.clone();
            }
        }
        Ok(())
    }

    fn require_privileged(&self, from: &Address) -> Result<(), RpcException> {
        if self.is_privileged(from) {
            Ok(())
        } else {
            Err(RpcException::new(
                ErrorCode::Unauthorized,
                "only an owner may call this method",
            ))
        }
    }
}

impl LocalLedger {
    pub fn new(genesis: LedgerGenesis) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                owner: genesis.owner,
                super_owner: genesis.super_owner,
                campaign_fee: genesis.campaign_fee,
                balance: Amount::zero(),
                remaining_fees: Amount::zero(),
                next_campaign_id: 1,
                campaigns: BTreeMap::new(),
                investments: HashMap::new(),
                banned: HashSet::new(),
                destroyed: false,
            }),
        }
    }

    pub async fn query(&self, query: ContractQuery) -> Result<QueryResult, RpcException> {
        self.state.lock().await.query(&query)
    }

    /// Applies a transaction atomically; a rejected call leaves state untouched.
    pub async fn execute(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionReceipt, RpcException> {
        let value = request.value.unwrap_or_default();
        let mut state = self.state.lock().await;
        let method = request.call.method_name();

        // A reverted call must leave no partial mutation behind.
        let mut scratch = state.clone();
        scratch.apply(&request.from, &request.call, &value)?;
        *state = scratch;

        info!(
            from = %request.from,
            method,
            value = %value,
            "ledger transaction applied"
        );
        Ok(TransactionReceipt {
            tx_id: Uuid::new_v4(),
            from: request.from,
            method: method.to_string(),
            value,
            applied_at: Utc::now(),
        })
    }

    async fn read<T>(
        &self,
        query: ContractQuery,
        extract: impl FnOnce(QueryResult) -> Option<T>,
    ) -> anyhow::Result<T> {
        let method = query.method_name();
        let result = self.query(query).await?;
        extract(result).ok_or_else(|| anyhow::anyhow!("unexpected result for {method}"))
    }
}

#[async_trait]
impl ContractReader for LocalLedger {
    async fn fee_amount(&self) -> anyhow::Result<Amount> {
        self.read(ContractQuery::FeeAmount, QueryResult::into_amount).await
    }

    async fn owner(&self) -> anyhow::Result<Address> {
        self.read(ContractQuery::Owner, QueryResult::into_address).await
    }

    async fn super_owner(&self) -> anyhow::Result<Address> {
        self.read(ContractQuery::SuperOwner, QueryResult::into_address).await
    }

    async fn contract_balance(&self) -> anyhow::Result<Amount> {
        self.read(ContractQuery::ContractBalance, QueryResult::into_amount).await
    }

    async fn remaining_fees(&self) -> anyhow::Result<Amount> {
        self.read(ContractQuery::RemainingFees, QueryResult::into_amount).await
    }

    async fn active_campaign_ids(&self) -> anyhow::Result<Vec<CampaignId>> {
        self.read(ContractQuery::ActiveCampaignIds, QueryResult::into_campaign_ids).await
    }

    async fn completed_campaign_ids(&self) -> anyhow::Result<Vec<CampaignId>> {
        self.read(ContractQuery::CompletedCampaignIds, QueryResult::into_campaign_ids).await
    }

    async fn cancelled_campaign_ids(&self) -> anyhow::Result<Vec<CampaignId>> {
        self.read(ContractQuery::CancelledCampaignIds, QueryResult::into_campaign_ids).await
    }

    async fn campaign(&self, campaign_id: CampaignId) -> anyhow::Result<Campaign> {
        self.read(ContractQuery::Campaign { campaign_id }, QueryResult::into_campaign).await
    }

    async fn investments(&self, account: &Address) -> anyhow::Result<InvestmentLists> {
        self.read(
            ContractQuery::Investments {
                account: account.clone(),
            },
            QueryResult::into_investments,
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
