use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    amount::Amount,
    domain::{Address, Campaign, CampaignId},
};

/// Read-only contract methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum ContractQuery {
    FeeAmount,
    Owner,
    SuperOwner,
    ContractBalance,
    RemainingFees,
    ActiveCampaignIds,
    CompletedCampaignIds,
    CancelledCampaignIds,
    Campaign { campaign_id: CampaignId },
    Investments { account: Address },
}

impl ContractQuery {
    pub fn method_name(&self) -> &'static str {
        match self {
            ContractQuery::FeeAmount => "fee_amount",
            ContractQuery::Owner => "owner",
            ContractQuery::SuperOwner => "super_owner",
            ContractQuery::ContractBalance => "contract_balance",
            ContractQuery::RemainingFees => "remaining_fees",
            ContractQuery::ActiveCampaignIds => "active_campaign_ids",
            ContractQuery::CompletedCampaignIds => "completed_campaign_ids",
            ContractQuery::CancelledCampaignIds => "cancelled_campaign_ids",
            ContractQuery::Campaign { .. } => "campaign",
            ContractQuery::Investments { .. } => "investments",
        }
    }
}

/// Raw reply of the account-investments query: two index-correlated sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentLists {
    pub ids: Vec<CampaignId>,
    pub shares: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum QueryResult {
    Amount(Amount),
    Address(Address),
    CampaignIds(Vec<CampaignId>),
    Campaign(Campaign),
    Investments(InvestmentLists),
}

impl QueryResult {
    pub fn into_amount(self) -> Option<Amount> {
        match self {
            Self::Amount(amount) => Some(amount),
            _ => None,
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn into_campaign_ids(self) -> Option<Vec<CampaignId>> {
        match self {
            Self::CampaignIds(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn into_campaign(self) -> Option<Campaign> {
        match self {
            Self::Campaign(campaign) => Some(campaign),
            _ => None,
        }
    }

    pub fn into_investments(self) -> Option<InvestmentLists> {
        match self {
            Self::Investments(lists) => Some(lists),
            _ => None,
        }
    }
}

/// State-mutating contract methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum ContractCall {
    CreateCampaign {
        title: String,
        pledge_cost: Amount,
        pledges_needed: u64,
    },
    FundCampaign {
        campaign_id: CampaignId,
        quantity: u64,
    },
    CompleteCampaign {
        campaign_id: CampaignId,
    },
    CancelCampaign {
        campaign_id: CampaignId,
    },
    ClaimRefunds,
    WithdrawOwnerFunds,
    DestroyContract,
    BanEntrepreneur {
        entrepreneur: Address,
    },
    ChangeOwner {
        new_owner: Address,
    },
}

impl ContractCall {
    pub fn method_name(&self) -> &'static str {
        match self {
            ContractCall::CreateCampaign { .. } => "create_campaign",
            ContractCall::FundCampaign { .. } => "fund_campaign",
            ContractCall::CompleteCampaign { .. } => "complete_campaign",
            ContractCall::CancelCampaign { .. } => "cancel_campaign",
            ContractCall::ClaimRefunds => "claim_refunds",
            ContractCall::WithdrawOwnerFunds => "withdraw_owner_funds",
            ContractCall::DestroyContract => "destroy_contract",
            ContractCall::BanEntrepreneur { .. } => "ban_entrepreneur",
            ContractCall::ChangeOwner { .. } => "change_owner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub call: ContractCall,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_id: Uuid,
    pub from: Address,
    pub method: String,
    pub value: Amount,
    pub applied_at: DateTime<Utc>,
}
