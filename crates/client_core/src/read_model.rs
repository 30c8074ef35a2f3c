//! Read-model builder: one consistent snapshot of contract state per rebuild.

use std::{future::Future, sync::Arc};

use futures::future::join_all;
use ledger_integration::ContractReader;
use shared::{
    amount::Amount,
    domain::{Address, Campaign, CampaignId, CampaignStatus, Investment},
    protocol::InvestmentLists,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::roles::{self, CampaignControls};

pub const READ_FAILURE_DIAGNOSTIC: &str = "Contract read failed – check ABI/address/network";

#[derive(Debug, Error)]
pub enum ReadModelError {
    #[error("Contract read failed – check ABI/address/network")]
    ContractRead {
        query: &'static str,
        source: anyhow::Error,
    },
}

impl ReadModelError {
    pub fn query(&self) -> &'static str {
        match self {
            ReadModelError::ContractRead { query, .. } => query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Session identity the snapshot was scoped to.
    pub account: Option<Address>,
    pub fee_amount: Amount,
    pub owner: Address,
    pub super_owner: Address,
    pub contract_balance: Amount,
    pub remaining_fees: Amount,
    pub active: Vec<Campaign>,
    pub completed: Vec<Campaign>,
    pub cancelled: Vec<Campaign>,
    pub investments: Vec<Investment>,
}

impl Snapshot {
    pub fn is_privileged(&self) -> bool {
        roles::is_privileged(self.account.as_ref(), &self.owner, &self.super_owner)
    }

    pub fn can_create_campaign(&self) -> bool {
        roles::can_create_campaign(self.account.as_ref(), self.is_privileged())
    }

    pub fn campaign_controls(&self, campaign: &Campaign) -> CampaignControls {
        roles::campaign_controls(self.account.as_ref(), self.is_privileged(), campaign)
    }

    pub fn shares_in(&self, campaign_id: CampaignId) -> u64 {
        self.investments
            .iter()
            .find(|investment| investment.campaign_id == campaign_id)
            .map_or(0, |investment| investment.shares)
    }
}

/// Pairs the two investment sequences strictly by position.
pub fn zip_investments(lists: InvestmentLists) -> Vec<Investment> {
    lists
        .ids
        .into_iter()
        .zip(lists.shares)
        .map(|(campaign_id, shares)| Investment {
            campaign_id,
            shares,
        })
        .collect()
}

#[derive(Default)]
struct CampaignBuckets {
    active: Vec<Campaign>,
    completed: Vec<Campaign>,
    cancelled: Vec<Campaign>,
}

async fn contract_read<T>(
    query: &'static str,
    read: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, ReadModelError> {
    read.await.map_err(|source| {
        warn!(query, error = %source, "contract read failed");
        ReadModelError::ContractRead { query, source }
    })
}

pub struct SnapshotBuilder {
    reader: Arc<dyn ContractReader>,
}

impl SnapshotBuilder {
    pub fn new(reader: Arc<dyn ContractReader>) -> Self {
        Self { reader }
    }

    pub async fn rebuild(&self, account: Option<&Address>) -> Result<Snapshot, ReadModelError> {
        let reader = self.reader.as_ref();
        let (
            fee_amount,
            owner,
            super_owner,
            contract_balance,
            remaining_fees,
            active_ids,
            completed_ids,
            cancelled_ids,
        ) = futures::try_join!(
            contract_read("fee_amount", reader.fee_amount()),
            contract_read("owner", reader.owner()),
            contract_read("super_owner", reader.super_owner()),
            contract_read("contract_balance", reader.contract_balance()),
            contract_read("remaining_fees", reader.remaining_fees()),
            contract_read("active_campaign_ids", reader.active_campaign_ids()),
            contract_read("completed_campaign_ids", reader.completed_campaign_ids()),
            contract_read("cancelled_campaign_ids", reader.cancelled_campaign_ids()),
        )?;

        let (buckets, investments) = futures::join!(
            self.fetch_campaigns(active_ids, completed_ids, cancelled_ids),
            self.fetch_investments(account),
        );
        let investments = investments?;

        info!(
            account = account.map(Address::as_str).unwrap_or("-"),
            active = buckets.active.len(),
            completed = buckets.completed.len(),
            cancelled = buckets.cancelled.len(),
            investments = investments.len(),
            "read model rebuilt"
        );
        Ok(Snapshot {
            account: account.cloned(),
            fee_amount,
            owner,
            super_owner,
            contract_balance,
            remaining_fees,
            active: buckets.active,
            completed: buckets.completed,
            cancelled: buckets.cancelled,
            investments,
        })
    }

    /// Fetches every listed campaign concurrently and files it under the list it came from.
    async fn fetch_campaigns(
        &self,
        active_ids: Vec<CampaignId>,
        completed_ids: Vec<CampaignId>,
        cancelled_ids: Vec<CampaignId>,
    ) -> CampaignBuckets {
        let tagged = active_ids
            .into_iter()
            .map(|id| (CampaignStatus::Active, id))
            .chain(
                completed_ids
                    .into_iter()
                    .map(|id| (CampaignStatus::Completed, id)),
            )
            .chain(
                cancelled_ids
                    .into_iter()
                    .map(|id| (CampaignStatus::Cancelled, id)),
            );
        let details = join_all(
            tagged.map(|(bucket, id)| async move { (bucket, self.fetch_detail(id).await) }),
        )
        .await;

        let mut buckets = CampaignBuckets::default();
        for (bucket, detail) in details {
            let Some(campaign) = detail else {
                continue;
            };
            match bucket {
                CampaignStatus::Active => buckets.active.push(campaign),
                CampaignStatus::Completed => buckets.completed.push(campaign),
                CampaignStatus::Cancelled => buckets.cancelled.push(campaign),
            }
        }
        buckets
    }

    async fn fetch_detail(&self, campaign_id: CampaignId) -> Option<Campaign> {
        match self.reader.campaign(campaign_id).await {
            Ok(campaign) => Some(campaign),
            Err(error) => {
                debug!(%campaign_id, %error, "dropping campaign with unreadable detail");
                None
            }
        }
    }

    async fn fetch_investments(
        &self,
        account: Option<&Address>,
    ) -> Result<Vec<Investment>, ReadModelError> {
        let Some(account) = account else {
            return Ok(Vec::new());
        };
        contract_read("investments", self.reader.investments(account))
            .await
            .map(zip_investments)
    }
}

/// The one shared snapshot slot. Replaced wholesale; whichever rebuild assigns last wins.
#[derive(Default)]
pub struct SnapshotSlot {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotSlot {
    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
#[path = "tests/read_model_tests.rs"]
mod tests;
