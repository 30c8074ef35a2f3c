//! Role checks and control enablement derived from a snapshot.
//!
//! These are optimistic hints for disabling controls. The contract enforces
//! the actual rules and may still reject a call these functions allow.

use shared::domain::{Address, Campaign, CampaignStatus};

pub fn is_privileged(current: Option<&Address>, owner: &Address, super_owner: &Address) -> bool {
    current.is_some_and(|account| account.same_account(owner) || account.same_account(super_owner))
}

/// Owners may not open campaigns of their own.
pub fn can_create_campaign(current: Option<&Address>, privileged: bool) -> bool {
    current.is_some() && !privileged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CampaignControls {
    pub can_pledge: bool,
    pub can_cancel: bool,
    pub can_complete: bool,
}

pub fn campaign_controls(
    current: Option<&Address>,
    privileged: bool,
    campaign: &Campaign,
) -> CampaignControls {
    let Some(account) = current else {
        return CampaignControls::default();
    };
    if campaign.status != CampaignStatus::Active {
        return CampaignControls::default();
    }

    let is_entrepreneur = account.same_account(&campaign.entrepreneur);
    let manages = privileged || is_entrepreneur;
    CampaignControls {
        can_pledge: !is_entrepreneur,
        can_cancel: manages,
        can_complete: manages && campaign.goal_reached(),
    }
}
