//! Plain-text rendering of a read-model snapshot.

use std::fmt::Write;

use client_core::{roles::CampaignControls, Snapshot};
use shared::{
    amount::{Amount, ETHER_DECIMALS},
    domain::{Address, Campaign},
};

const NONE: &str = "—";

fn ether(amount: &Amount) -> String {
    format!("{} ETH", amount.format_units(ETHER_DECIMALS))
}

fn account_label(account: Option<&Address>) -> String {
    account.map_or_else(|| NONE.to_string(), Address::to_string)
}

fn controls_label(controls: CampaignControls) -> String {
    let mut actions = Vec::new();
    if controls.can_pledge {
        actions.push("fund");
    }
    if controls.can_cancel {
        actions.push("cancel");
    }
    if controls.can_complete {
        actions.push("complete");
    }
    if actions.is_empty() {
        NONE.to_string()
    } else {
        actions.join(",")
    }
}

fn heading(out: &mut String, title: &str, campaigns: &[Campaign]) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{title} ({})", campaigns.len());
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Connected:        {}", account_label(snapshot.account.as_ref()));
    let _ = writeln!(out, "Owner:            {}", snapshot.owner);
    let _ = writeln!(out, "SuperOwner:       {}", snapshot.super_owner);
    let _ = writeln!(out, "Contract balance: {}", ether(&snapshot.contract_balance));
    let _ = writeln!(out, "Fees/royalties:   {}", ether(&snapshot.remaining_fees));
    let _ = writeln!(out, "Campaign fee:     {}", ether(&snapshot.fee_amount));
    if snapshot.account.is_some() && !snapshot.can_create_campaign() {
        let _ = writeln!(out, "Owners cannot create campaigns");
    }

    heading(&mut out, "Active campaigns", &snapshot.active);
    for campaign in &snapshot.active {
        let _ = writeln!(
            out,
            "  #{} {} by {} | cost {} | sold {}/{} | my shares {} | actions {}",
            campaign.id,
            campaign.title,
            campaign.entrepreneur,
            ether(&campaign.pledge_cost),
            campaign.pledges_count,
            campaign.pledges_needed,
            snapshot.shares_in(campaign.id),
            controls_label(snapshot.campaign_controls(campaign)),
        );
    }

    heading(&mut out, "Completed campaigns", &snapshot.completed);
    for campaign in &snapshot.completed {
        let _ = writeln!(
            out,
            "  #{} {} by {} | raised {} | goal {}",
            campaign.id,
            campaign.title,
            campaign.entrepreneur,
            ether(&campaign.total_raised),
            campaign.pledges_needed,
        );
    }

    heading(&mut out, "Cancelled campaigns", &snapshot.cancelled);
    for campaign in &snapshot.cancelled {
        let _ = writeln!(
            out,
            "  #{} {} by {} | goal {}",
            campaign.id, campaign.title, campaign.entrepreneur, campaign.pledges_needed,
        );
    }

    if snapshot.account.is_some() {
        let _ = writeln!(out);
        let _ = writeln!(out, "My investments ({})", snapshot.investments.len());
        for investment in &snapshot.investments {
            let _ = writeln!(
                out,
                "  campaign #{}: {} shares",
                investment.campaign_id, investment.shares
            );
        }
    }
    if snapshot.is_privileged() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Admin: withdraw | destroy | ban <address> | change-owner <address>"
        );
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
