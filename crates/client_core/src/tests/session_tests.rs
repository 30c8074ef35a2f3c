use std::time::Duration;

use shared::domain::{CampaignId, CampaignStatus};
use tokio::sync::broadcast;

use super::*;
use crate::{
    read_model::{SnapshotBuilder, SnapshotSlot},
    test_support::{addr, campaign, FakeReader, FakeState, FakeWallet, ALICE, BOB},
};

struct Harness {
    wallet: Arc<FakeWallet>,
    slot: Arc<SnapshotSlot>,
    status: StatusChannel,
    tracker: Arc<SessionTracker>,
}

fn harness(account: Option<&str>) -> Harness {
    let reader = FakeReader::new(
        FakeState::default()
            .with_campaign(campaign(1, CampaignStatus::Active))
            .with_investments(BOB, &[1], &[2])
            .with_investments(ALICE, &[1], &[7]),
    );
    let wallet = FakeWallet::new(account.map(addr));
    let slot = Arc::new(SnapshotSlot::default());
    let status = StatusChannel::new();
    let state = Arc::new(SessionState::default());
    let refresher = Arc::new(SnapshotRefresher::new(
        SnapshotBuilder::new(reader),
        slot.clone(),
        state.clone(),
        status.clone(),
    ));
    let tracker = Arc::new(SessionTracker::new(
        wallet.clone(),
        state,
        refresher,
        status.clone(),
    ));
    Harness {
        wallet,
        slot,
        status,
        tracker,
    }
}

async fn wait_for_account(
    slot: &SnapshotSlot,
    expected: Option<&Address>,
) -> Arc<crate::Snapshot> {
    for _ in 0..100 {
        if let Some(snapshot) = slot.current().await {
            if snapshot.account.as_ref() == expected {
                return snapshot;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("snapshot for {expected:?} never arrived");
}

fn drain(updates: &mut broadcast::Receiver<StatusUpdate>) -> Vec<StatusUpdate> {
    let mut seen = Vec::new();
    while let Ok(update) = updates.try_recv() {
        seen.push(update);
    }
    seen
}

#[tokio::test]
async fn connect_records_account_and_builds_snapshot() {
    let h = harness(Some(BOB));

    let account = h.tracker.connect().await;

    assert_eq!(account, Some(addr(BOB)));
    assert_eq!(h.tracker.current_account().await, Some(addr(BOB)));
    let snapshot = h.slot.current().await.expect("snapshot");
    assert_eq!(snapshot.shares_in(CampaignId(1)), 2);
    assert_eq!(h.status.latest(), StatusUpdate::Cleared);
}

#[tokio::test]
async fn failed_connect_advises_once_and_still_builds() {
    let h = harness(None);
    let mut updates = h.status.subscribe();

    assert!(h.tracker.connect().await.is_none());
    assert_eq!(
        h.status.latest(),
        StatusUpdate::Advisory(CONNECT_ADVISORY.to_string())
    );
    assert!(h.tracker.connect().await.is_none());

    let snapshot = h.slot.current().await.expect("snapshot without account");
    assert!(snapshot.investments.is_empty());
    assert_eq!(snapshot.active.len(), 1);

    let advisories = drain(&mut updates)
        .into_iter()
        .filter(|update| matches!(update, StatusUpdate::Advisory(_)))
        .collect::<Vec<_>>();
    assert_eq!(
        advisories,
        vec![StatusUpdate::Advisory(CONNECT_ADVISORY.to_string())]
    );
}

#[tokio::test]
async fn account_change_rescopes_the_snapshot() {
    let h = harness(Some(BOB));
    h.tracker.connect().await;

    h.tracker.apply_account_change(Some(addr(ALICE))).await;

    let snapshot = h.slot.current().await.expect("snapshot");
    assert_eq!(snapshot.account, Some(addr(ALICE)));
    assert_eq!(snapshot.shares_in(CampaignId(1)), 7);
}

#[tokio::test]
async fn watcher_follows_wallet_account_changes() {
    let h = harness(Some(BOB));
    let watcher = h.tracker.watch_account_changes();
    h.tracker.connect().await;

    let alice = addr(ALICE);
    h.wallet.switch_account(Some(alice.clone())).await;
    let snapshot = wait_for_account(&h.slot, Some(&alice)).await;
    assert_eq!(snapshot.shares_in(CampaignId(1)), 7);
    assert_eq!(h.tracker.current_account().await, Some(alice));

    h.wallet.switch_account(None).await;
    let snapshot = wait_for_account(&h.slot, None).await;
    assert!(snapshot.investments.is_empty());
    assert_eq!(h.tracker.current_account().await, None);

    watcher.abort();
}
