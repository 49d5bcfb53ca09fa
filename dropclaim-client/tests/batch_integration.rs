//! Batched allocation lookups against a stub source.

mod common;

use std::time::Duration;

use common::{allocation, campaign, key, StubSource, USER};
use dropclaim_client::snapshot::claim;
use dropclaim_client::{AirdropClient, ClientConfig, Snapshot, SnapshotSource};
use dropclaim_core::ErrorKind;
use tokio::time::Instant;

fn stub(failing: &[&str]) -> StubSource {
    let mut source = StubSource {
        lookup_error: "rpc node returned 503".into(),
        ..Default::default()
    };
    for prefix in ["A", "B", "C"] {
        source.claims.insert(key(prefix), allocation(1_000));
    }
    source.failing = failing.iter().map(|p| key(p)).collect();
    source
}

#[tokio::test]
async fn test_failed_lookup_degrades_to_absent_entry() {
    let client = AirdropClient::new(stub(&["B"]), ClientConfig::default());
    let campaigns = [key("A"), key("B"), key("C")];

    let result = client.get_batch_user_allocations(&campaigns, Some(USER)).await;
    let batch = result.data().expect("batch never fails for per-campaign errors");

    assert_eq!(batch.len(), 3);
    for campaign in &campaigns {
        assert!(batch.contains(campaign));
    }
    assert!(batch.allocation(&key("A")).is_some());
    assert!(batch.allocation(&key("B")).is_none());
    assert!(batch.allocation(&key("C")).is_some());
    assert_eq!(batch.found(), 2);
}

#[tokio::test]
async fn test_empty_batch() {
    let client = AirdropClient::new(stub(&[]), ClientConfig::default());
    let result = client
        .get_batch_user_allocations(Vec::<String>::new(), Some(USER))
        .await;

    assert!(result.data().unwrap().is_empty());
    assert_eq!(client.source().lookups(), 0);
}

#[tokio::test]
async fn test_missing_user_fails_before_any_lookup() {
    let client = AirdropClient::new(stub(&[]), ClientConfig::default());

    for user in [None, Some(""), Some("   ")] {
        let result = client.get_batch_user_allocations([key("A")], user).await;
        assert_eq!(result.error().unwrap().kind(), ErrorKind::WalletNotConnected);
    }
    assert_eq!(client.source().lookups(), 0);
}

#[tokio::test]
async fn test_duplicate_campaigns_collapse() {
    let client = AirdropClient::new(stub(&[]), ClientConfig::default());
    let result = client
        .get_batch_user_allocations([key("A"), key("A"), key("C")], Some(USER))
        .await;

    assert_eq!(result.data().unwrap().len(), 2);
    assert_eq!(client.source().lookups(), 2);
}

#[tokio::test]
async fn test_every_lookup_failing_still_succeeds() {
    let client = AirdropClient::new(stub(&["A", "B", "C"]), ClientConfig::default());
    let result = client
        .get_batch_user_allocations([key("A"), key("B"), key("C")], Some(USER))
        .await;

    let batch = result.data().unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.found(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lookups_run_concurrently() {
    let mut source = stub(&[]);
    source.lookup_delay = Some(Duration::from_millis(100));
    let client = AirdropClient::new(source, ClientConfig::default());
    let campaigns = ["A", "B", "C", "D", "E"].map(key);

    let start = Instant::now();
    let result = client.get_batch_user_allocations(&campaigns, Some(USER)).await;
    let elapsed = start.elapsed();

    assert_eq!(result.data().unwrap().len(), 5);
    assert_eq!(client.source().lookups(), 5);
    // one lookup's worth of waiting, not five
    assert!(elapsed >= Duration::from_millis(100), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(200), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_key_derivation_failure_only_affects_its_entry() {
    let mut source = stub(&[]);
    source.underivable.insert(key("B"));
    let client = AirdropClient::new(source, ClientConfig::default());
    let campaigns = [key("A"), key("B"), key("C")];

    let result = client.get_batch_user_allocations(&campaigns, Some(USER)).await;
    let batch = result.data().unwrap();

    assert_eq!(batch.len(), 3);
    assert!(campaigns.iter().all(|c| batch.contains(c)));
    assert!(batch.allocation(&key("B")).is_none());
    assert!(batch.allocation(&key("A")).is_some());
    assert!(batch.allocation(&key("C")).is_some());
    // no lookup is attempted for the entry without a key
    assert_eq!(client.source().lookups(), 2);
}

#[tokio::test]
async fn test_malformed_campaign_id_in_snapshot_batch() {
    let source = SnapshotSource::from_snapshot(Snapshot {
        campaigns: vec![campaign(&key("A"), 1)],
        claims: vec![claim(&key("A"), USER, 400u64)],
    });
    let client = AirdropClient::new(source, ClientConfig::default());
    let bad = "not-base58-0OIl";

    let result = client
        .get_batch_user_allocations([key("A").as_str(), bad], Some(USER))
        .await;
    let batch = result.data().unwrap();

    assert_eq!(batch.len(), 2);
    assert!(batch.contains(bad));
    assert!(batch.allocation(bad).is_none());
    assert!(batch.allocation(&key("A")).is_some());
}
