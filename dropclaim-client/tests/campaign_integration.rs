//! Campaign listing and detail lookups.

mod common;

use std::sync::atomic::AtomicU32;

use common::{campaign, key, LogCapture, StubSource};
use dropclaim_client::{AirdropClient, ClientConfig};
use dropclaim_core::{CampaignFilter, ErrorKind, RawCampaignRecord};

const PREFIXES: [&str; 12] = ["A", "B", "C", "D", "E", "F", "G", "H", "J", "K", "M", "N"];

fn twelve_campaigns() -> Vec<RawCampaignRecord> {
    let mut records: Vec<RawCampaignRecord> = PREFIXES
        .iter()
        .zip(1u64..)
        .map(|(prefix, version)| campaign(&key(prefix), version))
        .collect();
    // two malformed records
    records[3].account.as_mut().unwrap().mint = None;
    records[7].account.as_mut().unwrap().admin = Some("not-a-key".into());
    records
}

#[tokio::test]
async fn test_malformed_records_are_dropped_and_sorted() {
    let source = StubSource {
        campaigns: twelve_campaigns(),
        ..Default::default()
    };
    let client = AirdropClient::new(source, ClientConfig::default());
    let logs = LogCapture::default();
    let _guard = logs.install();

    let list = client
        .get_campaign_list(&CampaignFilter::default(), None)
        .await
        .into_result()
        .unwrap();

    let warnings = logs.warnings();
    assert_eq!(warnings.len(), 2, "{}", logs.contents());
    assert!(warnings.iter().all(|w| w.contains("dropping malformed campaign record")));
    assert!(warnings.iter().any(|w| w.contains(&key("D"))));
    assert!(warnings.iter().any(|w| w.contains(&key("H"))));

    assert_eq!(list.len(), 10);
    let versions: Vec<u64> = list.iter().map(|c| c.version).collect();
    let mut sorted = versions.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(versions, sorted);
    assert!(!versions.contains(&4));
    assert!(!versions.contains(&8));
}

#[tokio::test]
async fn test_limit_is_applied_after_sorting() {
    let source = StubSource {
        campaigns: twelve_campaigns(),
        ..Default::default()
    };
    let client = AirdropClient::new(source, ClientConfig::default());

    let list = client
        .get_campaign_list(&CampaignFilter::default(), Some(3))
        .await
        .into_result()
        .unwrap();
    assert_eq!(list.iter().map(|c| c.version).collect::<Vec<_>>(), vec![12, 11, 10]);

    let none = client
        .get_campaign_list(&CampaignFilter::default(), Some(0))
        .await
        .into_result()
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_no_limit_returns_every_campaign() {
    // base58 has no '0'
    let records = (1u64..=60)
        .map(|n| campaign(&key(&format!("C{}", n).replace('0', "z")), n))
        .collect();
    let source = StubSource {
        campaigns: records,
        ..Default::default()
    };
    let client = AirdropClient::new(source, ClientConfig::default());

    let list = client
        .get_campaign_list(&CampaignFilter::default(), None)
        .await
        .into_result()
        .unwrap();
    assert_eq!(list.len(), 60);
    assert_eq!(list[0].version, 60);

    let capped = AirdropClient::new(
        StubSource {
            campaigns: client.source().campaigns.clone(),
            ..Default::default()
        },
        ClientConfig {
            default_list_limit: Some(25),
            ..Default::default()
        },
    );
    let list = capped
        .get_campaign_list(&CampaignFilter::default(), None)
        .await
        .into_result()
        .unwrap();
    assert_eq!(list.len(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_transient_search_failures_are_retried() {
    let source = StubSource {
        campaigns: twelve_campaigns(),
        search_failures: AtomicU32::new(2),
        search_error: "fetch failed".into(),
        ..Default::default()
    };
    let client = AirdropClient::new(source, ClientConfig::default());

    let result = client.get_campaign_list(&CampaignFilter::default(), None).await;
    assert!(result.is_success());
    assert_eq!(client.source().searches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_network_error() {
    let source = StubSource {
        search_failures: AtomicU32::new(10),
        search_error: "network unreachable".into(),
        ..Default::default()
    };
    let client = AirdropClient::new(source, ClientConfig::default());

    let result = client.get_campaign_list(&CampaignFilter::default(), None).await;
    let err = result.error().unwrap();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert_eq!(err.context()["operation"], "get_campaign_list");
    assert_eq!(client.source().searches(), 4);
}

#[tokio::test]
async fn test_unrecognised_failure_is_unknown_and_keeps_original() {
    let source = StubSource {
        search_failures: AtomicU32::new(1),
        search_error: "kaboom".into(),
        ..Default::default()
    };
    let config = ClientConfig {
        retry: dropclaim_core::RetryConfig::none(),
        ..Default::default()
    };
    let client = AirdropClient::new(source, config);

    let err = client
        .get_campaign_list(&CampaignFilter::default(), None)
        .await
        .into_result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.context()["original_error"], "kaboom");
}

#[tokio::test]
async fn test_detail_lookup() {
    let source = StubSource {
        campaigns: twelve_campaigns(),
        ..Default::default()
    };
    let client = AirdropClient::new(source, ClientConfig::default());

    let detail = client
        .get_campaign_detail(&key("A"))
        .await
        .into_result()
        .unwrap()
        .unwrap();
    assert_eq!(detail.summary.version, 1);
    assert!(detail.merkle_root.is_some());

    let missing = client.get_campaign_detail(&key("Z")).await;
    assert_eq!(missing.data(), Some(&None));

    let invalid = client.get_campaign_detail("bad key").await;
    assert_eq!(invalid.error().unwrap().kind(), ErrorKind::InvalidPublicKey);
}
