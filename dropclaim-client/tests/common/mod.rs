//! Shared fixtures for client integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dropclaim_client::{ChainDataSource, SourceResult};
use tracing_subscriber::fmt::writer::MakeWriter;

use dropclaim_core::{
    CampaignFilter, ClaimRequest, RawCampaignRecord, RawClaimRecord, RawDistributorAccount,
    TransactionReceipt, WalletHandle,
};

pub const MINT: &str = "So11111111111111111111111111111111111111112";
pub const ADMIN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const USER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

/// A 32-character public key starting with `prefix`.
pub fn key(prefix: &str) -> String {
    format!("{}{}", prefix, "1".repeat(32 - prefix.len()))
}

pub fn campaign(address: &str, version: u64) -> RawCampaignRecord {
    RawCampaignRecord {
        address: Some(address.to_string()),
        account: Some(RawDistributorAccount {
            version: Some(version),
            mint: Some(MINT.into()),
            admin: Some(ADMIN.into()),
            merkle_root: Some("ab".repeat(32)),
            max_total_claim: Some(1_000_000u64.into()),
            max_num_nodes: Some(100),
            ..Default::default()
        }),
    }
}

pub fn allocation(total: u64) -> RawClaimRecord {
    RawClaimRecord {
        claimant: Some(USER.into()),
        total_amount: Some(total.into()),
        claimed_amount: Some(0u64.into()),
        is_claimed: Some(false),
    }
}

/// Scriptable in-memory source that counts calls.
#[derive(Default)]
pub struct StubSource {
    pub campaigns: Vec<RawCampaignRecord>,
    /// Claim records by campaign, all belonging to [`USER`].
    pub claims: HashMap<String, RawClaimRecord>,
    /// Campaigns whose claim lookup throws `lookup_error`.
    pub failing: HashSet<String>,
    pub lookup_error: String,
    /// Campaigns whose claim key cannot be derived.
    pub underivable: HashSet<String>,
    /// Every claim lookup sleeps this long first.
    pub lookup_delay: Option<Duration>,
    /// Fail this many searches with `search_error` before succeeding.
    pub search_failures: AtomicU32,
    pub search_error: String,
    /// Every `submit_claim` fails with this message when set.
    pub submit_error: Option<String>,

    pub search_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub submitted: Mutex<Vec<ClaimRequest>>,
}

impl StubSource {
    pub fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainDataSource for StubSource {
    async fn search_campaigns(&self, filter: &CampaignFilter) -> SourceResult<Vec<RawCampaignRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.search_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.search_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(self.search_error.clone().into());
        }
        Ok(self
            .campaigns
            .iter()
            .filter(|r| r.account.as_ref().map_or(true, |a| filter.matches(a)))
            .cloned()
            .collect())
    }

    async fn get_campaign_records(&self, addresses: &[String]) -> SourceResult<Vec<RawCampaignRecord>> {
        Ok(self
            .campaigns
            .iter()
            .filter(|r| r.address.as_ref().map_or(false, |a| addresses.contains(a)))
            .cloned()
            .collect())
    }

    fn derive_claim_key(&self, campaign: &str, user: &str) -> SourceResult<String> {
        if self.underivable.contains(campaign) {
            return Err("Invalid public key input".into());
        }
        Ok(format!("{}:{}", campaign, user))
    }

    async fn get_claim_record(&self, claim_key: &str) -> SourceResult<Option<RawClaimRecord>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        let (campaign, _) = claim_key.split_once(':').ok_or("bad claim key")?;
        if self.failing.contains(campaign) {
            return Err(self.lookup_error.clone().into());
        }
        Ok(self.claims.get(campaign).cloned())
    }

    async fn submit_claim(&self, request: &ClaimRequest, _wallet: &WalletHandle) -> SourceResult<TransactionReceipt> {
        if let Some(message) = &self.submit_error {
            return Err(message.clone().into());
        }
        self.submitted.lock().unwrap().push(request.clone());
        Ok(TransactionReceipt {
            transaction_id: format!("tx-{}", request.campaign),
        })
    }
}

/// Formatted log output collected by a test subscriber.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Install a subscriber writing into this capture for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Lines logged at WARN level.
    pub fn warnings(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(" WARN "))
            .map(str::to_string)
            .collect()
    }
}

pub struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter { buf: self.buf.clone() }
    }
}
