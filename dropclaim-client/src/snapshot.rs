//! File-backed chain-data source.
//!
//! A snapshot is a JSON document holding distributor accounts and claim
//! records, as exported from an indexer. [`SnapshotSource`] serves it
//! through [`ChainDataSource`] and applies claims in memory, so the whole
//! client can run offline.
//!
//! ```json
//! {
//!   "campaigns": [{ "address": "...", "account": { "version": 1, "mint": "..." } }],
//!   "claims": [{ "campaign": "...", "claimant": "...", "total_amount": "1000" }]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use dropclaim_core::{
    validate_public_key, Amount, CampaignFilter, ClaimRequest, ClassifiedError, ErrorKind,
    RawCampaignRecord, RawClaimRecord, Result, TransactionReceipt, WalletHandle,
};

use crate::source::{ChainDataSource, SourceResult};

/// Seed prefixed to claim-record key derivation.
pub const CLAIM_KEY_SEED: &[u8] = b"ClaimStatus";

/// Claim record in a snapshot, tagged with its campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotClaim {
    pub campaign: String,
    #[serde(flatten)]
    pub record: RawClaimRecord,
}

/// On-disk snapshot document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub campaigns: Vec<RawCampaignRecord>,
    pub claims: Vec<SnapshotClaim>,
}

/// Claim-record key for `user` in `campaign`: `hex(sha256(seed ‖ user ‖ campaign))`.
///
/// # Errors
///
/// `InvalidPublicKey` if either key is malformed.
pub fn derive_claim_key(campaign: &str, user: &str) -> Result<String> {
    validate_public_key(campaign)?;
    validate_public_key(user)?;

    let mut hasher = Sha256::new();
    hasher.update(CLAIM_KEY_SEED);
    hasher.update(user.as_bytes());
    hasher.update(campaign.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

struct SnapshotState {
    snapshot: Snapshot,
    /// Claim key -> index into `snapshot.claims`.
    claims_by_key: HashMap<String, usize>,
}

impl SnapshotState {
    fn new(snapshot: Snapshot) -> Self {
        let mut claims_by_key = HashMap::with_capacity(snapshot.claims.len());
        for (index, claim) in snapshot.claims.iter().enumerate() {
            let Some(claimant) = claim.record.claimant.as_deref() else {
                warn!(campaign = %claim.campaign, "skipping snapshot claim without claimant");
                continue;
            };
            match derive_claim_key(&claim.campaign, claimant) {
                Ok(key) => {
                    claims_by_key.insert(key, index);
                }
                Err(err) => warn!(
                    campaign = %claim.campaign,
                    claimant,
                    "skipping snapshot claim: {}",
                    err.message()
                ),
            }
        }
        Self {
            snapshot,
            claims_by_key,
        }
    }
}

/// [`ChainDataSource`] over an in-memory [`Snapshot`].
pub struct SnapshotSource {
    state: RwLock<SnapshotState>,
}

impl SnapshotSource {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(SnapshotState::new(snapshot)),
        }
    }

    /// Load a snapshot file.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the file cannot be read
    /// - `InvalidDataFormat` if it is not a valid snapshot document
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::Configuration,
                format!("Cannot read snapshot {}: {}", path.display(), e),
            )
            .with_context("path", path.display().to_string())
        })?;
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::InvalidDataFormat,
                format!("Malformed snapshot {}: {}", path.display(), e),
            )
            .with_context("path", path.display().to_string())
        })?;

        info!(
            path = %path.display(),
            campaigns = snapshot.campaigns.len(),
            claims = snapshot.claims.len(),
            "loaded snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current state, including applied claims, to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.read().snapshot).map_err(|e| {
            ClassifiedError::new(ErrorKind::Internal, format!("Cannot encode snapshot: {}", e))
        })?;
        fs::write(path, json).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::Configuration,
                format!("Cannot write snapshot {}: {}", path.display(), e),
            )
            .with_context("path", path.display().to_string())
        })?;
        debug!(path = %path.display(), "saved snapshot");
        Ok(())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.read().snapshot.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, SnapshotState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SnapshotState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_claim(&self, request: &ClaimRequest, wallet: &WalletHandle) -> Result<TransactionReceipt> {
        let signer = wallet.require_connected()?;
        if signer != request.claimant {
            return Err(ClassifiedError::new(
                ErrorKind::Unauthorized,
                "Wallet does not own this allocation",
            )
            .with_context("claimant", request.claimant.as_str()));
        }

        let key = derive_claim_key(&request.campaign, &request.claimant)?;
        let mut state = self.write();
        let index = *state.claims_by_key.get(&key).ok_or_else(|| {
            ClassifiedError::new(ErrorKind::AccountNotFound, "Account does not exist")
                .with_context("claim_key", key.as_str())
        })?;

        let record = &state.snapshot.claims[index].record;
        if record.is_claimed.unwrap_or(false) {
            return Err(ClassifiedError::new(
                ErrorKind::ValidationError,
                "Allocation already claimed",
            ));
        }
        let total = record.total_amount.ok_or_else(|| {
            ClassifiedError::new(ErrorKind::InvalidAccountData, "Claim record has no total")
        })?;
        let claimed = record.claimed_amount.unwrap_or_default();
        if request.amount > total.saturating_sub(claimed) {
            return Err(ClassifiedError::new(
                ErrorKind::ValidationError,
                "Claim exceeds remaining allocation",
            )
            .with_context("amount", request.amount.to_string()));
        }
        let new_claimed = claimed.checked_add(request.amount).ok_or_else(|| {
            ClassifiedError::new(ErrorKind::InvalidAccountData, "Claimed amount overflows")
        })?;

        let record = &mut state.snapshot.claims[index].record;
        record.claimed_amount = Some(new_claimed);
        record.is_claimed = Some(true);

        let campaign = state
            .snapshot
            .campaigns
            .iter_mut()
            .filter(|c| c.address.as_deref() == Some(request.campaign.as_str()))
            .find_map(|c| c.account.as_mut());
        if let Some(account) = campaign {
            let before = account.total_amount_claimed.unwrap_or_default();
            account.total_amount_claimed = Some(before.checked_add(request.amount).unwrap_or(before));
            account.num_nodes_claimed = Some(account.num_nodes_claimed.unwrap_or(0).saturating_add(1));
        }

        let mut hasher = Sha256::new();
        hasher.update(request.campaign.as_bytes());
        hasher.update(request.claimant.as_bytes());
        hasher.update(request.amount.to_string().as_bytes());
        for node in request.proof.nodes() {
            hasher.update(node);
        }
        Ok(TransactionReceipt {
            transaction_id: hex::encode(hasher.finalize()),
        })
    }
}

#[async_trait]
impl ChainDataSource for SnapshotSource {
    async fn search_campaigns(&self, filter: &CampaignFilter) -> SourceResult<Vec<RawCampaignRecord>> {
        let unfiltered = filter.mint.is_none() && filter.admin.is_none();
        Ok(self
            .read()
            .snapshot
            .campaigns
            .iter()
            .filter(|record| match &record.account {
                Some(account) => filter.matches(account),
                None => unfiltered,
            })
            .cloned()
            .collect())
    }

    async fn get_campaign_records(&self, addresses: &[String]) -> SourceResult<Vec<RawCampaignRecord>> {
        let state = self.read();
        Ok(addresses
            .iter()
            .filter_map(|address| {
                state
                    .snapshot
                    .campaigns
                    .iter()
                    .find(|record| record.address.as_deref() == Some(address.as_str()))
                    .cloned()
            })
            .collect())
    }

    fn derive_claim_key(&self, campaign: &str, user: &str) -> SourceResult<String> {
        Ok(derive_claim_key(campaign, user)?)
    }

    async fn get_claim_record(&self, claim_key: &str) -> SourceResult<Option<RawClaimRecord>> {
        let state = self.read();
        Ok(state
            .claims_by_key
            .get(claim_key)
            .map(|&index| state.snapshot.claims[index].record.clone()))
    }

    async fn submit_claim(&self, request: &ClaimRequest, wallet: &WalletHandle) -> SourceResult<TransactionReceipt> {
        let receipt = self.apply_claim(request, wallet)?;
        info!(campaign = %request.campaign, transaction_id = %receipt.transaction_id, "claim applied to snapshot");
        Ok(receipt)
    }
}

impl From<Snapshot> for SnapshotSource {
    fn from(snapshot: Snapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}

/// An unclaimed snapshot claim record.
pub fn claim(campaign: &str, claimant: &str, total: impl Into<Amount>) -> SnapshotClaim {
    SnapshotClaim {
        campaign: campaign.to_string(),
        record: RawClaimRecord {
            claimant: Some(claimant.to_string()),
            total_amount: Some(total.into()),
            claimed_amount: None,
            is_claimed: None,
        },
    }
}
