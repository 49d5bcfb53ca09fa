//! Campaign records.
//!
//! A campaign is an on-chain merkle distributor. The chain-data source hands
//! back loosely typed records; [`CampaignSummary::from_record`] and
//! [`CampaignDetail::from_record`] validate them.

use ethers_core::types::U256;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{ClassifiedError, ErrorKind, Result};
use crate::keys::validate_public_key;

/// Filter for campaign searches. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignFilter {
    pub mint: Option<String>,
    pub admin: Option<String>,
}

impl CampaignFilter {
    pub fn matches(&self, account: &RawDistributorAccount) -> bool {
        let field_matches = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            Some(w) => actual.as_deref() == Some(w.as_str()),
            None => true,
        };
        field_matches(&self.mint, &account.mint) && field_matches(&self.admin, &account.admin)
    }
}

/// Campaign record as returned by the chain-data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCampaignRecord {
    pub address: Option<String>,
    pub account: Option<RawDistributorAccount>,
}

/// Decoded distributor account fields, any of which may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDistributorAccount {
    pub version: Option<u64>,
    pub mint: Option<String>,
    pub admin: Option<String>,
    /// Hex-encoded 32-byte merkle root.
    pub merkle_root: Option<String>,
    pub max_total_claim: Option<Amount>,
    pub max_num_nodes: Option<u64>,
    pub total_amount_claimed: Option<Amount>,
    pub num_nodes_claimed: Option<u64>,
    /// Claim window, unix seconds.
    pub start_ts: Option<i64>,
    pub end_ts: Option<i64>,
    pub clawback_start_ts: Option<i64>,
    pub clawed_back: Option<bool>,
}

/// Listing-level view of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub address: String,
    pub version: u64,
    pub mint: String,
    pub admin: String,
    pub max_total_claim: Amount,
    pub max_num_nodes: u64,
    pub total_amount_claimed: Amount,
    pub num_nodes_claimed: u64,
}

fn missing(field: &'static str, address: Option<&str>) -> ClassifiedError {
    ClassifiedError::new(
        ErrorKind::MissingRequiredField,
        format!("Campaign record is missing {}", field),
    )
    .with_context("field", field)
    .with_context("address", address.unwrap_or_default())
}

fn required<T: Clone>(value: &Option<T>, field: &'static str, address: Option<&str>) -> Result<T> {
    value.clone().ok_or_else(|| missing(field, address))
}

fn invalid_key(field: &'static str, address: &str, err: ClassifiedError) -> ClassifiedError {
    ClassifiedError::new(
        ErrorKind::InvalidAccountData,
        format!("Campaign {} has an invalid {}: {}", address, field, err.message()),
    )
    .with_context("field", field)
    .with_context("address", address)
}

impl CampaignSummary {
    /// Validate a raw record.
    ///
    /// # Errors
    ///
    /// - `MissingRequiredField` if the address, account, version, mint,
    ///   admin, max total claim or max node count is absent
    /// - `InvalidAccountData` if a key field is not a valid public key
    pub fn from_record(record: &RawCampaignRecord) -> Result<Self> {
        let address = required(&record.address, "address", None)?;
        let account = record
            .account
            .as_ref()
            .ok_or_else(|| missing("account", Some(&address)))?;
        let at = Some(address.as_str());

        let mint = required(&account.mint, "mint", at)?;
        let admin = required(&account.admin, "admin", at)?;
        validate_public_key(&address).map_err(|e| invalid_key("address", &address, e))?;
        validate_public_key(&mint).map_err(|e| invalid_key("mint", &address, e))?;
        validate_public_key(&admin).map_err(|e| invalid_key("admin", &address, e))?;

        Ok(Self {
            version: required(&account.version, "version", at)?,
            max_total_claim: required(&account.max_total_claim, "max_total_claim", at)?,
            max_num_nodes: required(&account.max_num_nodes, "max_num_nodes", at)?,
            total_amount_claimed: account.total_amount_claimed.unwrap_or_default(),
            num_nodes_claimed: account.num_nodes_claimed.unwrap_or_default(),
            address,
            mint,
            admin,
        })
    }

    /// Fraction of the claimable supply already claimed, in basis points.
    pub fn claimed_bps(&self) -> u64 {
        if self.max_total_claim.is_zero() {
            return 0;
        }
        let full = U256::from(10_000u64);
        self.total_amount_claimed
            .as_u256()
            .checked_mul(full)
            .map_or(full, |scaled| scaled / self.max_total_claim.as_u256())
            .min(full)
            .as_u64()
    }
}

/// Lifecycle stage of a campaign relative to a clock instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Upcoming,
    Active,
    Ended,
    ClawedBack,
}

/// Full view of a single campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDetail {
    #[serde(flatten)]
    pub summary: CampaignSummary,
    pub merkle_root: Option<String>,
    pub start_ts: Option<i64>,
    pub end_ts: Option<i64>,
    pub clawback_start_ts: Option<i64>,
    pub clawed_back: bool,
}

impl CampaignDetail {
    /// Validate a raw record. Fails the same way as
    /// [`CampaignSummary::from_record`], plus `InvalidAccountData` for a
    /// merkle root that is not 32 hex-encoded bytes.
    pub fn from_record(record: &RawCampaignRecord) -> Result<Self> {
        let summary = CampaignSummary::from_record(record)?;
        // from_record already checked the account is present
        let account = record.account.clone().unwrap_or_default();

        if let Some(root) = &account.merkle_root {
            let bytes = hex::decode(root.trim_start_matches("0x")).ok();
            if bytes.map(|b| b.len()) != Some(32) {
                return Err(ClassifiedError::new(
                    ErrorKind::InvalidAccountData,
                    format!("Campaign {} has a malformed merkle root", summary.address),
                )
                .with_context("address", summary.address.as_str()));
            }
        }

        Ok(Self {
            summary,
            merkle_root: account.merkle_root,
            start_ts: account.start_ts,
            end_ts: account.end_ts,
            clawback_start_ts: account.clawback_start_ts,
            clawed_back: account.clawed_back.unwrap_or(false),
        })
    }

    /// Status at unix time `now`.
    pub fn status(&self, now: i64) -> CampaignStatus {
        if self.clawed_back {
            return CampaignStatus::ClawedBack;
        }
        match (self.start_ts, self.end_ts) {
            (Some(start), _) if now < start => CampaignStatus::Upcoming,
            (_, Some(end)) if now >= end => CampaignStatus::Ended,
            _ => CampaignStatus::Active,
        }
    }

    pub fn is_claimable(&self, now: i64) -> bool {
        self.status(now) == CampaignStatus::Active
    }
}
