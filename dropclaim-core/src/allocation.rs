//! Per-user allocations.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{ClassifiedError, ErrorKind, Result};

/// Claim record as returned by the chain-data source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawClaimRecord {
    pub claimant: Option<String>,
    pub total_amount: Option<Amount>,
    pub claimed_amount: Option<Amount>,
    pub is_claimed: Option<bool>,
}

/// A user's entitlement within one campaign.
///
/// `claimed_amount <= total_allocation` is expected but not enforced here;
/// the chain is the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAllocation {
    pub total_allocation: Amount,
    pub claimed_amount: Amount,
    pub is_claimed: bool,
}

impl UserAllocation {
    /// Build an allocation from a raw claim record.
    ///
    /// A missing total is an error. A missing claimed amount reads as zero,
    /// and a missing claimed flag is derived from the claimed amount.
    pub fn from_record(record: &RawClaimRecord) -> Result<Self> {
        let total_allocation = record.total_amount.ok_or_else(|| {
            ClassifiedError::new(
                ErrorKind::MissingRequiredField,
                "Claim record is missing total_amount",
            )
            .with_context("field", "total_amount")
        })?;
        let claimed_amount = record.claimed_amount.unwrap_or_default();
        let is_claimed = record.is_claimed.unwrap_or(!claimed_amount.is_zero());

        Ok(Self {
            total_allocation,
            claimed_amount,
            is_claimed,
        })
    }

    /// Amount still claimable.
    pub fn remaining(&self) -> Amount {
        self.total_allocation.saturating_sub(self.claimed_amount)
    }

    /// This allocation as it will look once a pending claim lands.
    pub fn as_claimed(&self) -> Self {
        Self {
            total_allocation: self.total_allocation,
            claimed_amount: self.total_allocation,
            is_claimed: true,
        }
    }
}
