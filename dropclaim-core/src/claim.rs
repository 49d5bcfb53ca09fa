//! Claim requests and claim status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{ClassifiedError, ErrorKind, Result};
use crate::keys::validate_public_key;

/// The signing wallet as seen by this crate: only its public key, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletHandle {
    public_key: Option<String>,
}

impl WalletHandle {
    pub fn connected(public_key: impl Into<String>) -> Self {
        Self {
            public_key: Some(public_key.into()),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn is_connected(&self) -> bool {
        self.public_key().is_some()
    }

    /// The public key, or `WalletNotConnected`.
    pub fn require_connected(&self) -> Result<&str> {
        self.public_key().ok_or_else(ClassifiedError::wallet_not_connected)
    }
}

/// Merkle proof for a claim leaf, as 32-byte sibling hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof(Vec<[u8; 32]>);

impl MerkleProof {
    /// Decode hex nodes (with or without `0x`).
    ///
    /// An empty proof is valid: it is the proof for a single-leaf tree.
    pub fn from_hex_nodes<S: AsRef<str>>(nodes: &[S]) -> Result<Self> {
        nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let node = node.as_ref();
                hex::decode(node.trim_start_matches("0x"))
                    .ok()
                    .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
                    .ok_or_else(|| {
                        ClassifiedError::new(
                            ErrorKind::InvalidDataFormat,
                            format!("Proof node {} is not 32 hex-encoded bytes", index),
                        )
                        .with_context("node", node)
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn nodes(&self) -> &[[u8; 32]] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex_nodes(&self) -> Vec<String> {
        self.0.iter().map(hex::encode).collect()
    }
}

/// Everything the chain-data source needs to submit a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    pub campaign: String,
    pub claimant: String,
    pub amount: Amount,
    pub proof: MerkleProof,
}

impl ClaimRequest {
    /// Check key formats and that the amount is non-zero.
    pub fn validate(&self) -> Result<()> {
        validate_public_key(&self.campaign)?;
        validate_public_key(&self.claimant)?;
        if self.amount.is_zero() {
            return Err(ClassifiedError::new(
                ErrorKind::ValidationError,
                "Nothing left to claim",
            )
            .with_context("campaign", self.campaign.as_str()));
        }
        Ok(())
    }
}

/// Receipt for a submitted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_id: String,
}

/// Status of an optimistic claim.
///
/// `Pending` is shown as claimed immediately; it resolves to `Confirmed` or
/// `RolledBack`, both of which are terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending { submitted_at: DateTime<Utc> },
    Confirmed { transaction_id: String },
    RolledBack { error: ClassifiedError },
}

impl ClaimStatus {
    pub fn pending() -> Self {
        Self::Pending {
            submitted_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    /// Whether the optimistic view should show the allocation as claimed.
    pub fn shows_claimed(&self) -> bool {
        !matches!(self, Self::RolledBack { .. })
    }

    /// `Pending` → `Confirmed`.
    pub fn confirm(self, receipt: TransactionReceipt) -> Result<Self> {
        match self {
            Self::Pending { .. } => Ok(Self::Confirmed {
                transaction_id: receipt.transaction_id,
            }),
            other => Err(Self::bad_transition(&other, "confirm")),
        }
    }

    /// `Pending` → `RolledBack`.
    pub fn roll_back(self, error: ClassifiedError) -> Result<Self> {
        match self {
            Self::Pending { .. } => Ok(Self::RolledBack { error }),
            other => Err(Self::bad_transition(&other, "roll back")),
        }
    }

    fn bad_transition(from: &Self, action: &str) -> ClassifiedError {
        ClassifiedError::new(
            ErrorKind::Internal,
            format!("Cannot {} a claim that is already {:?}", action, from),
        )
    }
}
