//! # Dropclaim Core
//!
//! **Error taxonomy, retry policy and operation results for airdrop clients**
//!
//! Failures from the chain-data SDK arrive as untyped errors. This crate maps
//! them into a closed [`ErrorKind`] taxonomy, retries the retryable ones with
//! back-off, and hands callers an [`OperationResult`] instead of an error to
//! propagate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dropclaim_core::{operation, ErrorContext, RetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = operation::run_with_retry(
//!         "fetch_slot",
//!         ErrorContext::new(),
//!         &RetryConfig::default(),
//!         || async { Ok::<u64, std::io::Error>(42) },
//!     )
//!     .await;
//!
//!     match result.error() {
//!         Some(err) => println!("{}", err.user_message()),
//!         None => println!("slot {}", result.data().unwrap()),
//!     }
//! }
//! ```

pub mod allocation;
pub mod amount;
pub mod campaign;
pub mod claim;
pub mod classify;
pub mod error;
pub mod keys;
pub mod operation;
pub mod retry;

// Re-export main types for convenience
pub use allocation::{RawClaimRecord, UserAllocation};
pub use amount::Amount;
pub use campaign::{
    CampaignDetail, CampaignFilter, CampaignStatus, CampaignSummary, RawCampaignRecord,
    RawDistributorAccount,
};
pub use claim::{ClaimRequest, ClaimStatus, MerkleProof, TransactionReceipt, WalletHandle};
pub use classify::{classify, RawFailure};
pub use error::{ClassifiedError, ErrorContext, ErrorKind, Result};
pub use keys::{is_valid_public_key, validate_public_key};
pub use operation::OperationResult;
pub use retry::{with_retry, RetryConfig};
