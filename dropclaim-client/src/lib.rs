//! # Dropclaim Client
//!
//! **Campaign browsing, batched allocation lookups and optimistic claims**
//!
//! [`AirdropClient`] sits on top of any [`ChainDataSource`]. Every read and
//! write goes through the operation wrapper from `dropclaim-core`, so callers
//! only ever see an [`OperationResult`](dropclaim_core::OperationResult).
//! Reads can also be consumed as cached [`Query`] handles.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dropclaim_client::{AirdropClient, ClientConfig, SnapshotSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = SnapshotSource::load("snapshot.json").expect("snapshot");
//!     let client = AirdropClient::new(source, ClientConfig::from_env());
//!
//!     let user = "So11111111111111111111111111111111111111112";
//!     let campaigns = ["11111111111111111111111111111111"];
//!     let batch = client.get_batch_user_allocations(campaigns, Some(user)).await;
//!
//!     if let Some(batch) = batch.data() {
//!         for (campaign, allocation) in batch.iter() {
//!             println!("{}: {:?}", campaign, allocation);
//!         }
//!     }
//! }
//! ```

pub mod batch;
pub mod claim;
pub mod client;
pub mod config;
pub mod query;
pub mod snapshot;
pub mod source;

// Re-export main types for convenience
pub use batch::{fetch_batch, BatchAllocations};
pub use claim::ClaimTracker;
pub use client::{build_campaign_list, AirdropClient};
pub use config::ClientConfig;
pub use query::{Query, QueryCache, QueryKey, QueryPolicy, QueryState};
pub use snapshot::{Snapshot, SnapshotClaim, SnapshotSource};
pub use source::{ChainDataSource, SourceError, SourceResult};
