//! Chain-data source contract.
//!
//! Account decoding, proof handling and transaction building belong to the
//! distributor SDK behind this trait. Implementations report failures as
//! boxed errors; the client classifies them.

use async_trait::async_trait;

use dropclaim_core::{
    CampaignFilter, ClaimRequest, RawCampaignRecord, RawClaimRecord, TransactionReceipt,
    WalletHandle,
};

/// Error type returned by data sources.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for data-source calls.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Read and write access to on-chain distributor accounts.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// All campaigns matching `filter`. May include malformed records.
    async fn search_campaigns(&self, filter: &CampaignFilter) -> SourceResult<Vec<RawCampaignRecord>>;

    /// Campaign records for the given addresses. Unknown addresses are
    /// simply missing from the result.
    async fn get_campaign_records(&self, addresses: &[String]) -> SourceResult<Vec<RawCampaignRecord>>;

    /// Deterministic claim-record key for a campaign and user.
    ///
    /// Fails on malformed keys.
    fn derive_claim_key(&self, campaign: &str, user: &str) -> SourceResult<String>;

    /// The claim record at `claim_key`, or `None` if the user has no
    /// allocation in that campaign.
    async fn get_claim_record(&self, claim_key: &str) -> SourceResult<Option<RawClaimRecord>>;

    /// Submit a claim signed by `wallet`.
    async fn submit_claim(
        &self,
        request: &ClaimRequest,
        wallet: &WalletHandle,
    ) -> SourceResult<TransactionReceipt>;
}
