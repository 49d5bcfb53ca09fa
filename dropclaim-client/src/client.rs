//! Airdrop client API.
//!
//! Every method returns an [`OperationResult`]; no failure from the data
//! source reaches the caller as an `Err`. Each read also has a `*_query`
//! counterpart backed by the shared [`QueryCache`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use dropclaim_core::{
    classify, operation, validate_public_key, CampaignDetail, CampaignFilter, CampaignSummary,
    ClaimRequest, ClassifiedError, ErrorContext, ErrorKind, MerkleProof, OperationResult,
    RawCampaignRecord, Result, RetryConfig, TransactionReceipt, UserAllocation, WalletHandle,
};

use crate::batch::{fetch_batch, BatchAllocations};
use crate::claim::ClaimTracker;
use crate::config::ClientConfig;
use crate::query::{Query, QueryCache, QueryKey, QueryPolicy};
use crate::source::ChainDataSource;

pub const OP_CAMPAIGN_LIST: &str = "get_campaign_list";
pub const OP_CAMPAIGN_DETAIL: &str = "get_campaign_detail";
pub const OP_USER_ALLOCATION: &str = "get_user_allocation";
pub const OP_BATCH_ALLOCATIONS: &str = "get_batch_user_allocations";
pub const OP_SUBMIT_CLAIM: &str = "submit_claim";

/// Client for browsing campaigns and claiming allocations.
///
/// # Example
///
/// ```rust,no_run
/// use dropclaim_client::{AirdropClient, ClientConfig, SnapshotSource};
/// use dropclaim_core::CampaignFilter;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = SnapshotSource::load("snapshot.json")?;
///     let client = AirdropClient::new(source, ClientConfig::from_env());
///
///     let campaigns = client
///         .get_campaign_list(&CampaignFilter::default(), Some(10))
///         .await
///         .into_result()?;
///
///     for campaign in campaigns {
///         println!("{} v{}", campaign.address, campaign.version);
///     }
///     Ok(())
/// }
/// ```
pub struct AirdropClient<S> {
    source: Arc<S>,
    config: ClientConfig,
    cache: Arc<QueryCache>,
    claims: ClaimTracker,
}

impl<S> AirdropClient<S>
where
    S: ChainDataSource + 'static,
{
    /// Create a client with its own query cache.
    pub fn new(source: S, config: ClientConfig) -> Self {
        let cache = Arc::new(QueryCache::new(config.cache_capacity));
        Self::with_cache(Arc::new(source), config, cache)
    }

    /// Create a client sharing an existing source and cache.
    pub fn with_cache(source: Arc<S>, config: ClientConfig, cache: Arc<QueryCache>) -> Self {
        Self {
            source,
            config,
            cache,
            claims: ClaimTracker::new(),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn claims(&self) -> &ClaimTracker {
        &self.claims
    }

    fn effective_limit(&self, limit: Option<usize>) -> Option<usize> {
        limit.or(self.config.default_list_limit)
    }

    /// Campaigns matching `filter`, newest version first, at most `limit`
    /// (or the configured default, if any). Malformed records are dropped with a
    /// warning.
    pub async fn get_campaign_list(
        &self,
        filter: &CampaignFilter,
        limit: Option<usize>,
    ) -> OperationResult<Vec<CampaignSummary>> {
        campaign_list(&*self.source, filter, self.effective_limit(limit), &self.config.retry).await
    }

    /// A single campaign, or `None` if it does not exist.
    pub async fn get_campaign_detail(&self, address: &str) -> OperationResult<Option<CampaignDetail>> {
        campaign_detail(&*self.source, address, &self.config.retry).await
    }

    /// `user`'s allocation in `campaign`, or `None` if they have none.
    pub async fn get_user_allocation(
        &self,
        campaign: &str,
        user: Option<&str>,
    ) -> OperationResult<Option<UserAllocation>> {
        user_allocation(&*self.source, campaign, user, &self.config.retry).await
    }

    /// [`AirdropClient::get_user_allocation`] with any tracked claim
    /// overlaid.
    pub async fn allocation_view(
        &self,
        campaign: &str,
        user: Option<&str>,
    ) -> OperationResult<Option<UserAllocation>> {
        let result = self.get_user_allocation(campaign, user).await;
        match user {
            Some(user) => result.map(|fetched| self.claims.optimistic_view(campaign, user, fetched)),
            None => result,
        }
    }

    /// `user`'s allocation in every campaign of `campaigns`.
    pub async fn get_batch_user_allocations<I, K>(
        &self,
        campaigns: I,
        user: Option<&str>,
    ) -> OperationResult<BatchAllocations>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        batch_allocations(&*self.source, campaigns, user).await
    }

    /// Claim the remaining allocation in `campaign` for the wallet's key.
    ///
    /// The claim is tracked as pending while the transaction is submitted,
    /// then confirmed or rolled back. Cached allocations are invalidated on
    /// confirmation.
    pub async fn submit_claim(
        &self,
        campaign: &str,
        wallet: &WalletHandle,
        proof: MerkleProof,
    ) -> OperationResult<TransactionReceipt> {
        let mut context = ErrorContext::new();
        context.insert("campaign".into(), campaign.into());

        operation::run(OP_SUBMIT_CLAIM, context, move || async move {
            let claimant = wallet.require_connected()?;
            let allocation = user_allocation(&*self.source, campaign, Some(claimant), &self.config.retry)
                .await
                .into_result()?
                .ok_or_else(|| {
                    ClassifiedError::new(
                        ErrorKind::AccountNotFound,
                        "This wallet has no allocation in the campaign",
                    )
                })?;
            if allocation.is_claimed {
                return Err(ClassifiedError::new(
                    ErrorKind::ValidationError,
                    "This allocation has already been claimed",
                ));
            }

            let request = ClaimRequest {
                campaign: campaign.to_string(),
                claimant: claimant.to_string(),
                amount: allocation.remaining(),
                proof,
            };
            request.validate()?;

            self.claims.begin(campaign, claimant)?;
            info!(campaign, claimant, amount = %request.amount, "submitting claim");

            match self.source.submit_claim(&request, wallet).await {
                Ok(receipt) => {
                    self.claims.confirm(campaign, claimant, receipt.clone())?;
                    self.cache.invalidate_operation(OP_USER_ALLOCATION);
                    self.cache.invalidate_operation(OP_BATCH_ALLOCATIONS);
                    self.cache.invalidate_operation(OP_CAMPAIGN_DETAIL);
                    Ok(receipt)
                }
                Err(e) => {
                    let err = classify_submission_failure(e);
                    self.claims.roll_back(campaign, claimant, err.clone())?;
                    Err(err)
                }
            }
        })
        .await
    }

    /// Cached view of [`AirdropClient::get_campaign_list`].
    pub fn campaign_list_query(&self, filter: CampaignFilter, limit: Option<usize>) -> Query<Vec<CampaignSummary>> {
        let limit = self.effective_limit(limit);
        let key = QueryKey::new(
            OP_CAMPAIGN_LIST,
            [
                filter.mint.clone().unwrap_or_default(),
                filter.admin.clone().unwrap_or_default(),
                limit.map(|l| l.to_string()).unwrap_or_default(),
            ],
        );
        let source = self.source.clone();
        Query::new(key, QueryPolicy::campaign_list(), self.cache.clone(), move || {
            let source = source.clone();
            let filter = filter.clone();
            async move {
                campaign_list(&*source, &filter, limit, &RetryConfig::none())
                    .await
                    .into_result()
            }
        })
    }

    /// Cached view of [`AirdropClient::get_campaign_detail`].
    pub fn campaign_detail_query(&self, address: &str) -> Query<Option<CampaignDetail>> {
        let key = QueryKey::new(OP_CAMPAIGN_DETAIL, [address]);
        let source = self.source.clone();
        let address = address.to_string();
        Query::new(key, QueryPolicy::campaign_detail(), self.cache.clone(), move || {
            let source = source.clone();
            let address = address.clone();
            async move {
                campaign_detail(&*source, &address, &RetryConfig::none())
                    .await
                    .into_result()
            }
        })
    }

    /// Cached view of [`AirdropClient::get_user_allocation`].
    pub fn user_allocation_query(&self, campaign: &str, user: Option<&str>) -> Query<Option<UserAllocation>> {
        let key = QueryKey::new(OP_USER_ALLOCATION, [campaign, user.unwrap_or_default()]);
        let source = self.source.clone();
        let campaign = campaign.to_string();
        let user = user.map(str::to_string);
        Query::new(key, QueryPolicy::user_allocation(), self.cache.clone(), move || {
            let source = source.clone();
            let campaign = campaign.clone();
            let user = user.clone();
            async move {
                user_allocation(&*source, &campaign, user.as_deref(), &RetryConfig::none())
                    .await
                    .into_result()
            }
        })
    }

    /// Cached view of [`AirdropClient::get_batch_user_allocations`].
    pub fn batch_allocations_query(&self, campaigns: &[String], user: Option<&str>) -> Query<BatchAllocations> {
        let mut sorted = campaigns.to_vec();
        sorted.sort();
        sorted.dedup();
        let mut params = vec![user.unwrap_or_default().to_string()];
        params.extend(sorted.iter().cloned());

        let key = QueryKey::new(OP_BATCH_ALLOCATIONS, params);
        let source = self.source.clone();
        let user = user.map(str::to_string);
        Query::new(key, QueryPolicy::batch_allocations(), self.cache.clone(), move || {
            let source = source.clone();
            let campaigns = sorted.clone();
            let user = user.clone();
            async move {
                batch_allocations(&*source, campaigns, user.as_deref())
                    .await
                    .into_result()
            }
        })
    }
}

/// Validate, sort and truncate a campaign listing.
pub fn build_campaign_list(records: &[RawCampaignRecord], limit: Option<usize>) -> Vec<CampaignSummary> {
    let mut campaigns: Vec<CampaignSummary> = records
        .iter()
        .filter_map(|record| match CampaignSummary::from_record(record) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(
                    address = record.address.as_deref().unwrap_or("<none>"),
                    kind = %err.kind(),
                    "dropping malformed campaign record: {}",
                    err.message()
                );
                None
            }
        })
        .collect();

    campaigns.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| a.address.cmp(&b.address)));
    if let Some(limit) = limit {
        campaigns.truncate(limit);
    }
    campaigns
}

async fn campaign_list<S>(
    source: &S,
    filter: &CampaignFilter,
    limit: Option<usize>,
    retry: &RetryConfig,
) -> OperationResult<Vec<CampaignSummary>>
where
    S: ChainDataSource + ?Sized,
{
    let mut context = ErrorContext::new();
    context.insert("mint".into(), filter.mint.clone().into());
    context.insert("admin".into(), filter.admin.clone().into());

    operation::run_with_retry(OP_CAMPAIGN_LIST, context, retry, || source.search_campaigns(filter))
        .await
        .map(|records| {
            let campaigns = build_campaign_list(&records, limit);
            debug!(fetched = records.len(), returned = campaigns.len(), "campaign list built");
            campaigns
        })
}

async fn campaign_detail<S>(source: &S, address: &str, retry: &RetryConfig) -> OperationResult<Option<CampaignDetail>>
where
    S: ChainDataSource + ?Sized,
{
    let mut context = ErrorContext::new();
    context.insert("campaign".into(), address.into());

    operation::run_with_retry(OP_CAMPAIGN_DETAIL, context, retry, move || async move {
        validate_public_key(address)?;
        let addresses = [address.to_string()];
        let records = match source.get_campaign_records(&addresses).await {
            Ok(records) => records,
            Err(e) => return absent_if_not_found(classify(e, ErrorContext::new())),
        };
        records
            .iter()
            .find(|r| r.address.as_deref() == Some(address))
            .map(CampaignDetail::from_record)
            .transpose()
    })
    .await
}

async fn user_allocation<S>(
    source: &S,
    campaign: &str,
    user: Option<&str>,
    retry: &RetryConfig,
) -> OperationResult<Option<UserAllocation>>
where
    S: ChainDataSource + ?Sized,
{
    let mut context = ErrorContext::new();
    context.insert("campaign".into(), campaign.into());

    operation::run_with_retry(OP_USER_ALLOCATION, context, retry, move || async move {
        let user = user
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(ClassifiedError::wallet_not_connected)?;
        validate_public_key(campaign)?;
        validate_public_key(user)?;

        let claim_key = source
            .derive_claim_key(campaign, user)
            .map_err(|e| classify(e, ErrorContext::new()))?;
        match source.get_claim_record(&claim_key).await {
            Ok(Some(record)) => UserAllocation::from_record(&record).map(Some),
            Ok(None) => Ok(None),
            Err(e) => absent_if_not_found(classify(e, ErrorContext::new())),
        }
    })
    .await
}

async fn batch_allocations<S, I, K>(source: &S, campaigns: I, user: Option<&str>) -> OperationResult<BatchAllocations>
where
    S: ChainDataSource + ?Sized,
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let mut context = ErrorContext::new();
    context.insert("user".into(), user.unwrap_or_default().into());

    operation::run(OP_BATCH_ALLOCATIONS, context, || fetch_batch(source, campaigns, user)).await
}

/// Not-found lookups are legitimate absence, not failures.
fn absent_if_not_found<T>(err: ClassifiedError) -> Result<Option<T>> {
    if err.kind().is_not_found() {
        debug!(kind = %err.kind(), "treating not-found as absence");
        Ok(None)
    } else {
        Err(err)
    }
}

/// Claim submissions are not retried, so unrecognised failures are
/// reported as a failed transaction rather than a retryable unknown.
fn classify_submission_failure(e: crate::source::SourceError) -> ClassifiedError {
    let err = classify(e, ErrorContext::new());
    if err.kind() == ErrorKind::Unknown {
        ClassifiedError::new(ErrorKind::TransactionFailed, err.message()).with_context_map(err.context().clone())
    } else {
        err
    }
}
