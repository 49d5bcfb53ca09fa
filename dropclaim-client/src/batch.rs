//! Batched allocation lookups.
//!
//! One user, many campaigns: every lookup is issued at once and joined, and
//! each one sits behind its own result boundary so a single bad campaign
//! degrades to an absent entry instead of failing the batch.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use dropclaim_core::{
    classify, operation, ClassifiedError, ErrorContext, OperationResult, Result, UserAllocation,
};

use crate::source::ChainDataSource;

/// Allocation per campaign for one user.
///
/// Every requested campaign is a key; `None` marks no allocation or a failed
/// lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchAllocations {
    entries: BTreeMap<String, Option<UserAllocation>>,
}

impl BatchAllocations {
    /// Allocation for `campaign`, if it was requested and found.
    pub fn allocation(&self, campaign: &str) -> Option<&UserAllocation> {
        self.entries.get(campaign).and_then(Option::as_ref)
    }

    /// Whether `campaign` was part of the batch.
    pub fn contains(&self, campaign: &str) -> bool {
        self.entries.contains_key(campaign)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of campaigns with an allocation.
    pub fn found(&self) -> usize {
        self.entries.values().filter(|a| a.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&UserAllocation>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn into_inner(self) -> BTreeMap<String, Option<UserAllocation>> {
        self.entries
    }
}

impl FromIterator<(String, Option<UserAllocation>)> for BatchAllocations {
    fn from_iter<I: IntoIterator<Item = (String, Option<UserAllocation>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Look up `user`'s allocation in every campaign of `campaigns`.
///
/// # Errors
///
/// `WalletNotConnected` if `user` is absent or blank, before any lookup.
/// No other failure escapes: per-campaign failures become `None` entries.
pub async fn fetch_batch<S, I, K>(source: &S, campaigns: I, user: Option<&str>) -> Result<BatchAllocations>
where
    S: ChainDataSource + ?Sized,
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let user = user
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(ClassifiedError::wallet_not_connected)?;

    let campaigns: BTreeSet<String> = campaigns
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect();
    if campaigns.is_empty() {
        return Ok(BatchAllocations::default());
    }

    let requested = campaigns.len();
    let lookups = campaigns.into_iter().map(|campaign| async move {
        let allocation = lookup_allocation(source, &campaign, user).await;
        (campaign, allocation)
    });
    let batch: BatchAllocations = join_all(lookups).await.into_iter().collect();

    debug!(requested, found = batch.found(), "batch allocation lookup finished");
    Ok(batch)
}

async fn lookup_allocation<S>(source: &S, campaign: &str, user: &str) -> Option<UserAllocation>
where
    S: ChainDataSource + ?Sized,
{
    let mut context = ErrorContext::new();
    context.insert("campaign".into(), campaign.into());

    let claim_key = match source.derive_claim_key(campaign, user) {
        Ok(key) => key,
        Err(e) => {
            let err = classify(e, context);
            warn!(campaign, kind = %err.kind(), "claim key derivation failed: {}", err.message());
            return None;
        }
    };
    context.insert("claim_key".into(), claim_key.as_str().into());

    let result = operation::run("get_claim_record", context, || async {
        match source.get_claim_record(&claim_key).await {
            Ok(Some(record)) => UserAllocation::from_record(&record).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(classify(e, ErrorContext::new())),
        }
    })
    .await;

    match result {
        OperationResult::Success(allocation) => allocation,
        OperationResult::Failure(_) => None,
    }
}
