//! Optimistic claim tracking.
//!
//! A claim is shown as claimed as soon as it is submitted. The tracker keeps
//! the explicit [`ClaimStatus`] per (campaign, claimant) so a failed
//! submission rolls back through a defined transition.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use dropclaim_core::{
    ClaimStatus, ClassifiedError, ErrorKind, Result, TransactionReceipt, UserAllocation,
};

type ClaimKey = (String, String);

/// Claim statuses for the current process.
#[derive(Default)]
pub struct ClaimTracker {
    claims: Mutex<HashMap<ClaimKey, ClaimStatus>>,
}

impl ClaimTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClaimKey, ClaimStatus>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(campaign: &str, claimant: &str) -> ClaimKey {
        (campaign.to_string(), claimant.to_string())
    }

    /// Mark a claim as pending.
    ///
    /// # Errors
    ///
    /// `ValidationError` if a claim for the same pair is already pending or
    /// confirmed. Only a rolled-back claim may be attempted again; a
    /// confirmed one stays blocked until [`ClaimTracker::clear`] is called.
    pub fn begin(&self, campaign: &str, claimant: &str) -> Result<()> {
        let mut claims = self.lock();
        let key = Self::key(campaign, claimant);
        let message = match claims.get(&key) {
            Some(ClaimStatus::Pending { .. }) => Some("A claim for this campaign is already in progress"),
            Some(ClaimStatus::Confirmed { .. }) => Some("This allocation has already been claimed"),
            _ => None,
        };
        if let Some(message) = message {
            return Err(ClassifiedError::new(ErrorKind::ValidationError, message)
                .with_context("campaign", campaign));
        }
        claims.insert(key, ClaimStatus::pending());
        Ok(())
    }

    /// `Pending` → `Confirmed`.
    pub fn confirm(&self, campaign: &str, claimant: &str, receipt: TransactionReceipt) -> Result<ClaimStatus> {
        info!(campaign, transaction_id = %receipt.transaction_id, "claim confirmed");
        self.transition(campaign, claimant, |status| status.confirm(receipt))
    }

    /// `Pending` → `RolledBack`.
    pub fn roll_back(&self, campaign: &str, claimant: &str, error: ClassifiedError) -> Result<ClaimStatus> {
        info!(campaign, kind = %error.kind(), "claim rolled back");
        self.transition(campaign, claimant, |status| status.roll_back(error))
    }

    fn transition(
        &self,
        campaign: &str,
        claimant: &str,
        step: impl FnOnce(ClaimStatus) -> Result<ClaimStatus>,
    ) -> Result<ClaimStatus> {
        let mut claims = self.lock();
        let key = Self::key(campaign, claimant);
        let current = claims.remove(&key).ok_or_else(|| {
            ClassifiedError::new(ErrorKind::Internal, "No claim is being tracked for this campaign")
                .with_context("campaign", campaign)
        })?;
        let restore = current.clone();
        match step(current) {
            Ok(next) => {
                claims.insert(key, next.clone());
                Ok(next)
            }
            Err(err) => {
                claims.insert(key, restore);
                Err(err)
            }
        }
    }

    pub fn status(&self, campaign: &str, claimant: &str) -> Option<ClaimStatus> {
        self.lock().get(&Self::key(campaign, claimant)).cloned()
    }

    /// Overlay the tracked status on a fetched allocation.
    ///
    /// Pending and confirmed claims read as fully claimed; rolled-back or
    /// untracked ones show the fetched data unchanged.
    pub fn optimistic_view(
        &self,
        campaign: &str,
        claimant: &str,
        fetched: Option<UserAllocation>,
    ) -> Option<UserAllocation> {
        match self.status(campaign, claimant) {
            Some(status) if status.shows_claimed() => fetched.map(|a| a.as_claimed()),
            _ => fetched,
        }
    }

    /// Forget a terminal claim. Pending claims are kept.
    pub fn clear(&self, campaign: &str, claimant: &str) -> bool {
        let mut claims = self.lock();
        let key = Self::key(campaign, claimant);
        match claims.get(&key) {
            Some(status) if status.is_terminal() => claims.remove(&key).is_some(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation() -> UserAllocation {
        UserAllocation {
            total_allocation: 100u64.into(),
            claimed_amount: 0u64.into(),
            is_claimed: false,
        }
    }

    #[test]
    fn test_pending_shows_claimed() {
        let tracker = ClaimTracker::new();
        tracker.begin("c", "u").unwrap();
        let view = tracker.optimistic_view("c", "u", Some(allocation())).unwrap();
        assert!(view.is_claimed);
    }

    #[test]
    fn test_double_begin_is_rejected() {
        let tracker = ClaimTracker::new();
        tracker.begin("c", "u").unwrap();
        let err = tracker.begin("c", "u").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_begin_after_confirm_is_rejected() {
        let tracker = ClaimTracker::new();
        tracker.begin("c", "u").unwrap();
        tracker
            .confirm("c", "u", TransactionReceipt { transaction_id: "tx".into() })
            .unwrap();
        let err = tracker.begin("c", "u").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(matches!(
            tracker.status("c", "u"),
            Some(ClaimStatus::Confirmed { .. })
        ));

        assert!(tracker.clear("c", "u"));
        tracker.begin("c", "u").unwrap();
    }

    #[test]
    fn test_rollback_restores_fetched_view() {
        let tracker = ClaimTracker::new();
        tracker.begin("c", "u").unwrap();
        let status = tracker
            .roll_back("c", "u", ClassifiedError::of_kind(ErrorKind::TransactionFailed))
            .unwrap();
        assert!(matches!(status, ClaimStatus::RolledBack { .. }));
        let view = tracker.optimistic_view("c", "u", Some(allocation())).unwrap();
        assert!(!view.is_claimed);

        // a new attempt may start after a rollback
        tracker.begin("c", "u").unwrap();
    }

    #[test]
    fn test_invalid_transition_keeps_status() {
        let tracker = ClaimTracker::new();
        tracker.begin("c", "u").unwrap();
        tracker
            .confirm("c", "u", TransactionReceipt { transaction_id: "tx".into() })
            .unwrap();
        let err = tracker
            .roll_back("c", "u", ClassifiedError::of_kind(ErrorKind::TransactionFailed))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(matches!(
            tracker.status("c", "u"),
            Some(ClaimStatus::Confirmed { .. })
        ));
    }

    #[test]
    fn test_untracked_transition_fails() {
        let tracker = ClaimTracker::new();
        let err = tracker
            .confirm("c", "u", TransactionReceipt { transaction_id: "tx".into() })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_clear_only_terminal() {
        let tracker = ClaimTracker::new();
        tracker.begin("c", "u").unwrap();
        assert!(!tracker.clear("c", "u"));
        tracker
            .confirm("c", "u", TransactionReceipt { transaction_id: "tx".into() })
            .unwrap();
        assert!(tracker.clear("c", "u"));
        assert!(tracker.status("c", "u").is_none());
    }
}
