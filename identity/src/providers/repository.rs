//! Identity repository trait.

use crate::error::Result;
use crate::state::{Identity, OtcPurpose, PendingOtc};
use airena_core::{IdentityId, Role};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Identity storage.
///
/// # Atomicity
///
/// Every method that changes lifecycle flags is a single conditional write:
/// it checks its precondition and applies the change in one step, so two
/// concurrent callers can never both succeed. Implementations backed by SQL
/// express this as one `UPDATE ... WHERE <precondition> RETURNING`.
pub trait IdentityRepository: Send + Sync {
    /// Look up an identity by id.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn find_by_id(&self, id: IdentityId) -> impl Future<Output = Result<Option<Identity>>> + Send;

    /// Look up an identity by normalized email.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn find_by_email(&self, email: &str) -> impl Future<Output = Result<Option<Identity>>> + Send;

    /// Insert a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::IdentityError::EmailAlreadyRegistered`] if the email
    /// is taken, or a storage error.
    fn insert(&self, identity: &Identity) -> impl Future<Output = Result<()>> + Send;

    /// Replace the pending code, resetting the failed-attempt counter.
    ///
    /// Returns `false` if the identity does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn store_otc(
        &self,
        id: IdentityId,
        otc: &PendingOtc,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Atomically consume the pending code.
    ///
    /// Succeeds only if the stored hash equals `code_hash`, the code was
    /// issued for `purpose` and is unexpired at `now`; on success the code is
    /// cleared and the email marked verified, and the updated identity is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn consume_otc(
        &self,
        id: IdentityId,
        code_hash: &str,
        purpose: OtcPurpose,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Identity>>> + Send;

    /// Clear the pending code if it is expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn clear_expired_otc(
        &self,
        id: IdentityId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Count a mismatch against the pending code identified by `code_hash`.
    ///
    /// Returns the new count, or 0 if that code is no longer pending.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn record_failed_otc_attempt(
        &self,
        id: IdentityId,
        code_hash: &str,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Clear the pending code if it is still the one identified by `code_hash`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn clear_otc(&self, id: IdentityId, code_hash: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Set `host_requested_at` if it is not already set.
    ///
    /// Returns `true` only for the caller that set it.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn mark_host_review_requested(
        &self,
        id: IdentityId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Approve a HOST and store its new pending code in one write.
    ///
    /// Applies only to an existing, unapproved HOST; returns `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn approve_host(
        &self,
        id: IdentityId,
        at: DateTime<Utc>,
        otc: &PendingOtc,
    ) -> impl Future<Output = Result<Option<Identity>>> + Send;

    /// Delete an unapproved HOST.
    ///
    /// Returns `false` if no unapproved HOST with that id exists.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn delete_pending_host(&self, id: IdentityId) -> impl Future<Output = Result<bool>> + Send;

    /// Delete any identity that is not an ADMIN.
    ///
    /// Returns `false` if no non-ADMIN identity with that id exists.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn delete_non_admin(&self, id: IdentityId) -> impl Future<Output = Result<bool>> + Send;

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn record_login(&self, id: IdentityId, at: DateTime<Utc>) -> impl Future<Output = Result<()>> + Send;

    /// Unapproved HOSTs surfaced for review, oldest request first.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn pending_host_requests(&self) -> impl Future<Output = Result<Vec<Identity>>> + Send;

    /// Every identity with `role`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn list_by_role(&self, role: Role) -> impl Future<Output = Result<Vec<Identity>>> + Send;
}
