//! One-time codes.
//!
//! # Security
//!
//! - Codes are 6 digits sampled uniformly from `100000..=999999`
//! - Only an HMAC-SHA256 of `(identity, code)` is stored
//! - One pending code per identity; issuing replaces the previous one
//! - Every code carries an [`OtcPurpose`] and is only accepted for it
//! - Single use: a match clears the code in the same write that verifies
//!   the email, so concurrent verifications cannot both succeed
//! - Expired codes are cleared when a verification attempt notices them
//!
//! Attempts are unlimited unless [`OtcConfig::max_failed_attempts`] is set.

use crate::config::OtcConfig;
use crate::error::{IdentityError, Result};
use crate::notices;
use crate::providers::IdentityRepository;
use crate::state::{Identity, OtcPurpose, PendingOtc};
use airena_core::IdentityId;
use airena_core::environment::Clock;
use airena_mail::{EmailDispatcher, Mailer};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// A freshly generated code and its stored form.
///
/// The plaintext only lives long enough to be emailed.
pub struct PreparedOtc {
    code: String,
    pending: PendingOtc,
}

impl PreparedOtc {
    /// What gets persisted.
    #[must_use]
    pub const fn pending(&self) -> &PendingOtc {
        &self.pending
    }
}

impl std::fmt::Debug for PreparedOtc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedOtc")
            .field("expires_at", &self.pending.expires_at)
            .finish_non_exhaustive()
    }
}

/// Result of issuing a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OtcReceipt {
    /// When the code stops working.
    pub expires_at: DateTime<Utc>,
    /// Whether the email went out. Delivery failure does not undo issuance.
    pub delivered: bool,
}

/// Issues and verifies one-time codes.
pub struct OtcService<R, M> {
    repo: Arc<R>,
    mail: EmailDispatcher<M>,
    config: OtcConfig,
    clock: Arc<dyn Clock>,
}

impl<R, M> OtcService<R, M>
where
    R: IdentityRepository,
    M: Mailer,
{
    /// Create the service.
    #[must_use]
    pub fn new(repo: Arc<R>, mail: EmailDispatcher<M>, config: OtcConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            mail,
            config,
            clock,
        }
    }

    fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..=999_999_u32).to_string()
    }

    /// One-way hash of a code, bound to its identity.
    fn hash(&self, id: IdentityId, code: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .map_err(|e| IdentityError::Internal(format!("Verification code key rejected: {e}")))?;
        mac.update(id.to_string().as_bytes());
        mac.update(b":");
        mac.update(code.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Generate a code for `id` without storing or sending it.
    ///
    /// Used when the code must be persisted together with another change
    /// (host approval); follow with [`OtcService::deliver`].
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Internal`] if the code cannot be hashed.
    pub fn prepare(&self, id: IdentityId, purpose: OtcPurpose) -> Result<PreparedOtc> {
        let code = Self::generate_code();
        let pending = PendingOtc {
            code_hash: self.hash(id, &code)?,
            purpose,
            expires_at: self.clock.now() + self.config.ttl,
        };
        Ok(PreparedOtc { code, pending })
    }

    /// Email a prepared code. Failures are logged and reported as `false`.
    pub async fn deliver(&self, identity: &Identity, prepared: &PreparedOtc) -> bool {
        let message = notices::otc(&identity.email, &prepared.code, self.config.ttl.num_minutes());
        match self.mail.send(&message).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(identity_id = %identity.id, %error, "Verification code email not delivered");
                false
            }
        }
    }

    /// Issue a new code, invalidating any pending one, and email it.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::IdentityNotFound`] for an unknown identity, or
    /// a storage error.
    pub async fn issue(&self, id: IdentityId, purpose: OtcPurpose) -> Result<OtcReceipt> {
        let identity = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::IdentityNotFound)?;

        let prepared = self.prepare(id, purpose)?;
        if !self.repo.store_otc(id, prepared.pending(), self.clock.now()).await? {
            return Err(IdentityError::IdentityNotFound);
        }
        tracing::info!(
            identity_id = %id,
            %purpose,
            expires_at = %prepared.pending.expires_at,
            "Verification code issued"
        );

        let delivered = self.deliver(&identity, &prepared).await;
        Ok(OtcReceipt {
            expires_at: prepared.pending.expires_at,
            delivered,
        })
    }

    /// Verify a submitted code issued for `purpose`.
    ///
    /// Returns `true` exactly once per issued code.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::IdentityNotFound`] for an unknown identity, or
    /// a storage error.
    pub async fn verify(&self, id: IdentityId, code: &str, purpose: OtcPurpose) -> Result<bool> {
        Ok(self.consume(id, code, purpose).await?.is_some())
    }

    /// Verify a submitted code issued for `purpose` and return the updated
    /// identity on success.
    ///
    /// A code issued for another purpose is refused and left pending.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::IdentityNotFound`] for an unknown identity, or
    /// a storage error.
    pub async fn consume(&self, id: IdentityId, code: &str, purpose: OtcPurpose) -> Result<Option<Identity>> {
        let identity = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::IdentityNotFound)?;

        let Some(pending) = identity.otc else {
            tracing::warn!(identity_id = %id, "Verification attempted with no pending code");
            return Ok(None);
        };

        let now = self.clock.now();
        if pending.is_expired(now) {
            self.repo.clear_expired_otc(id, now).await?;
            tracing::warn!(identity_id = %id, "Verification code expired");
            return Ok(None);
        }

        if pending.purpose != purpose {
            tracing::warn!(identity_id = %id, pending = %pending.purpose, requested = %purpose, "Verification code issued for another purpose");
            return Ok(None);
        }

        let submitted = self.hash(id, code.trim())?;
        if !constant_time_eq::constant_time_eq(submitted.as_bytes(), pending.code_hash.as_bytes()) {
            self.record_mismatch(id, &pending).await?;
            return Ok(None);
        }

        let consumed = self.repo.consume_otc(id, &submitted, purpose, now).await?;
        if consumed.is_some() {
            tracing::info!(identity_id = %id, "Verification code accepted");
        } else {
            tracing::warn!(identity_id = %id, "Verification code already consumed");
        }
        Ok(consumed)
    }

    async fn record_mismatch(&self, id: IdentityId, pending: &PendingOtc) -> Result<()> {
        tracing::warn!(identity_id = %id, "Verification code mismatch");

        let Some(limit) = self.config.max_failed_attempts else {
            return Ok(());
        };

        let attempts = self.repo.record_failed_otc_attempt(id, &pending.code_hash).await?;
        if attempts >= limit && self.repo.clear_otc(id, &pending.code_hash).await? {
            tracing::warn!(identity_id = %id, attempts, "Too many failed attempts, verification code discarded");
        }
        Ok(())
    }
}
