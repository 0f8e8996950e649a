//! Signed, expiring approval links.
//!
//! Administrators receive one approve and one reject link per review
//! request. A link token is an HS256 JWT bound to the target identity, the
//! action and the `host-approval` audience, so it cannot be replayed against
//! another host, flipped to the other action, or used as a session.

use crate::config::ApprovalLinkConfig;
use crate::error::{IdentityError, Result};
use airena_core::IdentityId;
use airena_core::environment::Clock;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const AUDIENCE: &str = "host-approval";

/// What a link does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAction {
    /// Approve the host.
    Approve,
    /// Reject the host.
    Reject,
}

impl LinkAction {
    /// Path segment and claim value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for LinkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkClaims {
    sub: String,
    action: LinkAction,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies approval link tokens.
#[derive(Clone)]
pub struct ApprovalLinkSigner {
    base_url: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::TimeDelta,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ApprovalLinkSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalLinkSigner")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ApprovalLinkSigner {
    /// Create a signer.
    #[must_use]
    pub fn new(config: &ApprovalLinkConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url: config.public_base_url.trim_end_matches('/').to_string(),
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: config.ttl,
            clock,
        }
    }

    /// Sign a token for `action` on `id`. Returns the token and its expiry.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Internal`] if signing fails.
    pub fn sign(&self, id: IdentityId, action: LinkAction) -> Result<(String, DateTime<Utc>)> {
        let now = self.clock.now();
        let expires_at = now + self.ttl;
        let claims = LinkClaims {
            sub: id.to_string(),
            action,
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::Internal(format!("Failed to sign approval link: {e}")))?;
        Ok((token, expires_at))
    }

    /// Full URL for `action` on `id`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Internal`] if signing fails.
    pub fn url(&self, id: IdentityId, action: LinkAction) -> Result<String> {
        let (token, _) = self.sign(id, action)?;
        Ok(format!(
            "{}/api/v1/admin/hosts/{id}/{action}?token={token}",
            self.base_url
        ))
    }

    /// Check that `token` authorizes `action` on `id` right now.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidApprovalLink`] if the token is
    /// malformed, forged, expired, or issued for another identity or action.
    pub fn verify(&self, token: &str, id: IdentityId, action: LinkAction) -> Result<()> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.set_audience(&[AUDIENCE]);

        let claims = decode::<LinkClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::warn!(identity_id = %id, error = %e, "Approval link rejected");
                IdentityError::InvalidApprovalLink
            })?
            .claims;

        if claims.exp <= self.clock.now().timestamp() {
            tracing::warn!(identity_id = %id, "Approval link expired");
            return Err(IdentityError::InvalidApprovalLink);
        }
        if claims.sub != id.to_string() || claims.action != action {
            tracing::warn!(identity_id = %id, %action, "Approval link used for another target");
            return Err(IdentityError::InvalidApprovalLink);
        }
        Ok(())
    }
}
