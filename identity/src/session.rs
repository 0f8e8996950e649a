//! Two-step login and session credentials.
//!
//! ```text
//! login(email, password)   ──► CREDENTIAL_CHECKED ──► OTC_ISSUED
//! complete_login(email, code)                     ──► SESSION_ISSUED
//! ```
//!
//! `login` never returns a credential, whatever the role. Only the
//! [`OtcPurpose::LoginChallenge`] code it issues can complete a login.

use crate::actions::LifecycleAction;
use crate::config::SessionConfig;
use crate::effects::LifecycleEffect;
use crate::error::{IdentityError, Result};
use crate::otc::OtcService;
use crate::password::PasswordHasher;
use crate::providers::IdentityRepository;
use crate::reducers::LifecycleReducer;
use crate::registration::IdentityStateMachine;
use crate::state::{Identity, IdentityView, OtcPurpose};
use airena_core::environment::Clock;
use airena_core::reducer::Reducer;
use airena_core::{IdentityId, Role};
use airena_mail::{Mailer, normalize_email};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Minimum recommended signing key length.
pub const MIN_SECRET_LEN: usize = 32;

/// Claims carried by a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity id.
    pub sub: String,
    /// Email at issuance.
    pub email: String,
    /// Role at issuance.
    pub role: Role,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expires at (seconds since epoch).
    pub exp: i64,
}

impl SessionClaims {
    /// The subject as an identity id.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidSession`] if the subject is not an id.
    pub fn identity_id(&self) -> Result<IdentityId> {
        self.sub.parse().map_err(|_| IdentityError::InvalidSession)
    }

    /// Whether the holder is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A signed session credential.
#[derive(Clone, Serialize)]
pub struct SessionToken {
    /// Bearer token.
    pub access_token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Signs and verifies session credentials (HS256).
#[derive(Clone)]
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Create a signer. Short keys are accepted with a warning.
    #[must_use]
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        if config.secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                length = config.secret.len(),
                minimum = MIN_SECRET_LEN,
                "Session signing key is shorter than recommended"
            );
        }
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: config.ttl,
            clock,
        }
    }

    /// Sign a credential for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Internal`] if signing fails.
    pub fn mint(&self, identity: &Identity) -> Result<SessionToken> {
        let now = self.clock.now();
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::Internal(format!("Failed to sign session: {e}")))?;
        Ok(SessionToken {
            access_token,
            expires_at,
        })
    }

    /// Verify a credential and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidSession`] if the token is malformed,
    /// forged or expired.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|_| IdentityError::InvalidSession)?
            .claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(IdentityError::InvalidSession);
        }
        Ok(claims)
    }
}

/// First half of a login: the password matched and a code was sent.
#[derive(Debug, Clone, Serialize)]
pub struct LoginChallenge {
    /// Identity being logged in.
    pub identity_id: IdentityId,
    /// Where the code was sent.
    pub email: String,
    /// When the code expires.
    pub otc_expires_at: DateTime<Utc>,
    /// Whether the code email went out.
    pub delivered: bool,
}

/// A completed login.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    /// The credential.
    pub token: SessionToken,
    /// The logged-in identity.
    pub identity: IdentityView,
}

/// Turns a fully gated identity into a session credential.
pub struct SessionIssuer<R, M> {
    repo: Arc<R>,
    machine: Arc<IdentityStateMachine<R, M>>,
    otc: Arc<OtcService<R, M>>,
    signer: Arc<SessionSigner>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl<R, M> SessionIssuer<R, M>
where
    R: IdentityRepository + 'static,
    M: Mailer + 'static,
{
    /// Create the issuer.
    #[must_use]
    pub fn new(
        repo: Arc<R>,
        machine: Arc<IdentityStateMachine<R, M>>,
        otc: Arc<OtcService<R, M>>,
        signer: Arc<SessionSigner>,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            machine,
            otc,
            signer,
            hasher,
            clock,
        }
    }

    /// Check the password and send a fresh code. Never returns a credential.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidCredentials`] for an unknown email or
    /// wrong password.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginChallenge> {
        let Some(identity) = self.repo.find_by_email(&normalize_email(email)).await? else {
            tracing::warn!("Login for unknown email");
            return Err(IdentityError::InvalidCredentials);
        };

        let hasher = self.hasher;
        let password = password.to_string();
        let stored = identity.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| IdentityError::Internal(format!("Password check failed: {e}")))?;
        if !matches {
            tracing::warn!(identity_id = %identity.id, "Login with wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        let receipt = self.otc.issue(identity.id, OtcPurpose::LoginChallenge).await?;
        tracing::info!(identity_id = %identity.id, "Password accepted, verification code required");

        Ok(LoginChallenge {
            identity_id: identity.id,
            email: identity.email,
            otc_expires_at: receipt.expires_at,
            delivered: receipt.delivered,
        })
    }

    /// Verify the login code and mint a session.
    ///
    /// Only a code issued by [`SessionIssuer::login`] is accepted. The code is
    /// consumed before the approval gate is checked, so an unapproved HOST
    /// spends its code and gets [`IdentityError::HostApprovalPending`].
    ///
    /// # Errors
    ///
    /// - [`IdentityError::InvalidCredentials`] for an unknown email
    /// - [`IdentityError::InvalidOtc`] for a missing, expired or wrong code,
    ///   or one issued for email verification
    /// - [`IdentityError::HostApprovalPending`] for an unapproved HOST
    #[tracing::instrument(skip(self, code))]
    pub async fn complete_login(&self, email: &str, code: &str) -> Result<IssuedSession> {
        let Some(identity) = self.repo.find_by_email(&normalize_email(email)).await? else {
            tracing::warn!("Login completion for unknown email");
            return Err(IdentityError::InvalidCredentials);
        };

        self.machine
            .confirm_code(identity.id, code, OtcPurpose::LoginChallenge)
            .await?;
        let mut identity = self.machine.identity(identity.id).await?;

        let mut lifecycle = identity.lifecycle();
        let effects = LifecycleReducer.reduce(
            &mut lifecycle,
            LifecycleAction::IssueSession,
            self.machine.environment(),
        )?;

        let mut token = None;
        for effect in effects {
            if effect == LifecycleEffect::MintSession {
                token = Some(self.signer.mint(&identity)?);
            }
        }
        let token = token.ok_or_else(|| IdentityError::Internal("No session minted".into()))?;

        let now = self.clock.now();
        self.repo.record_login(identity.id, now).await?;
        identity.last_login_at = Some(now);
        tracing::info!(identity_id = %identity.id, role = %identity.role, "Session issued");

        Ok(IssuedSession {
            token,
            identity: identity.view(),
        })
    }

    /// Resolve a bearer token to the current identity.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidSession`] if the token is invalid or
    /// its identity no longer exists.
    pub async fn current(&self, token: &str) -> Result<Identity> {
        let claims = self.signer.verify(token)?;
        self.repo
            .find_by_id(claims.identity_id()?)
            .await?
            .ok_or(IdentityError::InvalidSession)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use airena_testing::test_clock;

    fn identity() -> Identity {
        Identity::new(
            "p@example.com".into(),
            "h".into(),
            "P".into(),
            Role::Participant,
            test_clock().now(),
        )
    }

    #[test]
    fn test_minted_session_verifies() {
        let clock = test_clock();
        let signer = SessionSigner::new(&SessionConfig::new("s".repeat(32)), Arc::new(clock.clone()));
        let identity = identity();

        let token = signer.mint(&identity).unwrap();
        let claims = signer.verify(&token.access_token).unwrap();

        assert_eq!(claims.identity_id().unwrap(), identity.id);
        assert_eq!(claims.email, "p@example.com");
        assert_eq!(claims.role, Role::Participant);
        assert_eq!(token.expires_at, clock.now() + TimeDelta::days(7));
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let clock = test_clock();
        let signer = SessionSigner::new(&SessionConfig::new("s".repeat(32)), Arc::new(clock.clone()));
        let token = signer.mint(&identity()).unwrap();

        clock.advance(TimeDelta::days(7));

        assert_eq!(signer.verify(&token.access_token), Err(IdentityError::InvalidSession));
    }

    #[test]
    fn test_short_key_is_accepted() {
        let signer = SessionSigner::new(&SessionConfig::new("short".into()), Arc::new(test_clock()));
        let token = signer.mint(&identity()).unwrap();
        assert!(signer.verify(&token.access_token).is_ok());
    }

    #[test]
    fn test_token_from_other_key_is_rejected() {
        let clock = test_clock();
        let a = SessionSigner::new(&SessionConfig::new("a".repeat(32)), Arc::new(clock.clone()));
        let b = SessionSigner::new(&SessionConfig::new("b".repeat(32)), Arc::new(clock));
        let token = a.mint(&identity()).unwrap();

        assert_eq!(b.verify(&token.access_token), Err(IdentityError::InvalidSession));
        assert_eq!(b.verify("garbage"), Err(IdentityError::InvalidSession));
    }
}
