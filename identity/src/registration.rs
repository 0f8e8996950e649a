//! Registration and email verification.

use crate::actions::LifecycleAction;
use crate::config::{IdentityConfig, PasswordPolicy};
use crate::effects::LifecycleEffect;
use crate::environment::LifecycleEnvironment;
use crate::error::{IdentityError, Result};
use crate::links::{ApprovalLinkSigner, LinkAction};
use crate::notices;
use crate::otc::{OtcReceipt, OtcService};
use crate::password::PasswordHasher;
use crate::providers::IdentityRepository;
use crate::reducers::LifecycleReducer;
use crate::state::{Identity, IdentityView, LifecycleState, OtcPurpose};
use airena_core::environment::Clock;
use airena_core::reducer::Reducer;
use airena_core::{IdentityId, Role};
use airena_mail::{EmailDispatcher, Mailer, is_valid_email, normalize_email};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registration input.
#[derive(Clone, Deserialize)]
pub struct RegisterRequest {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Requested role, PARTICIPANT when absent.
    #[serde(default)]
    pub role: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// A new, unverified identity and its first code.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    /// The created identity.
    pub identity: IdentityView,
    /// The verification code sent to it.
    pub otc: OtcReceipt,
}

/// Result of a successful email verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    /// The identity after verification.
    pub identity: IdentityView,
    /// `PendingApproval` for an unapproved HOST, active otherwise.
    pub state: LifecycleState,
}

/// Owns the identity lifecycle: registration and email verification.
pub struct IdentityStateMachine<R, M> {
    repo: Arc<R>,
    otc: Arc<OtcService<R, M>>,
    mail: EmailDispatcher<M>,
    links: Arc<ApprovalLinkSigner>,
    env: LifecycleEnvironment,
    password: PasswordPolicy,
    clock: Arc<dyn Clock>,
}

impl<R, M> IdentityStateMachine<R, M>
where
    R: IdentityRepository + 'static,
    M: Mailer + 'static,
{
    /// Create the state machine.
    #[must_use]
    pub fn new(
        repo: Arc<R>,
        otc: Arc<OtcService<R, M>>,
        mail: EmailDispatcher<M>,
        links: Arc<ApprovalLinkSigner>,
        config: &IdentityConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            otc,
            mail,
            links,
            env: LifecycleEnvironment::new(&config.admin_emails),
            password: config.password,
            clock,
        }
    }

    /// Lifecycle policy inputs.
    #[must_use]
    pub const fn environment(&self) -> &LifecycleEnvironment {
        &self.env
    }

    fn validate(&self, request: &RegisterRequest) -> Result<(String, String, Role)> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(IdentityError::Validation("Invalid email address".into()));
        }
        if request.password.chars().count() < self.password.min_length {
            return Err(IdentityError::Validation(format!(
                "Password must be at least {} characters",
                self.password.min_length
            )));
        }
        let name = request.name.trim();
        if name.is_empty() {
            return Err(IdentityError::Validation("Name is required".into()));
        }
        let role = match request.role.as_deref().map(str::trim) {
            None | Some("") => Role::Participant,
            Some(role) => role
                .parse()
                .map_err(|e: airena_core::RoleParseError| IdentityError::Validation(e.to_string()))?,
        };
        Ok((email, name.to_string(), role))
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = PasswordHasher::new(self.password.iterations);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| IdentityError::Internal(format!("Password hashing failed: {e}")))
    }

    /// Register a new identity and send its first verification code.
    ///
    /// Configured administrator emails become ADMIN regardless of the
    /// requested role; ORGANIZER is stored as HOST.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::Validation`] for a malformed email, short password,
    ///   empty name or unknown role
    /// - [`IdentityError::AdminRoleNotAssignable`] when ADMIN is requested
    /// - [`IdentityError::EmailAlreadyRegistered`] when the email is taken
    #[tracing::instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<Registration> {
        let (email, name, requested_role) = self.validate(&request)?;

        let mut lifecycle = self
            .repo
            .find_by_email(&email)
            .await?
            .map(|existing| existing.lifecycle())
            .unwrap_or_default();

        let effects = LifecycleReducer.reduce(
            &mut lifecycle,
            LifecycleAction::Register {
                email: email.clone(),
                requested_role,
            },
            &self.env,
        )?;
        let role = lifecycle
            .role
            .ok_or_else(|| IdentityError::Internal("Registration produced no role".into()))?;

        let password_hash = self.hash_password(request.password).await?;
        let identity = Identity::new(email, password_hash, name, role, self.clock.now());
        self.repo.insert(&identity).await?;
        tracing::info!(identity_id = %identity.id, %role, "Identity registered");

        let mut otc = None;
        for effect in effects {
            if effect == LifecycleEffect::IssueOtc {
                otc = Some(self.otc.issue(identity.id, OtcPurpose::EmailVerification).await?);
            }
        }
        let otc = otc.ok_or_else(|| IdentityError::Internal("Registration issued no code".into()))?;

        Ok(Registration {
            identity: identity.view(),
            otc,
        })
    }

    /// Verify the email of `id` with an email verification code.
    ///
    /// A HOST that is not yet approved is surfaced for administrator review
    /// the first time it verifies; no credential is issued here. Login
    /// challenge codes are not accepted.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::IdentityNotFound`] for an unknown identity
    /// - [`IdentityError::InvalidOtc`] when the code is missing, expired, wrong
    ///   or was issued for a login
    #[tracing::instrument(skip(self, code))]
    pub async fn verify_email(&self, id: IdentityId, code: &str) -> Result<VerificationOutcome> {
        self.confirm_code(id, code, OtcPurpose::EmailVerification).await
    }

    /// Spend a code issued for `purpose` and apply the email verification
    /// it proves.
    pub(crate) async fn confirm_code(
        &self,
        id: IdentityId,
        code: &str,
        purpose: OtcPurpose,
    ) -> Result<VerificationOutcome> {
        let Some(mut identity) = self.otc.consume(id, code, purpose).await? else {
            return Err(IdentityError::InvalidOtc);
        };

        let mut lifecycle = identity.lifecycle();
        let effects = LifecycleReducer.reduce(&mut lifecycle, LifecycleAction::VerifyEmail, &self.env)?;
        tracing::info!(identity_id = %id, "Email verified");

        for effect in effects {
            if effect == LifecycleEffect::RequestHostReview {
                let now = self.clock.now();
                if self.repo.mark_host_review_requested(id, now).await? {
                    identity.host_requested_at = Some(now);
                    tracing::info!(identity_id = %id, "Host review requested");
                    self.notify_admins(&identity, now).await;
                }
            }
        }

        Ok(VerificationOutcome {
            state: identity.state(),
            identity: identity.view(),
        })
    }

    /// [`IdentityStateMachine::verify_email`] addressed by email.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidOtc`] for an unknown email, otherwise
    /// as [`IdentityStateMachine::verify_email`].
    pub async fn verify_email_by_address(&self, email: &str, code: &str) -> Result<VerificationOutcome> {
        let identity = self
            .repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(IdentityError::InvalidOtc)?;
        self.verify_email(identity.id, code).await
    }

    /// Issue a fresh email verification code to the identity registered
    /// under `email`.
    ///
    /// The code can only verify the email; it never completes a login.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::IdentityNotFound`] for an unknown email.
    pub async fn send_otc(&self, email: &str) -> Result<OtcReceipt> {
        let identity = self
            .repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(IdentityError::IdentityNotFound)?;
        self.otc.issue(identity.id, OtcPurpose::EmailVerification).await
    }

    /// Look up an identity.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::IdentityNotFound`] for an unknown identity.
    pub async fn identity(&self, id: IdentityId) -> Result<Identity> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::IdentityNotFound)
    }

    /// Make sure `email` exists as a verified ADMIN.
    ///
    /// Returns `false` when an identity with that email already exists; it
    /// is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Validation`] when `email` is not a configured
    /// administrator address, or a storage error.
    #[tracing::instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> Result<bool> {
        let email = normalize_email(email);
        if !self.env.is_admin_email(&email) {
            return Err(IdentityError::Validation(format!("{email} is not an administrator address")));
        }
        if self.repo.find_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let password_hash = self.hash_password(password.to_string()).await?;
        let mut admin = Identity::new(email, password_hash, name.to_string(), Role::Admin, self.clock.now());
        admin.email_verified = true;

        match self.repo.insert(&admin).await {
            Ok(()) => {
                tracing::info!(identity_id = %admin.id, "Administrator account created");
                Ok(true)
            }
            Err(IdentityError::EmailAlreadyRegistered) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Send every administrator a review request with signed links.
    ///
    /// Returns how many were delivered; failures are logged only.
    async fn notify_admins(&self, host: &Identity, requested_at: DateTime<Utc>) -> usize {
        let admins = self.env.admin_emails();
        if admins.is_empty() {
            tracing::warn!(identity_id = %host.id, "No administrators configured to review host request");
            return 0;
        }

        let links = self
            .links
            .url(host.id, LinkAction::Approve)
            .and_then(|approve| Ok((approve, self.links.url(host.id, LinkAction::Reject)?)));
        let (approve_url, reject_url) = match links {
            Ok(urls) => urls,
            Err(error) => {
                tracing::error!(identity_id = %host.id, %error, "Could not sign approval links");
                return 0;
            }
        };

        let mut delivered = 0;
        for admin in admins {
            let message = notices::host_request(admin, host, requested_at, &approve_url, &reject_url);
            match self.mail.send(&message).await {
                Ok(()) => delivered += 1,
                Err(error) => {
                    tracing::warn!(identity_id = %host.id, recipient = %admin, %error, "Host review request not delivered");
                }
            }
        }
        delivered
    }
}

