//! Administrator approval of HOST identities.
//!
//! Approve and reject are reachable through two channels:
//!
//! - an authenticated administrator session
//! - a signed, expiring link emailed to administrators
//!
//! Both converge on [`ApprovalGate`], which only accepts an
//! [`ApprovalAuthority`]. The authority can only be obtained by presenting
//! one of the two credentials.

use crate::actions::LifecycleAction;
use crate::effects::LifecycleEffect;
use crate::environment::LifecycleEnvironment;
use crate::error::{IdentityError, Result};
use crate::links::{ApprovalLinkSigner, LinkAction};
use crate::notices;
use crate::otc::OtcService;
use crate::providers::IdentityRepository;
use crate::reducers::LifecycleReducer;
use crate::session::SessionSigner;
use crate::state::{Identity, IdentityView, OtcPurpose};
use airena_core::IdentityId;
use airena_core::environment::Clock;
use airena_core::reducer::Reducer;
use airena_mail::{EmailDispatcher, Mailer, OutboundEmail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// How an approval decision was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalChannel {
    /// Authenticated administrator session.
    AdminSession,
    /// Signed link from a review request email.
    SignedLink,
}

/// Proof that the caller may decide on host requests.
#[derive(Debug, Clone)]
pub struct ApprovalAuthority {
    channel: ApprovalChannel,
    actor: Option<IdentityId>,
    scope: Option<(IdentityId, LinkAction)>,
}

impl ApprovalAuthority {
    /// Authority from an administrator's session token.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::InvalidSession`] if the token does not verify
    /// - [`IdentityError::AdminRequired`] if the holder is not ADMIN
    pub fn from_admin_session(signer: &SessionSigner, token: &str) -> Result<Self> {
        let claims = signer.verify(token)?;
        if !claims.is_admin() {
            tracing::warn!(subject = %claims.sub, "Non-admin attempted a host decision");
            return Err(IdentityError::AdminRequired);
        }
        Ok(Self {
            channel: ApprovalChannel::AdminSession,
            actor: Some(claims.identity_id()?),
            scope: None,
        })
    }

    /// Authority from a signed approval link, valid for exactly the
    /// identity and action it was signed for.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidApprovalLink`] if the link does not
    /// verify for `id` and `action`.
    pub fn from_signed_link(
        signer: &ApprovalLinkSigner,
        token: &str,
        id: IdentityId,
        action: LinkAction,
    ) -> Result<Self> {
        signer.verify(token, id, action)?;
        Ok(Self {
            channel: ApprovalChannel::SignedLink,
            actor: None,
            scope: Some((id, action)),
        })
    }

    /// Whether this authority covers `action` on `id`.
    #[must_use]
    pub fn permits(&self, id: IdentityId, action: LinkAction) -> bool {
        self.scope.is_none_or(|scope| scope == (id, action))
    }

    /// The channel that produced this authority.
    #[must_use]
    pub const fn channel(&self) -> ApprovalChannel {
        self.channel
    }

    /// The acting administrator, if this authority is an administrator
    /// session.
    pub(crate) fn require_session(&self) -> Result<Option<IdentityId>> {
        match self.channel {
            ApprovalChannel::AdminSession => Ok(self.actor),
            ApprovalChannel::SignedLink => Err(IdentityError::AdminRequired),
        }
    }

    fn check(&self, id: IdentityId, action: LinkAction) -> Result<()> {
        if self.permits(id, action) {
            Ok(())
        } else {
            Err(IdentityError::AdminRequired)
        }
    }
}

/// Outcome of an approval.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalReceipt {
    /// The approved host.
    pub identity: IdentityView,
    /// When it was approved.
    pub approved_at: DateTime<Utc>,
    /// Expiry of the verification code sent with the approval.
    pub otc_expires_at: DateTime<Utc>,
    /// Whether the code email went out.
    pub otc_delivered: bool,
    /// Whether the approval notice went out.
    pub notice_delivered: bool,
    /// How the decision was authorized.
    pub channel: ApprovalChannel,
}

/// Outcome of a rejection.
#[derive(Debug, Clone, Serialize)]
pub struct RejectionReceipt {
    /// The host as it was before deletion.
    pub identity: IdentityView,
    /// When it was rejected.
    pub rejected_at: DateTime<Utc>,
    /// Whether the rejection notice went out.
    pub notice_delivered: bool,
    /// How the decision was authorized.
    pub channel: ApprovalChannel,
}

/// Approve and reject operations for HOST identities.
pub struct ApprovalGate<R, M> {
    repo: Arc<R>,
    otc: Arc<OtcService<R, M>>,
    mail: EmailDispatcher<M>,
    env: LifecycleEnvironment,
    clock: Arc<dyn Clock>,
}

impl<R, M> ApprovalGate<R, M>
where
    R: IdentityRepository,
    M: Mailer,
{
    /// Create the gate.
    #[must_use]
    pub fn new(
        repo: Arc<R>,
        otc: Arc<OtcService<R, M>>,
        mail: EmailDispatcher<M>,
        env: LifecycleEnvironment,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            otc,
            mail,
            env,
            clock,
        }
    }

    async fn load(&self, id: IdentityId) -> Result<Identity> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::IdentityNotFound)
    }

    /// The error for a conditional write that matched nothing.
    async fn lost_race(&self, id: IdentityId) -> IdentityError {
        match self.repo.find_by_id(id).await {
            Ok(Some(_)) => IdentityError::HostAlreadyApproved,
            Ok(None) => IdentityError::IdentityNotFound,
            Err(e) => e,
        }
    }

    async fn notify(&self, message: &OutboundEmail, id: IdentityId) -> bool {
        match self.mail.send(message).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(identity_id = %id, subject = %message.subject, %error, "Host notice not delivered");
                false
            }
        }
    }

    /// Approve a HOST.
    ///
    /// The approval flag, its timestamp and a fresh verification code are
    /// written together. A second approval fails.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::AdminRequired`] if `authority` does not cover this
    /// - [`IdentityError::IdentityNotFound`] for an unknown identity
    /// - [`IdentityError::NotAHost`] or [`IdentityError::HostAlreadyApproved`]
    #[tracing::instrument(skip(self, authority), fields(channel = ?authority.channel()))]
    pub async fn approve(&self, authority: &ApprovalAuthority, id: IdentityId) -> Result<ApprovalReceipt> {
        authority.check(id, LinkAction::Approve)?;

        let identity = self.load(id).await?;
        let mut lifecycle = identity.lifecycle();
        let effects = LifecycleReducer.reduce(&mut lifecycle, LifecycleAction::ApproveHost, &self.env)?;

        let approved_at = self.clock.now();
        let prepared = self.otc.prepare(id, OtcPurpose::EmailVerification)?;
        let Some(approved) = self.repo.approve_host(id, approved_at, prepared.pending()).await? else {
            return Err(self.lost_race(id).await);
        };
        tracing::info!(identity_id = %id, actor = ?authority.actor, "Host approved");

        let mut otc_delivered = false;
        let mut notice_delivered = false;
        for effect in effects {
            match effect {
                LifecycleEffect::IssueOtc => {
                    otc_delivered = self.otc.deliver(&approved, &prepared).await;
                }
                LifecycleEffect::SendApprovalNotice => {
                    let message = notices::host_approved(&approved, approved_at);
                    notice_delivered = self.notify(&message, id).await;
                }
                _ => {}
            }
        }

        Ok(ApprovalReceipt {
            identity: approved.view(),
            approved_at,
            otc_expires_at: prepared.pending().expires_at,
            otc_delivered,
            notice_delivered,
            channel: authority.channel(),
        })
    }

    /// Reject a HOST: notify it, then delete it.
    ///
    /// If a concurrent approval wins between the two, the notice has already
    /// gone out while the host stays approved; that case is logged at warn.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::AdminRequired`] if `authority` does not cover this
    /// - [`IdentityError::IdentityNotFound`] for an unknown identity
    /// - [`IdentityError::NotAHost`] or [`IdentityError::HostAlreadyApproved`]
    #[tracing::instrument(skip(self, authority), fields(channel = ?authority.channel()))]
    pub async fn reject(&self, authority: &ApprovalAuthority, id: IdentityId) -> Result<RejectionReceipt> {
        authority.check(id, LinkAction::Reject)?;

        let identity = self.load(id).await?;
        let mut lifecycle = identity.lifecycle();
        let effects = LifecycleReducer.reduce(&mut lifecycle, LifecycleAction::RejectHost, &self.env)?;

        let rejected_at = self.clock.now();
        let mut notice_delivered = false;
        for effect in effects {
            match effect {
                LifecycleEffect::SendRejectionNotice => {
                    let message = notices::host_rejected(&identity, rejected_at);
                    notice_delivered = self.notify(&message, id).await;
                }
                LifecycleEffect::DeleteIdentity => {
                    if !self.repo.delete_pending_host(id).await? {
                        let err = self.lost_race(id).await;
                        if err == IdentityError::HostAlreadyApproved {
                            tracing::warn!(
                                identity_id = %id,
                                notice_delivered,
                                "Host approved while being rejected, rejection notice already sent"
                            );
                        }
                        return Err(err);
                    }
                    tracing::info!(identity_id = %id, actor = ?authority.actor, "Host rejected and deleted");
                }
                _ => {}
            }
        }

        Ok(RejectionReceipt {
            identity: identity.view(),
            rejected_at,
            notice_delivered,
            channel: authority.channel(),
        })
    }

    /// Unapproved hosts awaiting review, oldest request first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn pending_requests(&self) -> Result<Vec<IdentityView>> {
        Ok(self
            .repo
            .pending_host_requests()
            .await?
            .iter()
            .map(Identity::view)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{ApprovalLinkConfig, SessionConfig};
    use airena_core::Role;
    use airena_testing::test_clock;

    fn admin_token(signer: &SessionSigner, role: Role) -> String {
        let identity = Identity::new("a@example.com".into(), "h".into(), "A".into(), role, test_clock().now());
        signer.mint(&identity).unwrap().access_token
    }

    #[test]
    fn test_session_authority_requires_admin() {
        let signer = SessionSigner::new(&SessionConfig::new("k".repeat(32)), Arc::new(test_clock()));

        let authority = ApprovalAuthority::from_admin_session(&signer, &admin_token(&signer, Role::Admin)).unwrap();
        assert_eq!(authority.channel(), ApprovalChannel::AdminSession);
        assert!(authority.permits(IdentityId::new(), LinkAction::Reject));

        let err = ApprovalAuthority::from_admin_session(&signer, &admin_token(&signer, Role::Host)).unwrap_err();
        assert_eq!(err, IdentityError::AdminRequired);
    }

    #[test]
    fn test_link_authority_is_scoped() {
        let links = ApprovalLinkSigner::new(
            &ApprovalLinkConfig::new("https://x".into(), "k".into()),
            Arc::new(test_clock()),
        );
        let id = IdentityId::new();
        let (token, _) = links.sign(id, LinkAction::Approve).unwrap();

        let authority = ApprovalAuthority::from_signed_link(&links, &token, id, LinkAction::Approve).unwrap();

        assert_eq!(authority.channel(), ApprovalChannel::SignedLink);
        assert!(authority.permits(id, LinkAction::Approve));
        assert!(!authority.permits(id, LinkAction::Reject));
        assert!(!authority.permits(IdentityId::new(), LinkAction::Approve));
    }
}
