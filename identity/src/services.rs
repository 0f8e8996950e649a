//! Wiring for the identity services.

use crate::admin::IdentityAdmin;
use crate::approval::ApprovalGate;
use crate::config::IdentityConfig;
use crate::links::ApprovalLinkSigner;
use crate::otc::OtcService;
use crate::password::PasswordHasher;
use crate::providers::IdentityRepository;
use crate::registration::IdentityStateMachine;
use crate::session::{SessionIssuer, SessionSigner};
use airena_core::environment::Clock;
use airena_mail::{EmailDispatcher, Mailer};
use std::sync::Arc;

/// Every identity service, built over one repository, dispatcher and clock.
pub struct IdentityServices<R, M> {
    /// One-time codes.
    pub otc: Arc<OtcService<R, M>>,
    /// Registration and verification.
    pub machine: Arc<IdentityStateMachine<R, M>>,
    /// Host approval.
    pub approvals: Arc<ApprovalGate<R, M>>,
    /// Identity listing and deletion.
    pub admin: Arc<IdentityAdmin<R>>,
    /// Login.
    pub sessions: Arc<SessionIssuer<R, M>>,
    /// Session credential signer.
    pub session_signer: Arc<SessionSigner>,
    /// Approval link signer.
    pub link_signer: Arc<ApprovalLinkSigner>,
}

impl<R, M> Clone for IdentityServices<R, M> {
    fn clone(&self) -> Self {
        Self {
            otc: Arc::clone(&self.otc),
            machine: Arc::clone(&self.machine),
            approvals: Arc::clone(&self.approvals),
            admin: Arc::clone(&self.admin),
            sessions: Arc::clone(&self.sessions),
            session_signer: Arc::clone(&self.session_signer),
            link_signer: Arc::clone(&self.link_signer),
        }
    }
}

impl<R, M> IdentityServices<R, M>
where
    R: IdentityRepository + 'static,
    M: Mailer + 'static,
{
    /// Build the services.
    #[must_use]
    pub fn new(repo: Arc<R>, mail: EmailDispatcher<M>, config: &IdentityConfig, clock: Arc<dyn Clock>) -> Self {
        let otc = Arc::new(OtcService::new(
            Arc::clone(&repo),
            mail.clone(),
            config.otc.clone(),
            Arc::clone(&clock),
        ));
        let link_signer = Arc::new(ApprovalLinkSigner::new(&config.links, Arc::clone(&clock)));
        let session_signer = Arc::new(SessionSigner::new(&config.session, Arc::clone(&clock)));

        let machine = Arc::new(IdentityStateMachine::new(
            Arc::clone(&repo),
            Arc::clone(&otc),
            mail.clone(),
            Arc::clone(&link_signer),
            config,
            Arc::clone(&clock),
        ));
        let approvals = Arc::new(ApprovalGate::new(
            Arc::clone(&repo),
            Arc::clone(&otc),
            mail,
            machine.environment().clone(),
            Arc::clone(&clock),
        ));
        let admin = Arc::new(IdentityAdmin::new(Arc::clone(&repo)));
        let sessions = Arc::new(SessionIssuer::new(
            repo,
            Arc::clone(&machine),
            Arc::clone(&otc),
            Arc::clone(&session_signer),
            PasswordHasher::new(config.password.iterations),
            clock,
        ));

        Self {
            otc,
            machine,
            approvals,
            admin,
            sessions,
            session_signer,
            link_signer,
        }
    }
}
