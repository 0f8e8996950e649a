//! Identity lifecycle reducer.
//!
//! # Transitions
//!
//! | action        | requires                              | effects                                   |
//! |---------------|---------------------------------------|-------------------------------------------|
//! | `Register`    | identity absent                       | `IssueOtc`                                |
//! | `VerifyEmail` | identity present                      | `RequestHostReview` (first time, HOST)    |
//! | `ApproveHost` | HOST, not approved                    | `IssueOtc`, `SendApprovalNotice`          |
//! | `RejectHost`  | HOST, not approved                    | `SendRejectionNotice`, `DeleteIdentity`   |
//! | `IssueSession`| verified; HOST must be approved       | `MintSession`                             |
//!
//! A rejected action leaves the state untouched.

use crate::actions::LifecycleAction;
use crate::effects::LifecycleEffect;
use crate::environment::LifecycleEnvironment;
use crate::error::IdentityError;
use crate::state::Lifecycle;
use airena_core::Role;
use airena_core::reducer::{Effects, Reducer};
use airena_core::smallvec;

/// Identity lifecycle reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleReducer;

impl LifecycleReducer {
    /// Resolve the stored role for a registration.
    ///
    /// Configured administrator emails are ADMIN regardless of the request;
    /// anyone else asking for ADMIN is refused.
    fn resolve_role(
        email: &str,
        requested: Role,
        env: &LifecycleEnvironment,
    ) -> Result<Role, IdentityError> {
        if env.is_admin_email(email) {
            return Ok(Role::Admin);
        }
        match requested.canonical() {
            Role::Admin => Err(IdentityError::AdminRoleNotAssignable),
            role => Ok(role),
        }
    }

    fn require_pending_host(state: &Lifecycle) -> Result<(), IdentityError> {
        let role = state.role.ok_or(IdentityError::IdentityNotFound)?;
        if !role.is_host() {
            return Err(IdentityError::NotAHost);
        }
        if state.host_approved {
            return Err(IdentityError::HostAlreadyApproved);
        }
        Ok(())
    }
}

impl Reducer for LifecycleReducer {
    type State = Lifecycle;
    type Action = LifecycleAction;
    type Environment = LifecycleEnvironment;
    type Effect = LifecycleEffect;
    type Error = IdentityError;

    fn reduce(
        &self,
        state: &mut Lifecycle,
        action: LifecycleAction,
        env: &LifecycleEnvironment,
    ) -> Result<Effects<LifecycleEffect>, IdentityError> {
        match action {
            LifecycleAction::Register {
                email,
                requested_role,
            } => {
                if state.role.is_some() {
                    return Err(IdentityError::EmailAlreadyRegistered);
                }
                let role = Self::resolve_role(&email, requested_role, env)?;
                *state = Lifecycle {
                    role: Some(role),
                    ..Lifecycle::default()
                };
                Ok(smallvec![LifecycleEffect::IssueOtc])
            }

            LifecycleAction::VerifyEmail => {
                let role = state.role.ok_or(IdentityError::IdentityNotFound)?;
                state.email_verified = true;

                if role.is_host() && !state.host_approved && !state.review_requested {
                    state.review_requested = true;
                    return Ok(smallvec![LifecycleEffect::RequestHostReview]);
                }
                Ok(Effects::new())
            }

            LifecycleAction::ApproveHost => {
                Self::require_pending_host(state)?;
                state.host_approved = true;
                Ok(smallvec![
                    LifecycleEffect::IssueOtc,
                    LifecycleEffect::SendApprovalNotice
                ])
            }

            LifecycleAction::RejectHost => {
                Self::require_pending_host(state)?;
                *state = Lifecycle::default();
                Ok(smallvec![
                    LifecycleEffect::SendRejectionNotice,
                    LifecycleEffect::DeleteIdentity
                ])
            }

            LifecycleAction::IssueSession => {
                let role = state.role.ok_or(IdentityError::IdentityNotFound)?;
                if !state.email_verified {
                    return Err(IdentityError::InvalidOtc);
                }
                if role.is_host() && !state.host_approved {
                    return Err(IdentityError::HostApprovalPending);
                }
                Ok(smallvec![LifecycleEffect::MintSession])
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::LifecycleState;

    fn env() -> LifecycleEnvironment {
        LifecycleEnvironment::new(&["admin@airena.dev".to_string()])
    }

    fn registered(role: Role) -> Lifecycle {
        let mut state = Lifecycle::default();
        LifecycleReducer
            .reduce(
                &mut state,
                LifecycleAction::Register {
                    email: "someone@example.com".into(),
                    requested_role: role,
                },
                &env(),
            )
            .unwrap();
        state
    }

    #[test]
    fn test_register_issues_otc_and_starts_unverified() {
        let mut state = Lifecycle::default();
        let effects = LifecycleReducer
            .reduce(
                &mut state,
                LifecycleAction::Register {
                    email: "p@example.com".into(),
                    requested_role: Role::Participant,
                },
                &env(),
            )
            .unwrap();

        assert_eq!(effects.as_slice(), &[LifecycleEffect::IssueOtc]);
        assert_eq!(state.state(), Some(LifecycleState::Unverified));
    }

    #[test]
    fn test_register_twice_conflicts() {
        let mut state = registered(Role::Participant);
        let err = LifecycleReducer
            .reduce(
                &mut state,
                LifecycleAction::Register {
                    email: "p@example.com".into(),
                    requested_role: Role::Participant,
                },
                &env(),
            )
            .unwrap_err();

        assert_eq!(err, IdentityError::EmailAlreadyRegistered);
    }

    #[test]
    fn test_admin_email_is_forced_to_admin() {
        let mut state = Lifecycle::default();
        LifecycleReducer
            .reduce(
                &mut state,
                LifecycleAction::Register {
                    email: "Admin@AIrena.dev".into(),
                    requested_role: Role::Host,
                },
                &env(),
            )
            .unwrap();

        assert_eq!(state.role, Some(Role::Admin));
    }

    #[test]
    fn test_admin_role_cannot_be_requested() {
        let mut state = Lifecycle::default();
        let err = LifecycleReducer
            .reduce(
                &mut state,
                LifecycleAction::Register {
                    email: "mallory@example.com".into(),
                    requested_role: Role::Admin,
                },
                &env(),
            )
            .unwrap_err();

        assert_eq!(err, IdentityError::AdminRoleNotAssignable);
        assert_eq!(state, Lifecycle::default());
    }

    #[test]
    fn test_organizer_registers_as_host() {
        assert_eq!(registered(Role::Organizer).role, Some(Role::Host));
    }

    #[test]
    fn test_participant_is_active_after_verification() {
        let mut state = registered(Role::Participant);
        let effects = LifecycleReducer
            .reduce(&mut state, LifecycleAction::VerifyEmail, &env())
            .unwrap();

        assert!(effects.is_empty());
        assert_eq!(state.state(), Some(LifecycleState::EmailVerified));
    }

    #[test]
    fn test_host_verification_requests_review_once() {
        let mut state = registered(Role::Host);

        let first = LifecycleReducer
            .reduce(&mut state, LifecycleAction::VerifyEmail, &env())
            .unwrap();
        let second = LifecycleReducer
            .reduce(&mut state, LifecycleAction::VerifyEmail, &env())
            .unwrap();

        assert_eq!(first.as_slice(), &[LifecycleEffect::RequestHostReview]);
        assert!(second.is_empty());
        assert_eq!(state.state(), Some(LifecycleState::PendingApproval));
    }

    #[test]
    fn test_approve_then_approve_again_is_forbidden() {
        let mut state = registered(Role::Host);

        let effects = LifecycleReducer
            .reduce(&mut state, LifecycleAction::ApproveHost, &env())
            .unwrap();
        assert_eq!(
            effects.as_slice(),
            &[LifecycleEffect::IssueOtc, LifecycleEffect::SendApprovalNotice]
        );

        let err = LifecycleReducer
            .reduce(&mut state, LifecycleAction::ApproveHost, &env())
            .unwrap_err();
        assert_eq!(err, IdentityError::HostAlreadyApproved);
    }

    #[test]
    fn test_approval_targets_hosts_only() {
        let mut state = registered(Role::Participant);
        let err = LifecycleReducer
            .reduce(&mut state, LifecycleAction::ApproveHost, &env())
            .unwrap_err();

        assert_eq!(err, IdentityError::NotAHost);
    }

    #[test]
    fn test_approval_of_missing_identity_is_not_found() {
        let mut state = Lifecycle::default();
        let err = LifecycleReducer
            .reduce(&mut state, LifecycleAction::ApproveHost, &env())
            .unwrap_err();

        assert_eq!(err, IdentityError::IdentityNotFound);
    }

    #[test]
    fn test_reject_notifies_before_deleting() {
        let mut state = registered(Role::Host);
        let effects = LifecycleReducer
            .reduce(&mut state, LifecycleAction::RejectHost, &env())
            .unwrap();

        assert_eq!(
            effects.as_slice(),
            &[LifecycleEffect::SendRejectionNotice, LifecycleEffect::DeleteIdentity]
        );
        assert_eq!(state.state(), None);
    }

    #[test]
    fn test_reject_after_approval_is_forbidden() {
        let mut state = registered(Role::Host);
        state.host_approved = true;

        let err = LifecycleReducer
            .reduce(&mut state, LifecycleAction::RejectHost, &env())
            .unwrap_err();
        assert_eq!(err, IdentityError::HostAlreadyApproved);
    }

    #[test]
    fn test_session_requires_approval_for_hosts() {
        let mut state = registered(Role::Host);
        state.email_verified = true;

        let err = LifecycleReducer
            .reduce(&mut state, LifecycleAction::IssueSession, &env())
            .unwrap_err();
        assert_eq!(err, IdentityError::HostApprovalPending);

        state.host_approved = true;
        let effects = LifecycleReducer
            .reduce(&mut state, LifecycleAction::IssueSession, &env())
            .unwrap();
        assert_eq!(effects.as_slice(), &[LifecycleEffect::MintSession]);
    }

    #[test]
    fn test_session_requires_verified_email() {
        let mut state = registered(Role::Participant);
        let err = LifecycleReducer
            .reduce(&mut state, LifecycleAction::IssueSession, &env())
            .unwrap_err();

        assert_eq!(err, IdentityError::InvalidOtc);
    }
}
