//! Identity management for administrators.
//!
//! Listing and deleting accounts needs an administrator session. A signed
//! approval link only covers the host decision it was issued for and is
//! refused here.

use crate::approval::ApprovalAuthority;
use crate::error::{IdentityError, Result};
use crate::providers::IdentityRepository;
use crate::state::{Identity, IdentityView};
use airena_core::{IdentityId, Role};
use std::sync::Arc;

/// Lists and deletes identities on behalf of an administrator.
pub struct IdentityAdmin<R> {
    repo: Arc<R>,
}

impl<R> IdentityAdmin<R>
where
    R: IdentityRepository,
{
    /// Create the service.
    #[must_use]
    pub const fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Every identity holding `role`, newest first.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::AdminRequired`] unless `authority` is an
    ///   administrator session
    /// - a storage error
    pub async fn list(&self, authority: &ApprovalAuthority, role: Role) -> Result<Vec<IdentityView>> {
        authority.require_session()?;
        Ok(self
            .repo
            .list_by_role(role.canonical())
            .await?
            .iter()
            .map(Identity::view)
            .collect())
    }

    /// Delete a non-ADMIN identity and return it as it was.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::AdminRequired`] unless `authority` is an
    ///   administrator session
    /// - [`IdentityError::IdentityNotFound`] for an unknown identity
    /// - [`IdentityError::AdminNotDeletable`] when the target is an ADMIN
    #[tracing::instrument(skip(self, authority))]
    pub async fn delete(&self, authority: &ApprovalAuthority, id: IdentityId) -> Result<IdentityView> {
        let actor = authority.require_session()?;

        let identity = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::IdentityNotFound)?;
        if identity.role == Role::Admin {
            tracing::warn!(identity_id = %id, ?actor, "Refused to delete an administrator");
            return Err(IdentityError::AdminNotDeletable);
        }

        if !self.repo.delete_non_admin(id).await? {
            return Err(match self.repo.find_by_id(id).await? {
                Some(_) => IdentityError::AdminNotDeletable,
                None => IdentityError::IdentityNotFound,
            });
        }
        tracing::info!(identity_id = %id, role = %identity.role, ?actor, "Identity deleted");
        Ok(identity.view())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{ApprovalLinkConfig, SessionConfig};
    use crate::links::{ApprovalLinkSigner, LinkAction};
    use crate::mocks::InMemoryIdentityRepository;
    use crate::session::SessionSigner;
    use airena_core::environment::Clock;
    use airena_testing::test_clock;

    struct Fixture {
        repo: Arc<InMemoryIdentityRepository>,
        admin: IdentityAdmin<InMemoryIdentityRepository>,
        authority: ApprovalAuthority,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryIdentityRepository::new());
        let signer = SessionSigner::new(&SessionConfig::new("k".repeat(32)), Arc::new(test_clock()));
        let admin = Identity::new("admin@example.com".into(), "h".into(), "Admin".into(), Role::Admin, test_clock().now());
        repo.put(admin.clone());
        let token = signer.mint(&admin).unwrap().access_token;
        Fixture {
            admin: IdentityAdmin::new(Arc::clone(&repo)),
            authority: ApprovalAuthority::from_admin_session(&signer, &token).unwrap(),
            repo,
        }
    }

    fn add(repo: &InMemoryIdentityRepository, email: &str, role: Role) -> IdentityId {
        let identity = Identity::new(email.into(), "h".into(), "User".into(), role, test_clock().now());
        let id = identity.id;
        repo.put(identity);
        id
    }

    #[tokio::test]
    async fn test_list_filters_by_role() {
        let f = fixture();
        add(&f.repo, "host@example.com", Role::Host);
        add(&f.repo, "p1@example.com", Role::Participant);
        add(&f.repo, "p2@example.com", Role::Participant);

        let hosts = f.admin.list(&f.authority, Role::Organizer).await.unwrap();
        let participants = f.admin.list(&f.authority, Role::Participant).await.unwrap();

        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].email, "host@example.com");
        assert_eq!(participants.len(), 2);
        assert!(participants.iter().all(|p| p.role == Role::Participant));
    }

    #[tokio::test]
    async fn test_delete_removes_non_admin() {
        let f = fixture();
        let id = add(&f.repo, "p@example.com", Role::Participant);

        let deleted = f.admin.delete(&f.authority, id).await.unwrap();

        assert_eq!(deleted.id, id);
        assert!(f.repo.get(id).is_none());
        let again = f.admin.delete(&f.authority, id).await.unwrap_err();
        assert_eq!(again, IdentityError::IdentityNotFound);
    }

    #[tokio::test]
    async fn test_admins_cannot_be_deleted() {
        let f = fixture();
        let other_admin = add(&f.repo, "root@example.com", Role::Admin);

        let err = f.admin.delete(&f.authority, other_admin).await.unwrap_err();

        assert_eq!(err, IdentityError::AdminNotDeletable);
        assert!(f.repo.get(other_admin).is_some());
    }

    #[tokio::test]
    async fn test_signed_link_authority_is_refused() {
        let f = fixture();
        let id = add(&f.repo, "host@example.com", Role::Host);
        let links = ApprovalLinkSigner::new(
            &ApprovalLinkConfig::new("https://x".into(), "k".into()),
            Arc::new(test_clock()),
        );
        let (token, _) = links.sign(id, LinkAction::Reject).unwrap();
        let link = ApprovalAuthority::from_signed_link(&links, &token, id, LinkAction::Reject).unwrap();

        assert_eq!(f.admin.delete(&link, id).await.unwrap_err(), IdentityError::AdminRequired);
        assert_eq!(
            f.admin.list(&link, Role::Host).await.unwrap_err(),
            IdentityError::AdminRequired
        );
        assert!(f.repo.get(id).is_some());
    }
}
