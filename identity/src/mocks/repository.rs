//! In-memory identity repository.

use crate::error::{IdentityError, Result};
use crate::providers::IdentityRepository;
use crate::state::{Identity, OtcPurpose, PendingOtc};
use airena_core::{IdentityId, Role};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identity repository backed by a `HashMap`.
///
/// Every method runs under one lock, which gives the same conditional-write
/// guarantees as the SQL store. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityRepository {
    identities: Arc<Mutex<HashMap<IdentityId, Identity>>>,
}

impl InMemoryIdentityRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<IdentityId, Identity>>> {
        self.identities
            .lock()
            .map_err(|_| IdentityError::Internal("identity store lock poisoned".into()))
    }

    /// Number of stored identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map(|map| map.len()).unwrap_or_default()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of one identity.
    #[must_use]
    pub fn get(&self, id: IdentityId) -> Option<Identity> {
        self.lock().ok()?.get(&id).cloned()
    }

    /// Overwrite an identity, bypassing every rule.
    pub fn put(&self, identity: Identity) {
        if let Ok(mut map) = self.lock() {
            map.insert(identity.id, identity);
        }
    }
}

impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        Ok(self.lock()?.values().find(|i| i.email == email).cloned())
    }

    async fn insert(&self, identity: &Identity) -> Result<()> {
        let mut map = self.lock()?;
        if map.values().any(|i| i.email == identity.email) {
            return Err(IdentityError::EmailAlreadyRegistered);
        }
        map.insert(identity.id, identity.clone());
        Ok(())
    }

    async fn store_otc(&self, id: IdentityId, otc: &PendingOtc, at: DateTime<Utc>) -> Result<bool> {
        let mut map = self.lock()?;
        let Some(identity) = map.get_mut(&id) else {
            return Ok(false);
        };
        identity.otc = Some(otc.clone());
        identity.otc_failed_attempts = 0;
        identity.updated_at = at;
        Ok(true)
    }

    async fn consume_otc(
        &self,
        id: IdentityId,
        code_hash: &str,
        purpose: OtcPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>> {
        let mut map = self.lock()?;
        let Some(identity) = map.get_mut(&id) else {
            return Ok(None);
        };
        let matches = identity
            .otc
            .as_ref()
            .is_some_and(|otc| otc.code_hash == code_hash && otc.purpose == purpose && !otc.is_expired(now));
        if !matches {
            return Ok(None);
        }
        identity.otc = None;
        identity.otc_failed_attempts = 0;
        identity.email_verified = true;
        identity.updated_at = now;
        Ok(Some(identity.clone()))
    }

    async fn clear_expired_otc(&self, id: IdentityId, now: DateTime<Utc>) -> Result<bool> {
        let mut map = self.lock()?;
        let Some(identity) = map.get_mut(&id) else {
            return Ok(false);
        };
        if identity.otc.as_ref().is_some_and(|otc| otc.is_expired(now)) {
            identity.otc = None;
            identity.otc_failed_attempts = 0;
            return Ok(true);
        }
        Ok(false)
    }

    async fn record_failed_otc_attempt(&self, id: IdentityId, code_hash: &str) -> Result<u32> {
        let mut map = self.lock()?;
        match map.get_mut(&id) {
            Some(identity) if identity.otc.as_ref().is_some_and(|otc| otc.code_hash == code_hash) => {
                identity.otc_failed_attempts += 1;
                Ok(identity.otc_failed_attempts)
            }
            _ => Ok(0),
        }
    }

    async fn clear_otc(&self, id: IdentityId, code_hash: &str) -> Result<bool> {
        let mut map = self.lock()?;
        match map.get_mut(&id) {
            Some(identity) if identity.otc.as_ref().is_some_and(|otc| otc.code_hash == code_hash) => {
                identity.otc = None;
                identity.otc_failed_attempts = 0;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_host_review_requested(&self, id: IdentityId, at: DateTime<Utc>) -> Result<bool> {
        let mut map = self.lock()?;
        match map.get_mut(&id) {
            Some(identity) if identity.host_requested_at.is_none() => {
                identity.host_requested_at = Some(at);
                identity.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn approve_host(&self, id: IdentityId, at: DateTime<Utc>, otc: &PendingOtc) -> Result<Option<Identity>> {
        let mut map = self.lock()?;
        match map.get_mut(&id) {
            Some(identity) if identity.role == Role::Host && !identity.host_approved => {
                identity.host_approved = true;
                identity.host_approved_at = Some(at);
                identity.otc = Some(otc.clone());
                identity.otc_failed_attempts = 0;
                identity.updated_at = at;
                Ok(Some(identity.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_pending_host(&self, id: IdentityId) -> Result<bool> {
        let mut map = self.lock()?;
        let pending = map
            .get(&id)
            .is_some_and(|identity| identity.role == Role::Host && !identity.host_approved);
        if pending {
            map.remove(&id);
        }
        Ok(pending)
    }

    async fn delete_non_admin(&self, id: IdentityId) -> Result<bool> {
        let mut map = self.lock()?;
        let deletable = map.get(&id).is_some_and(|identity| identity.role != Role::Admin);
        if deletable {
            map.remove(&id);
        }
        Ok(deletable)
    }

    async fn record_login(&self, id: IdentityId, at: DateTime<Utc>) -> Result<()> {
        if let Some(identity) = self.lock()?.get_mut(&id) {
            identity.last_login_at = Some(at);
            identity.updated_at = at;
        }
        Ok(())
    }

    async fn pending_host_requests(&self) -> Result<Vec<Identity>> {
        let mut pending: Vec<Identity> = self
            .lock()?
            .values()
            .filter(|i| i.role == Role::Host && !i.host_approved && i.host_requested_at.is_some())
            .cloned()
            .collect();
        pending.sort_by_key(|i| i.host_requested_at);
        Ok(pending)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Identity>> {
        let mut identities: Vec<Identity> = self.lock()?.values().filter(|i| i.role == role).cloned().collect();
        identities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(identities)
    }
}
