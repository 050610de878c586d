use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use fleetgate_core::AccountId;

use super::{AccountState, TieredAccountStore, UserCollection};
use crate::error::StoreError;
use crate::roles::Role;

/// In-memory user collection for tests/dev.
///
/// The write lock makes compare-and-swap atomic across concurrent requests.
#[derive(Debug, Default)]
pub struct InMemoryCollection {
    accounts: RwLock<HashMap<AccountId, AccountState>>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: AccountState) {
        if let Ok(mut map) = self.accounts.write() {
            map.insert(account.id.clone(), account);
        }
    }

    pub fn set_active(&self, id: &AccountId, is_active: bool) {
        if let Ok(mut map) = self.accounts.write() {
            if let Some(account) = map.get_mut(id) {
                account.is_active = is_active;
            }
        }
    }

    pub fn set_role(&self, id: &AccountId, role: Role) {
        if let Ok(mut map) = self.accounts.write() {
            if let Some(account) = map.get_mut(id) {
                account.role = Some(role);
            }
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::unavailable("lock poisoned")
}

#[async_trait]
impl UserCollection for InMemoryCollection {
    async fn find(&self, id: &AccountId) -> Result<Option<AccountState>, StoreError> {
        let map = self.accounts.read().map_err(|_| poisoned())?;
        Ok(map.get(id).cloned())
    }

    async fn set_refresh_token(&self, id: &AccountId, value: Option<&str>) -> Result<bool, StoreError> {
        let mut map = self.accounts.write().map_err(|_| poisoned())?;
        match map.get_mut(id) {
            Some(account) => {
                account.stored_refresh_token = value.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn compare_and_swap_refresh_token(
        &self,
        id: &AccountId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut map = self.accounts.write().map_err(|_| poisoned())?;
        let Some(account) = map.get_mut(id) else {
            return Ok(false);
        };
        if account.stored_refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        account.stored_refresh_token = new.map(str::to_string);
        Ok(true)
    }
}

/// The four in-memory collections, kept reachable for seeding and inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollections {
    pub super_admins: Arc<InMemoryCollection>,
    pub admins: Arc<InMemoryCollection>,
    pub organizations: Arc<InMemoryCollection>,
    pub users: Arc<InMemoryCollection>,
}

impl InMemoryCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> TieredAccountStore {
        TieredAccountStore::new(
            self.super_admins.clone(),
            self.admins.clone(),
            self.organizations.clone(),
            self.users.clone(),
        )
    }
}
