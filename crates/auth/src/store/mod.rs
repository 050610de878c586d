//! Token store adapter: the seam to the user store.
//!
//! The core never names a table. It hands a [`UserTier`] to
//! [`TieredAccountStore`], which picks one of four [`UserCollection`]s with an
//! exhaustive match. Each collection owns exactly one refresh-token slot per
//! account; rotation goes through a compare-and-swap so that two racing
//! refreshes of the same token cannot both succeed.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use fleetgate_core::{AccountId, OrganizationId};

use crate::error::{AuthError, StoreError};
use crate::roles::{Role, UserTier, tier_of};

pub use memory::{InMemoryCollection, InMemoryCollections};

/// Live account state as seen by the access-control core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    pub id: AccountId,
    pub email: String,
    pub name: String,
    /// Only `User`-tier records carry a role; the other tiers imply it.
    pub role: Option<Role>,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub stored_refresh_token: Option<String>,
    pub organization_id: Option<OrganizationId>,
}

impl AccountState {
    /// Resolve the role this account holds inside `tier`.
    ///
    /// Fails when the record's role is missing or belongs to another tier.
    pub fn effective_role(&self, tier: UserTier) -> Result<Role, AuthError> {
        let role = match (self.role, tier.implied_role()) {
            (Some(role), _) => role,
            (None, Some(implied)) => implied,
            (None, None) => {
                return Err(AuthError::InvalidRole(format!(
                    "account {} in tier {tier} has no role",
                    self.id
                )));
            }
        };
        if tier_of(role) != tier {
            return Err(AuthError::InvalidUserTier(format!(
                "role {role} stored in tier {tier}"
            )));
        }
        Ok(role)
    }
}

/// One backing collection (one table per tier in the relational store).
#[async_trait]
pub trait UserCollection: Send + Sync {
    async fn find(&self, id: &AccountId) -> Result<Option<AccountState>, StoreError>;

    /// Overwrite the refresh-token slot unconditionally.
    ///
    /// Returns `false` when no such account exists.
    async fn set_refresh_token(&self, id: &AccountId, value: Option<&str>) -> Result<bool, StoreError>;

    /// Replace the slot only if it still holds `expected`.
    ///
    /// Returns `false` when the slot no longer matches (or the account is gone).
    async fn compare_and_swap_refresh_token(
        &self,
        id: &AccountId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, StoreError>;
}

/// Per-tier account lookup/update consumed by the refresh engine and pipeline.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn load_account_state(
        &self,
        id: &AccountId,
        tier: UserTier,
    ) -> Result<Option<AccountState>, StoreError>;

    /// Unconditional write (login issuance, logout, revocation).
    async fn persist_refresh_token(
        &self,
        id: &AccountId,
        tier: UserTier,
        value: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Rotation point: `expected` → `new`, atomically.
    async fn rotate_refresh_token(
        &self,
        id: &AccountId,
        tier: UserTier,
        expected: &str,
        new: &str,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn load_account_state(
        &self,
        id: &AccountId,
        tier: UserTier,
    ) -> Result<Option<AccountState>, StoreError> {
        (**self).load_account_state(id, tier).await
    }

    async fn persist_refresh_token(
        &self,
        id: &AccountId,
        tier: UserTier,
        value: Option<&str>,
    ) -> Result<bool, StoreError> {
        (**self).persist_refresh_token(id, tier, value).await
    }

    async fn rotate_refresh_token(
        &self,
        id: &AccountId,
        tier: UserTier,
        expected: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        (**self).rotate_refresh_token(id, tier, expected, new).await
    }
}

/// Account store built from one collection per tier.
#[derive(Clone)]
pub struct TieredAccountStore {
    super_admins: Arc<dyn UserCollection>,
    admins: Arc<dyn UserCollection>,
    organizations: Arc<dyn UserCollection>,
    users: Arc<dyn UserCollection>,
}

impl core::fmt::Debug for TieredAccountStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TieredAccountStore").finish_non_exhaustive()
    }
}

impl TieredAccountStore {
    pub fn new(
        super_admins: Arc<dyn UserCollection>,
        admins: Arc<dyn UserCollection>,
        organizations: Arc<dyn UserCollection>,
        users: Arc<dyn UserCollection>,
    ) -> Self {
        Self {
            super_admins,
            admins,
            organizations,
            users,
        }
    }

    pub fn collection(&self, tier: UserTier) -> &dyn UserCollection {
        match tier {
            UserTier::SuperAdmin => self.super_admins.as_ref(),
            UserTier::Admin => self.admins.as_ref(),
            UserTier::Organization => self.organizations.as_ref(),
            UserTier::User => self.users.as_ref(),
        }
    }
}

#[async_trait]
impl AccountStore for TieredAccountStore {
    #[instrument(skip(self), fields(account_id = %id, tier = %tier), err)]
    async fn load_account_state(
        &self,
        id: &AccountId,
        tier: UserTier,
    ) -> Result<Option<AccountState>, StoreError> {
        self.collection(tier).find(id).await
    }

    #[instrument(skip(self, value), fields(account_id = %id, tier = %tier, clear = value.is_none()), err)]
    async fn persist_refresh_token(
        &self,
        id: &AccountId,
        tier: UserTier,
        value: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.collection(tier).set_refresh_token(id, value).await
    }

    #[instrument(skip(self, expected, new), fields(account_id = %id, tier = %tier), err)]
    async fn rotate_refresh_token(
        &self,
        id: &AccountId,
        tier: UserTier,
        expected: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        self.collection(tier)
            .compare_and_swap_refresh_token(id, expected, Some(new))
            .await
    }
}
