//! `fleetgate-auth`: token lifecycle and access control for the five user tiers.
//!
//! No HTTP or SQL dependencies: the store is reached through
//! [`store::AccountStore`] and the HTTP layer hands the pipeline plain header
//! values.

pub mod claims;
pub mod codec;
pub mod error;
pub mod permissions;
pub mod pipeline;
pub mod policy;
pub mod refresh;
pub mod roles;
pub mod service;
pub mod store;

pub use claims::{AccessClaims, RefreshClaims, TokenValidationError, validate_claims};
pub use codec::{Identity, IssuedToken, TokenCodec, TokenPair};
pub use error::{AuthError, AuthErrorKind, StoreError};
pub use permissions::{Permission, PermissionSet};
pub use pipeline::{
    AccessDecision, AccessDenied, AccessPipeline, AccessRequest, AuthorizedPrincipal, DenialReason, Stage,
    StageOutcome, StageStatus,
};
pub use policy::{HttpMethod, Resource, RoutePolicy};
pub use refresh::RefreshEngine;
pub use roles::{
    AppContext, HierarchyLevel, Role, UserTier, allowed_contexts_of, has_organization_boundary, hierarchy_of,
    permissions_of, tier_of,
};
pub use service::AuthService;
pub use store::{AccountState, AccountStore, InMemoryCollection, InMemoryCollections, TieredAccountStore, UserCollection};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::sync::Barrier;

    use fleetgate_core::{AccountId, FixedClock, OrganizationId};

    use crate::codec::{Identity, TokenCodec, TokenPair};
    use crate::pipeline::AccessPipeline;
    use crate::refresh::RefreshEngine;
    use crate::error::StoreError;
    use crate::roles::{Role, UserTier, tier_of};
    use crate::service::AuthService;
    use crate::store::{AccountState, AccountStore, InMemoryCollections, TieredAccountStore};

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()
    }

    fn account(id: &'static str, email: &str, role: Option<Role>, org: Option<&'static str>) -> AccountState {
        AccountState {
            id: AccountId::from(id),
            email: email.to_string(),
            name: id.to_string(),
            role,
            is_active: true,
            stored_refresh_token: None,
            organization_id: org.map(OrganizationId::from),
        }
    }

    /// Seeded store with one account per role, a fixed clock at `t0()` and a codec.
    pub struct Fixture {
        pub codec: TokenCodec,
        pub collections: InMemoryCollections,
        pub clock: Arc<FixedClock>,
        pub super_admin: AccountState,
        pub admin: AccountState,
        pub organization: AccountState,
        pub driver: AccountState,
        pub passenger: AccountState,
    }

    impl Fixture {
        pub fn new() -> Self {
            let collections = InMemoryCollections::new();
            let super_admin = account("sa_1", "root@example.com", None, None);
            let admin = account("adm_1", "admin@example.com", None, None);
            let organization = account("org_acc_1", "fleet@example.com", None, Some("org_A"));
            let driver = account("drv_1", "driver@example.com", Some(Role::Driver), Some("org_A"));
            let passenger = account("psg_1", "rider@example.com", Some(Role::Passenger), None);

            collections.super_admins.insert(super_admin.clone());
            collections.admins.insert(admin.clone());
            collections.organizations.insert(organization.clone());
            collections.users.insert(driver.clone());
            collections.users.insert(passenger.clone());

            Self {
                codec: TokenCodec::new(b"test-access-secret", b"test-refresh-secret").unwrap(),
                collections,
                clock: Arc::new(FixedClock::new(t0())),
                super_admin,
                admin,
                organization,
                driver,
                passenger,
            }
        }

        pub fn store(&self) -> TieredAccountStore {
            self.collections.store()
        }

        pub fn refresh_engine(&self) -> RefreshEngine<TieredAccountStore> {
            RefreshEngine::new(self.codec.clone(), self.store())
        }

        pub fn pipeline(&self) -> AccessPipeline<TieredAccountStore> {
            AccessPipeline::new(self.codec.clone(), self.store())
        }

        pub fn service(&self) -> AuthService<TieredAccountStore> {
            AuthService::new(self.codec.clone(), self.store(), self.clock.clone())
        }

        pub fn access_token(&self, account: &AccountState, role: Role) -> String {
            let identity = Identity::new(account.id.clone(), account.email.clone());
            self.codec
                .issue_access_token(&identity, role, account.organization_id.clone(), t0())
                .unwrap()
                .token
        }

        /// Issue a pair at `t0()` and store the refresh token, as a login would.
        pub async fn login_user(&self, account: &AccountState, role: Role) -> TokenPair {
            let identity = Identity::new(account.id.clone(), account.email.clone());
            let tier = tier_of(role);
            let access = self
                .codec
                .issue_access_token(&identity, role, account.organization_id.clone(), t0())
                .unwrap();
            let refresh = self
                .codec
                .issue_refresh_token(&account.id, tier, account.organization_id.clone(), t0())
                .unwrap();
            let stored = self
                .store()
                .persist_refresh_token(&account.id, tier, Some(&refresh.token))
                .await
                .unwrap();
            assert!(stored);
            TokenPair::new(&access, &refresh)
        }

        pub async fn login_organization(&self) -> TokenPair {
            self.login_user(&self.organization, Role::Organization).await
        }
    }

    /// Store whose backend is down for every call.
    pub struct UnavailableStore;

    #[async_trait]
    impl AccountStore for UnavailableStore {
        async fn load_account_state(
            &self,
            _id: &AccountId,
            _tier: UserTier,
        ) -> Result<Option<AccountState>, StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn persist_refresh_token(
            &self,
            _id: &AccountId,
            _tier: UserTier,
            _value: Option<&str>,
        ) -> Result<bool, StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn rotate_refresh_token(
            &self,
            _id: &AccountId,
            _tier: UserTier,
            _expected: &str,
            _new: &str,
        ) -> Result<bool, StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }
    }

    /// Holds every caller at a barrier right after the account load, so
    /// concurrent refreshes all pass the slot check before any rotation.
    pub struct GatedStore {
        inner: TieredAccountStore,
        after_load: Barrier,
        rotations_lost: AtomicUsize,
    }

    impl GatedStore {
        pub fn new(inner: TieredAccountStore, callers: usize) -> Self {
            Self {
                inner,
                after_load: Barrier::new(callers),
                rotations_lost: AtomicUsize::new(0),
            }
        }

        pub fn rotations_lost(&self) -> usize {
            self.rotations_lost.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccountStore for GatedStore {
        async fn load_account_state(
            &self,
            id: &AccountId,
            tier: UserTier,
        ) -> Result<Option<AccountState>, StoreError> {
            let state = self.inner.load_account_state(id, tier).await;
            self.after_load.wait().await;
            state
        }

        async fn persist_refresh_token(
            &self,
            id: &AccountId,
            tier: UserTier,
            value: Option<&str>,
        ) -> Result<bool, StoreError> {
            self.inner.persist_refresh_token(id, tier, value).await
        }

        async fn rotate_refresh_token(
            &self,
            id: &AccountId,
            tier: UserTier,
            expected: &str,
            new: &str,
        ) -> Result<bool, StoreError> {
            let rotated = self.inner.rotate_refresh_token(id, tier, expected, new).await?;
            if !rotated {
                self.rotations_lost.fetch_add(1, Ordering::SeqCst);
            }
            Ok(rotated)
        }
    }
}
