//! Refresh engine: verify, match against the stored slot, rotate.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::codec::{Identity, TokenCodec, TokenPair};
use crate::error::AuthError;
use crate::roles::tier_of;
use crate::store::AccountStore;

/// Rotates refresh tokens against an [`AccountStore`].
///
/// Holds no state of its own; the store's compare-and-swap is what decides the
/// winner when two requests refresh the same token at once.
#[derive(Debug, Clone)]
pub struct RefreshEngine<S> {
    codec: TokenCodec,
    store: S,
}

impl<S> RefreshEngine<S>
where
    S: AccountStore,
{
    pub fn new(codec: TokenCodec, store: S) -> Self {
        Self { codec, store }
    }

    /// Exchange a refresh token for a new pair. Never retried internally.
    ///
    /// - `TokenInvalid` / `TokenExpired`: signature or window check failed
    /// - `AccountNotFound`: account missing or deactivated
    /// - `TokenReuseOrStale`: token is not the one currently stored
    #[instrument(skip_all, err)]
    pub async fn refresh(&self, presented: &str, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let claims = self.codec.verify_refresh_token(presented, now)?;
        let tier = claims.user_type;

        let account = self
            .store
            .load_account_state(&claims.id, tier)
            .await?
            .filter(|account| account.is_active)
            .ok_or_else(|| {
                debug!(account_id = %claims.id, %tier, "refresh for missing or inactive account");
                AuthError::AccountNotFound
            })?;

        let matches_slot = account
            .stored_refresh_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), presented.as_bytes()));
        if !matches_slot {
            warn!(account_id = %account.id, %tier, "refresh token does not match stored value");
            return Err(AuthError::TokenReuseOrStale);
        }

        // Role and organization are re-read here, so changes made since the
        // last issuance take effect now.
        let role = account.effective_role(tier)?;
        let identity = Identity::new(account.id.clone(), account.email.clone());
        let access = self.codec.issue_access_token(
            &identity,
            role,
            account.organization_id.clone(),
            now,
        )?;
        let refresh = self.codec.issue_refresh_token(
            &account.id,
            tier_of(role),
            account.organization_id.clone(),
            now,
        )?;

        let rotated = self
            .store
            .rotate_refresh_token(&account.id, tier, presented, &refresh.token)
            .await?;
        if !rotated {
            warn!(account_id = %account.id, %tier, "lost refresh race; slot changed before rotation");
            return Err(AuthError::TokenReuseOrStale);
        }

        info!(account_id = %account.id, %tier, %role, "refresh token rotated");
        Ok(TokenPair::new(&access, &refresh))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
