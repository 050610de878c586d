//! Token codec: issue and verify HS256 access/refresh tokens.
//!
//! Access and refresh tokens are signed with distinct secrets, so a leaked
//! access key cannot mint refresh tokens. Expiry is checked here (not by the
//! JWT library) so that `exp == now` counts as expired and expiry is reported
//! separately from a bad signature.

use chrono::{DateTime, SubsecRound, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use fleetgate_core::{AccountId, OrganizationId};

use crate::claims::{AccessClaims, RefreshClaims, TokenValidationError, TokenWindow, validate_claims};
use crate::error::AuthError;
use crate::roles::{Role, UserTier, hierarchy_of, permissions_of, tier_of};

/// Who a token is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: AccountId,
    pub email: String,
}

impl Identity {
    pub fn new(id: AccountId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken<C> {
    pub token: String,
    pub claims: C,
}

/// Access + refresh token pair handed back on login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn new(access: &IssuedToken<AccessClaims>, refresh: &IssuedToken<RefreshClaims>) -> Self {
        Self {
            access_token: access.token.clone(),
            refresh_token: refresh.token.clone(),
            access_expires_at: access.claims.expires_at,
            refresh_expires_at: refresh.claims.expires_at,
        }
    }
}

#[derive(Clone)]
struct HmacKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl HmacKey {
    fn from_secret(name: &str, secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::configuration(format!("{name} signing secret is not set")));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }
}

/// Stateless signer/verifier. Cheap to clone and safe to share across requests.
#[derive(Clone)]
pub struct TokenCodec {
    access: HmacKey,
    refresh: HmacKey,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the two signing secrets.
    ///
    /// Fails with `Configuration` when either secret is empty or both are the
    /// same; callers treat this as fatal at startup.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Result<Self, AuthError> {
        let access = HmacKey::from_secret("access", access_secret)?;
        let refresh = HmacKey::from_secret("refresh", refresh_secret)?;
        if access_secret == refresh_secret {
            return Err(AuthError::configuration(
                "access and refresh signing secrets must differ",
            ));
        }
        Ok(Self { access, refresh })
    }

    pub fn issue_access_token(
        &self,
        identity: &Identity,
        role: Role,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken<AccessClaims>, AuthError> {
        let issued_at = now.trunc_subsecs(0);
        let tier = tier_of(role);
        let claims = AccessClaims {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role,
            user_type: tier,
            organization_id,
            permissions: permissions_of(role),
            hierarchy: hierarchy_of(role),
            issued_at,
            expires_at: issued_at + tier.access_lifetime(),
            jti: Uuid::now_v7(),
        };
        let token = sign(&claims, &self.access.encoding)?;
        Ok(IssuedToken { token, claims })
    }

    pub fn issue_refresh_token(
        &self,
        id: &AccountId,
        tier: UserTier,
        organization_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken<RefreshClaims>, AuthError> {
        let issued_at = now.trunc_subsecs(0);
        let claims = RefreshClaims {
            id: id.clone(),
            user_type: tier,
            organization_id,
            issued_at,
            expires_at: issued_at + tier.refresh_lifetime(),
            jti: Uuid::now_v7(),
        };
        let token = sign(&claims, &self.refresh.encoding)?;
        Ok(IssuedToken { token, claims })
    }

    /// Signature + expiry only. Permissions are not re-derived from the
    /// account's current role; they stay as issued until the token expires.
    pub fn verify_access_token(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, AuthError> {
        verify(token, &self.access.decoding, now)
    }

    pub fn verify_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<RefreshClaims, AuthError> {
        verify(token, &self.refresh.decoding, now)
    }
}

fn sign<C: Serialize>(claims: &C, key: &EncodingKey) -> Result<String, AuthError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AuthError::configuration(format!("failed to sign token: {e}")))
}

fn verify<C>(token: &str, key: &DecodingKey, now: DateTime<Utc>) -> Result<C, AuthError>
where
    C: DeserializeOwned + TokenWindow,
{
    let data = jsonwebtoken::decode::<C>(token, key, &validation())
        .map_err(|e| AuthError::token_invalid(e.to_string()))?;

    validate_claims(&data.claims, now).map_err(|e| match e {
        TokenValidationError::Expired => AuthError::TokenExpired,
        other => AuthError::token_invalid(other.to_string()),
    })?;

    Ok(data.claims)
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}
