use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fleetgate_core::{AccountId, OrganizationId};

use crate::permissions::PermissionSet;
use crate::roles::{HierarchyLevel, Role, UserTier};

/// Access-token claim set.
///
/// Wire shape: `{id, email, role, userType, organizationId|null, permissions[],
/// hierarchy, iat, exp, jti}`. Permissions and hierarchy are frozen at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject / account identifier.
    pub id: AccountId,

    pub email: String,

    pub role: Role,

    pub user_type: UserTier,

    pub organization_id: Option<OrganizationId>,

    pub permissions: PermissionSet,

    pub hierarchy: HierarchyLevel,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Unique token id.
    pub jti: Uuid,
}

/// Refresh-token claim set: `{id, userType, organizationId|null, iat, exp, jti}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub id: AccountId,

    pub user_type: UserTier,

    pub organization_id: Option<OrganizationId>,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Unique token id; two refresh tokens minted in the same second still differ.
    pub jti: Uuid,
}

/// Time window shared by both claim sets.
pub trait TokenWindow {
    fn issued_at(&self) -> DateTime<Utc>;
    fn expires_at(&self) -> DateTime<Utc>;
}

impl TokenWindow for AccessClaims {
    fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl TokenWindow for RefreshClaims {
    fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claim time window.
///
/// A token whose `expires_at` equals `now` is already expired.
pub fn validate_claims<C: TokenWindow>(claims: &C, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at() <= claims.issued_at() {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at() {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at() {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
