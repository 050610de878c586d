//! Authentication error taxonomy.
//!
//! Every token, refresh and store failure maps onto one stable
//! [`AuthErrorKind`] so callers can tell "log in again" apart from a transient
//! store failure without string matching.

use serde::Serialize;
use thiserror::Error;

/// Failure reported by a user-store adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backing store could not be reached or the query failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record exists but cannot be mapped into an account state.
    #[error("corrupt account record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing or unusable signing secret. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad signature, malformed token or implausible time window.
    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("account not found")]
    AccountNotFound,

    #[error("account is inactive")]
    AccountInactive,

    /// The presented refresh token is not the one currently stored.
    #[error("refresh token is stale or has been reused")]
    TokenReuseOrStale,

    #[error("invalid user tier '{0}'")]
    InvalidUserTier(String),

    #[error("invalid role '{0}'")]
    InvalidRole(String),

    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stable error kind (wire-safe code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorKind {
    ConfigurationError,
    TokenInvalid,
    TokenExpired,
    AccountNotFound,
    AccountInactive,
    TokenReuseOrStale,
    InvalidUserTier,
    InvalidRole,
    InsufficientPermissions,
    StoreUnavailable,
}

impl AuthErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            AuthErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
            AuthErrorKind::TokenInvalid => "TOKEN_INVALID",
            AuthErrorKind::TokenExpired => "TOKEN_EXPIRED",
            AuthErrorKind::AccountNotFound => "ACCOUNT_NOT_FOUND",
            AuthErrorKind::AccountInactive => "ACCOUNT_INACTIVE",
            AuthErrorKind::TokenReuseOrStale => "TOKEN_REUSE_OR_STALE",
            AuthErrorKind::InvalidUserTier => "INVALID_USER_TIER",
            AuthErrorKind::InvalidRole => "INVALID_ROLE",
            AuthErrorKind::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            AuthErrorKind::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    /// Only a configuration failure is process-fatal; everything else is a
    /// per-request condition the caller resolves (usually by logging in again).
    pub fn is_fatal(self) -> bool {
        matches!(self, AuthErrorKind::ConfigurationError)
    }

    /// Whether the caller must re-authenticate to recover.
    pub fn requires_reauthentication(self) -> bool {
        matches!(
            self,
            AuthErrorKind::TokenInvalid
                | AuthErrorKind::TokenExpired
                | AuthErrorKind::AccountNotFound
                | AuthErrorKind::AccountInactive
                | AuthErrorKind::TokenReuseOrStale
        )
    }
}

impl core::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl AuthError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn token_invalid(msg: impl Into<String>) -> Self {
        Self::TokenInvalid(msg.into())
    }

    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Configuration(_) => AuthErrorKind::ConfigurationError,
            AuthError::TokenInvalid(_) => AuthErrorKind::TokenInvalid,
            AuthError::TokenExpired => AuthErrorKind::TokenExpired,
            AuthError::AccountNotFound => AuthErrorKind::AccountNotFound,
            AuthError::AccountInactive => AuthErrorKind::AccountInactive,
            AuthError::TokenReuseOrStale => AuthErrorKind::TokenReuseOrStale,
            AuthError::InvalidUserTier(_) => AuthErrorKind::InvalidUserTier,
            AuthError::InvalidRole(_) => AuthErrorKind::InvalidRole,
            AuthError::InsufficientPermissions(_) => AuthErrorKind::InsufficientPermissions,
            AuthError::Store(_) => AuthErrorKind::StoreUnavailable,
        }
    }
}
