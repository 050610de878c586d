//! Configuration loading and representation.
//!
//! Everything is read once at startup. A missing or unusable signing secret is
//! a `Configuration` error and the process must not start.

use std::net::SocketAddr;

use fleetgate_auth::{AuthError, TokenCodec};

pub const ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_TOKEN_SECRET: &str = "REFRESH_TOKEN_SECRET";
pub const BIND_ADDR: &str = "BIND_ADDR";
pub const USE_PERSISTENT_STORES: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL: &str = "DATABASE_URL";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { database_url: String },
}

/// Process configuration. Secrets are consumed into the codec and not kept.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub codec: TokenCodec,
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access = required(&lookup, ACCESS_TOKEN_SECRET)?;
        let refresh = required(&lookup, REFRESH_TOKEN_SECRET)?;
        let codec = TokenCodec::new(access.as_bytes(), refresh.as_bytes())?;

        let bind_addr = lookup(BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AuthError::configuration(format!("{BIND_ADDR}: {e}")))?;

        let persistent = match lookup(USE_PERSISTENT_STORES) {
            None => false,
            Some(v) => v
                .trim()
                .parse::<bool>()
                .map_err(|e| AuthError::configuration(format!("{USE_PERSISTENT_STORES}: {e}")))?,
        };

        let store = if persistent {
            StoreBackend::Postgres {
                database_url: required(&lookup, DATABASE_URL)?,
            }
        } else {
            StoreBackend::InMemory
        };

        Ok(Self {
            codec,
            bind_addr,
            store,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::configuration(format!("{key} must be set")))
}
