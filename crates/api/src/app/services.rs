//! Store selection and service construction.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use fleetgate_auth::{AuthService, InMemoryCollections};
use fleetgate_core::SystemClock;
use fleetgate_infra::{AuthConfig, StoreBackend, postgres};

use super::{SharedAuth, SharedStore};

/// Connect the configured store and build the service every handler shares.
pub async fn build_services(config: &AuthConfig) -> anyhow::Result<SharedAuth> {
    let store: SharedStore = match &config.store {
        StoreBackend::InMemory => {
            tracing::warn!("using in-memory account store; refresh tokens do not survive a restart");
            Arc::new(InMemoryCollections::new().store())
        }
        StoreBackend::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            postgres::ensure_schema(&pool).await?;
            tracing::info!("connected to postgres account store");
            Arc::new(postgres::postgres_account_store(pool))
        }
    };

    Ok(Arc::new(AuthService::new(
        config.codec.clone(),
        store,
        Arc::new(SystemClock),
    )))
}
