//! Infrastructure layer: configuration and the relational user store.

pub mod config;
pub mod postgres;

pub use config::{AuthConfig, StoreBackend};
pub use postgres::{PostgresCollection, UserTable, postgres_account_store};
