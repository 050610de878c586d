//! Postgres-backed user collections.
//!
//! One table per tier. Each table carries the same account columns plus the
//! single refresh-token slot:
//!
//! | Column | Type |
//! |--------|------|
//! | `id` | `TEXT PRIMARY KEY` |
//! | `email` | `TEXT NOT NULL` |
//! | `name` | `TEXT NOT NULL` |
//! | `role` | `TEXT NULL` (only meaningful in `users`) |
//! | `is_active` | `BOOLEAN NOT NULL` |
//! | `refresh_token` | `TEXT NULL` |
//! | `organization_id` | `TEXT NULL` |
//!
//! Rotation is a single conditional `UPDATE`, so the compare-and-swap holds
//! across any number of API replicas.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use fleetgate_auth::{AccountState, Role, StoreError, TieredAccountStore, UserCollection, UserTier};
use fleetgate_core::{AccountId, OrganizationId};

/// Backing table of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTable {
    SuperAdmins,
    Admins,
    Organizations,
    Users,
}

impl UserTable {
    pub fn for_tier(tier: UserTier) -> Self {
        match tier {
            UserTier::SuperAdmin => UserTable::SuperAdmins,
            UserTier::Admin => UserTable::Admins,
            UserTier::Organization => UserTable::Organizations,
            UserTier::User => UserTable::Users,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UserTable::SuperAdmins => "super_admins",
            UserTable::Admins => "admins",
            UserTable::Organizations => "organizations",
            UserTable::Users => "users",
        }
    }

    pub fn create_statement(self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                role TEXT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                refresh_token TEXT NULL,
                organization_id TEXT NULL
            )
            "#,
            self.name()
        )
    }
}

#[derive(Debug, Clone)]
pub struct PostgresCollection {
    pool: Arc<PgPool>,
    table: UserTable,
}

impl PostgresCollection {
    pub fn new(pool: Arc<PgPool>, table: UserTable) -> Self {
        Self { pool, table }
    }

    pub fn table(&self) -> UserTable {
        self.table
    }

    fn account_from_row(&self, row: &PgRow) -> Result<AccountState, StoreError> {
        let corrupt = |e: sqlx::Error| StoreError::corrupt(format!("{}: {e}", self.table.name()));

        let id: String = row.try_get("id").map_err(corrupt)?;
        let role: Option<String> = row.try_get("role").map_err(corrupt)?;
        let role = role
            .map(|r| r.parse::<Role>())
            .transpose()
            .map_err(|e| StoreError::corrupt(format!("{}.{id}: {e}", self.table.name())))?;
        let organization_id: Option<String> = row.try_get("organization_id").map_err(corrupt)?;
        let organization_id = organization_id
            .map(|o| o.parse::<OrganizationId>())
            .transpose()
            .map_err(|e| StoreError::corrupt(format!("{}.{id}: {e}", self.table.name())))?;
        let account_id = id
            .parse::<AccountId>()
            .map_err(|e| StoreError::corrupt(format!("{}: {e}", self.table.name())))?;

        Ok(AccountState {
            id: account_id,
            email: row.try_get("email").map_err(corrupt)?,
            name: row.try_get("name").map_err(corrupt)?,
            role,
            is_active: row.try_get("is_active").map_err(corrupt)?,
            stored_refresh_token: row.try_get("refresh_token").map_err(corrupt)?,
            organization_id,
        })
    }
}

#[async_trait]
impl UserCollection for PostgresCollection {
    #[instrument(skip(self), fields(table = self.table.name()), err)]
    async fn find(&self, id: &AccountId) -> Result<Option<AccountState>, StoreError> {
        let sql = format!(
            "SELECT id, email, name, role, is_active, refresh_token, organization_id FROM {} WHERE id = $1",
            self.table.name()
        );
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;

        row.map(|r| self.account_from_row(&r)).transpose()
    }

    #[instrument(skip(self, value), fields(table = self.table.name(), clear = value.is_none()), err)]
    async fn set_refresh_token(&self, id: &AccountId, value: Option<&str>) -> Result<bool, StoreError> {
        let sql = format!("UPDATE {} SET refresh_token = $1 WHERE id = $2", self.table.name());
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_refresh_token", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, expected, new), fields(table = self.table.name()), err)]
    async fn compare_and_swap_refresh_token(
        &self,
        id: &AccountId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE {} SET refresh_token = $1 WHERE id = $2 AND refresh_token = $3",
            self.table.name()
        );
        let result = sqlx::query(&sql)
            .bind(new)
            .bind(id.as_str())
            .bind(expected)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("compare_and_swap_refresh_token", e))?;

        Ok(result.rows_affected() == 1)
    }
}

/// Build the tiered account store over one pool.
pub fn postgres_account_store(pool: PgPool) -> TieredAccountStore {
    let pool = Arc::new(pool);
    let collection = |tier| Arc::new(PostgresCollection::new(pool.clone(), UserTable::for_tier(tier)));
    TieredAccountStore::new(
        collection(UserTier::SuperAdmin),
        collection(UserTier::Admin),
        collection(UserTier::Organization),
        collection(UserTier::User),
    )
}

/// Create the four tables if they do not exist (dev/test bootstrap).
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for tier in UserTier::ALL {
        sqlx::query(&UserTable::for_tier(tier).create_statement())
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::unavailable(format!("connection pool closed in {operation}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::corrupt(format!("{operation}: {err}"))
        }
        _ => StoreError::unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tier_has_its_own_table() {
        let names: Vec<&str> = UserTier::ALL
            .iter()
            .map(|t| UserTable::for_tier(*t).name())
            .collect();
        assert_eq!(names, vec!["super_admins", "admins", "organizations", "users"]);
    }

    #[test]
    fn create_statement_declares_the_refresh_slot() {
        let sql = UserTable::Users.create_statement();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(sql.contains("refresh_token TEXT NULL"));
    }

    #[test]
    fn decode_failures_are_reported_as_corruption() {
        let err = map_sqlx_error("find", sqlx::Error::ColumnNotFound("role".to_string()));
        assert!(matches!(err, StoreError::Corrupt(_)));
        let err = map_sqlx_error("find", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
