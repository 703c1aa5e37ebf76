//! SQLite backend: one row per subscriber.

use super::{EntitlementStore, KeyedLocks};
use async_trait::async_trait;
use chrono::NaiveDate;
use slipbot_core::{
    entitlement::{EntitlementRecord, Grant},
    error::SlipbotError,
    identity::SubscriberId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Entitlement store backed by SQLite.
pub struct SqliteStore {
    pub(super) pool: SqlitePool,
    locks: KeyedLocks,
}

type Row = (Option<String>, Option<String>, i64);

impl SqliteStore {
    /// Open (creating if missing) the database at `db_path` and run migrations.
    pub async fn open(db_path: &str) -> Result<Self, SlipbotError> {
        if let Some(parent) = std::path::Path::new(db_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                SlipbotError::StoreUnavailable(format!("failed to create data dir: {e}"))
            })?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| SlipbotError::StoreUnavailable(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| {
                SlipbotError::StoreUnavailable(format!("failed to connect to sqlite: {e}"))
            })?;

        let store = Self::with_pool(pool).await?;
        info!("Entitlement store initialized at {db_path}");
        Ok(store)
    }

    /// Wrap an existing pool, running migrations first.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, SlipbotError> {
        Self::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            locks: KeyedLocks::new(),
        })
    }

    /// Run SQL migrations, tracking which have already been applied.
    pub(super) async fn run_migrations(pool: &SqlitePool) -> Result<(), SlipbotError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| store_err("failed to create migrations table", e))?;

        let migrations: &[(&str, &str)] = &[(
            "001_entitlements",
            include_str!("../../migrations/001_entitlements.sql"),
        )];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| store_err(&format!("failed to check migration {name}"), e))?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| store_err(&format!("migration {name} failed"), e))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| store_err(&format!("failed to record migration {name}"), e))?;
        }
        Ok(())
    }
}

fn store_err(context: &str, e: sqlx::Error) -> SlipbotError {
    SlipbotError::StoreUnavailable(format!("{context}: {e}"))
}

fn parse_grant(column: Option<String>) -> Result<Option<Grant>, SlipbotError> {
    column
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(|granted_on| Grant { granted_on })
                .map_err(|e| SlipbotError::StoreUnavailable(format!("bad grant date {s:?}: {e}")))
        })
        .transpose()
}

fn format_grant(grant: Option<Grant>) -> Option<String> {
    grant.map(|g| g.granted_on.format("%Y-%m-%d").to_string())
}

#[async_trait]
impl EntitlementStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, id: &SubscriberId) -> Result<EntitlementRecord, SlipbotError> {
        let row: Option<Row> = sqlx::query_as(
            "SELECT normal_granted_on, premium_granted_on, rules_accepted \
             FROM entitlements WHERE subscriber_id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_err("query failed", e))?;

        let Some((normal, premium, rules_accepted)) = row else {
            return Ok(EntitlementRecord::default());
        };

        Ok(EntitlementRecord {
            normal_grant: parse_grant(normal)?,
            premium_grant: parse_grant(premium)?,
            rules_accepted: rules_accepted != 0,
        })
    }

    async fn put(&self, id: &SubscriberId, record: &EntitlementRecord) -> Result<(), SlipbotError> {
        sqlx::query(
            "INSERT INTO entitlements \
             (subscriber_id, normal_granted_on, premium_granted_on, rules_accepted) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(subscriber_id) DO UPDATE SET \
             normal_granted_on = excluded.normal_granted_on, \
             premium_granted_on = excluded.premium_granted_on, \
             rules_accepted = excluded.rules_accepted, \
             updated_at = datetime('now')",
        )
        .bind(id.as_str())
        .bind(format_grant(record.normal_grant))
        .bind(format_grant(record.premium_grant))
        .bind(record.rules_accepted as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err("upsert entitlement failed", e))?;

        Ok(())
    }

    async fn count(&self) -> Result<usize, SlipbotError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entitlements")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_err("count failed", e))?;
        Ok(count as usize)
    }

    async fn close(&self) -> Result<(), SlipbotError> {
        self.pool.close().await;
        Ok(())
    }

    fn locks(&self) -> &KeyedLocks {
        &self.locks
    }
}
