//! libSQL-backed interaction log.
//!
//! The [`InteractionLog`] records one row per query/reply exchange for
//! later review. Callers treat it as fire-and-forget: a logging failure is
//! warned about and must never fail the response path.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use uuid::Uuid;

use courseadvisor_shared::{AdvisorError, Result};

/// One logged exchange.
#[derive(Debug, Clone)]
pub struct LoggedInteraction {
    pub id: String,
    pub user_id: String,
    pub query: String,
    pub reply: String,
    pub created_at: String,
}

/// Storage handle wrapping a libSQL database.
pub struct InteractionLog {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl InteractionLog {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AdvisorError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AdvisorError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| AdvisorError::Storage(e.to_string()))?;

        let log = Self { db, conn };
        log.run_migrations().await?;
        Ok(log)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    AdvisorError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Append one exchange to the log.
    pub async fn record(&self, user_id: &str, query: &str, reply: &str) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO interactions (id, user_id, query, reply, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.as_str(), user_id, query, reply, now.as_str()],
            )
            .await
            .map_err(|e| AdvisorError::Storage(e.to_string()))?;
        Ok(())
    }

    /// The `limit` most recent exchanges, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<LoggedInteraction>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, query, reply, created_at
                 FROM interactions ORDER BY created_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| AdvisorError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(LoggedInteraction {
                id: row
                    .get::<String>(0)
                    .map_err(|e| AdvisorError::Storage(e.to_string()))?,
                user_id: row
                    .get::<String>(1)
                    .map_err(|e| AdvisorError::Storage(e.to_string()))?,
                query: row
                    .get::<String>(2)
                    .map_err(|e| AdvisorError::Storage(e.to_string()))?,
                reply: row
                    .get::<String>(3)
                    .map_err(|e| AdvisorError::Storage(e.to_string()))?,
                created_at: row
                    .get::<String>(4)
                    .map_err(|e| AdvisorError::Storage(e.to_string()))?,
            });
        }
        Ok(results)
    }
}
