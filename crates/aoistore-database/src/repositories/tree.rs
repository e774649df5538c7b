//! Cross-table lifecycle updates applied atomically to a whole subtree.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use aoistore_core::error::{AppError, ErrorKind};
use aoistore_core::result::AppResult;
use aoistore_entity::node::{NodeKind, NodeRef};

/// Repository for lifecycle transitions spanning directories and files.
///
/// Each operation runs in a single transaction and applies updates in the
/// order given, so a failure anywhere leaves every node untouched.
#[derive(Debug, Clone)]
pub struct TreeRepository {
    pool: SqlitePool,
}

fn table(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Directory => "directories",
        NodeKind::File => "files",
    }
}

impl TreeRepository {
    /// Create a new tree repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stamp `removed_at` on every node that is not removed yet.
    ///
    /// Returns the number of nodes stamped.
    pub async fn soft_remove(&self, nodes: &[NodeRef], at: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let mut stamped = 0;
        for node in nodes {
            let sql = format!(
                "UPDATE {} SET removed_at = ? WHERE id = ? AND removed_at IS NULL",
                table(node.kind)
            );
            let result = sqlx::query(&sql)
                .bind(at)
                .bind(node.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, format!("Failed to remove {node}"), e)
                })?;
            stamped += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit removal", e)
        })?;
        Ok(stamped)
    }

    /// Clear `active` on every node, in order.
    pub async fn deactivate(&self, nodes: &[NodeRef]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        for node in nodes {
            let sql = format!("UPDATE {} SET active = 0 WHERE id = ?", table(node.kind));
            sqlx::query(&sql)
                .bind(node.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, format!("Failed to deactivate {node}"), e)
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit deactivation", e)
        })?;
        Ok(())
    }

    /// Undo a removal stamped at exactly `at`.
    ///
    /// Only used to compensate an update whose replacement failed to import.
    pub async fn clear_removal(&self, nodes: &[NodeRef], at: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        for node in nodes {
            let sql = format!(
                "UPDATE {} SET removed_at = NULL WHERE id = ? AND removed_at = ?",
                table(node.kind)
            );
            sqlx::query(&sql)
                .bind(node.id)
                .bind(at)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, format!("Failed to restore {node}"), e)
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit restore", e)
        })?;
        Ok(())
    }
}
