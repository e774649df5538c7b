//! Directory repository implementation.

use sqlx::SqlitePool;
use uuid::Uuid;

use aoistore_core::error::{AppError, ErrorKind};
use aoistore_core::result::AppResult;
use aoistore_entity::directory::{CreateDirectory, Directory};

use super::insert_error;

/// Repository for directory records.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: SqlitePool,
}

impl DirectoryRepository {
    /// Create a new directory repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a directory by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>("SELECT * FROM directories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find directory", e))
    }

    /// Find a directory by ID, failing with `NotFound` when absent.
    pub async fn get(&self, id: Uuid) -> AppResult<Directory> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))
    }

    /// All child directories of a parent, in every lifecycle state.
    pub async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE parent_id = ? ORDER BY created_at ASC, name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list child directories", e))
    }

    /// The current child directory with the given name, if any.
    pub async fn find_current_child(&self, parent_id: Uuid, name: &str) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories \
             WHERE parent_id = ? AND name = ? AND active = 1 AND removed_at IS NULL",
        )
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find child directory", e))
    }

    /// All root directories recorded for an AOI, newest first.
    pub async fn find_roots(&self, aoi_id: Uuid) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>(
            "SELECT * FROM directories WHERE aoi_id = ? AND parent_id IS NULL \
             ORDER BY created_at DESC",
        )
        .bind(aoi_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find AOI root", e))
    }

    /// Insert a provisional directory record.
    ///
    /// Fails with `Conflict` when a current sibling already uses the name.
    pub async fn insert_provisional(&self, data: &CreateDirectory) -> AppResult<Directory> {
        sqlx::query_as::<_, Directory>(
            "INSERT INTO directories \
             (id, aoi_id, parent_id, name, type_tag, archiving_rule, comment, created_by, created_at, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'provisional') RETURNING *",
        )
        .bind(data.id)
        .bind(data.aoi_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.type_tag)
        .bind(data.archiving_rule)
        .bind(&data.comment)
        .bind(&data.created_by)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            insert_error(e, "directory", || {
                format!("A directory named '{}' already exists here", data.name)
            })
        })
    }

    /// Mark a provisional directory as finalized.
    pub async fn finalize(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE directories SET status = 'finalized' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to finalize directory", e))?;
        Ok(())
    }

    /// Persist the on-disk path if none is recorded yet.
    ///
    /// Returns the path that is stored afterwards, which is the existing one
    /// when another caller got there first.
    pub async fn cache_fs_path(&self, id: Uuid, fs_path: &str) -> AppResult<String> {
        sqlx::query("UPDATE directories SET fs_path = ? WHERE id = ? AND fs_path IS NULL")
            .bind(fs_path)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cache directory path", e))?;

        let stored =
            sqlx::query_scalar::<_, Option<String>>("SELECT fs_path FROM directories WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to read directory path", e)
                })?
                .flatten();

        stored.ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))
    }

    /// Whether a directory other than `except` already owns `fs_path`.
    pub async fn fs_path_claimed(&self, fs_path: &str, except: Uuid) -> AppResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM directories WHERE fs_path = ? AND id != ?")
                .bind(fs_path)
                .bind(except)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to check directory path", e)
                })?;
        Ok(count > 0)
    }

    /// Delete a directory (cascades to child directories, files and versions).
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM directories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete directory", e))?;
        Ok(result.rows_affected() > 0)
    }
}
