//! AOI and pour point repository implementation.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use aoistore_core::error::{AppError, ErrorKind};
use aoistore_core::result::AppResult;
use aoistore_entity::aoi::{Aoi, CreateAoi, CreatePourPoint, PourPoint};

use super::insert_error;

/// Repository for AOI records and the pour points they reference.
#[derive(Debug, Clone)]
pub struct AoiRepository {
    pool: SqlitePool,
}

impl AoiRepository {
    /// Create a new AOI repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find an AOI by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Aoi>> {
        sqlx::query_as::<_, Aoi>("SELECT * FROM aois WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find AOI", e))
    }

    /// Find an AOI by ID, failing with `NotFound` when absent.
    pub async fn get(&self, id: Uuid) -> AppResult<Aoi> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("AOI {id} not found")))
    }

    /// The current AOI with the given name.
    pub async fn find_current_by_name(&self, name: &str) -> AppResult<Option<Aoi>> {
        sqlx::query_as::<_, Aoi>(
            "SELECT * FROM aois WHERE name = ? AND active = 1 AND removed_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find AOI by name", e))
    }

    /// All AOIs, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<Aoi>> {
        sqlx::query_as::<_, Aoi>("SELECT * FROM aois ORDER BY created_at ASC, name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list AOIs", e))
    }

    /// AOIs nested directly under `parent_id`.
    pub async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Aoi>> {
        sqlx::query_as::<_, Aoi>(
            "SELECT * FROM aois WHERE parent_aoi_id = ? ORDER BY created_at ASC, name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list child AOIs", e))
    }

    /// Insert a provisional AOI record.
    pub async fn insert_provisional(&self, data: &CreateAoi) -> AppResult<Aoi> {
        sqlx::query_as::<_, Aoi>(
            "INSERT INTO aois \
             (id, name, shortname, boundary, pourpoint_id, parent_aoi_id, comment, created_by, created_at, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'provisional') RETURNING *",
        )
        .bind(data.id)
        .bind(&data.name)
        .bind(&data.shortname)
        .bind(&data.boundary)
        .bind(data.pourpoint_id)
        .bind(data.parent_aoi_id)
        .bind(&data.comment)
        .bind(&data.created_by)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, "AOI", || format!("An AOI named '{}' already exists", data.name)))
    }

    /// Mark a provisional AOI as finalized.
    pub async fn finalize(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE aois SET status = 'finalized' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to finalize AOI", e))?;
        Ok(())
    }

    /// Stamp the removal instant on a current AOI.
    pub async fn mark_removed(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query("UPDATE aois SET removed_at = ? WHERE id = ? AND removed_at IS NULL")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to remove AOI", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the active flag.
    pub async fn deactivate(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE aois SET active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to deactivate AOI", e))?;
        Ok(())
    }

    /// Delete an AOI (cascades to its whole directory tree).
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM aois WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete AOI", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a pour point by ID.
    pub async fn find_pourpoint(&self, id: Uuid) -> AppResult<Option<PourPoint>> {
        sqlx::query_as::<_, PourPoint>("SELECT * FROM pourpoints WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find pour point", e))
    }

    /// All recorded pour points.
    pub async fn find_all_pourpoints(&self) -> AppResult<Vec<PourPoint>> {
        sqlx::query_as::<_, PourPoint>("SELECT * FROM pourpoints ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list pour points", e))
    }

    /// Record a new pour point.
    pub async fn create_pourpoint(&self, data: &CreatePourPoint, at: DateTime<Utc>) -> AppResult<PourPoint> {
        sqlx::query_as::<_, PourPoint>(
            "INSERT INTO pourpoints (id, name, longitude, latitude, boundary, awdb_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(data.location.longitude)
        .bind(data.location.latitude)
        .bind(&data.boundary)
        .bind(&data.awdb_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create pour point", e))
    }

    /// Attach a boundary to a pour point that has none.
    pub async fn fill_pourpoint_boundary(&self, id: Uuid, boundary: &str) -> AppResult<()> {
        sqlx::query("UPDATE pourpoints SET boundary = ? WHERE id = ? AND boundary IS NULL")
            .bind(boundary)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update pour point boundary", e)
            })?;
        Ok(())
    }
}
