//! File and version repository implementation.

use sqlx::SqlitePool;
use uuid::Uuid;

use aoistore_core::error::{AppError, ErrorKind};
use aoistore_core::result::AppResult;
use aoistore_entity::file::{CreateFile, CreateFileData, File, FileData};

use super::insert_error;

/// Repository for file records and their versions.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    /// Find a file by ID, failing with `NotFound` when absent.
    pub async fn get(&self, id: Uuid) -> AppResult<File> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// All files in a directory, in every lifecycle state.
    pub async fn find_in_directory(&self, directory_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE directory_id = ? ORDER BY created_at ASC, name ASC",
        )
        .bind(directory_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    /// The current file with the given name in a directory, if any.
    pub async fn find_current_by_name(&self, directory_id: Uuid, name: &str) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE directory_id = ? AND name = ? AND active = 1 AND removed_at IS NULL",
        )
        .bind(directory_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file by name", e))
    }

    /// Insert a provisional file record.
    ///
    /// Fails with `Conflict` when a current sibling already uses the name.
    pub async fn insert_provisional(&self, data: &CreateFile) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files \
             (id, aoi_id, directory_id, name, type_tag, comment, created_by, created_at, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'provisional') RETURNING *",
        )
        .bind(data.id)
        .bind(data.aoi_id)
        .bind(data.directory_id)
        .bind(&data.name)
        .bind(&data.type_tag)
        .bind(&data.comment)
        .bind(&data.created_by)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            insert_error(e, "file", || {
                format!("A file named '{}' already exists here", data.name)
            })
        })
    }

    /// Mark a provisional file as finalized.
    pub async fn finalize(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE files SET status = 'finalized' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to finalize file", e))?;
        Ok(())
    }

    /// Delete a file (cascades to its versions).
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// All versions of a file, oldest first, ties in insertion order.
    pub async fn find_versions(&self, file_id: Uuid) -> AppResult<Vec<FileData>> {
        let mut versions = sqlx::query_as::<_, FileData>(
            "SELECT * FROM file_data WHERE file_id = ? ORDER BY seq ASC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list file versions", e))?;
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(versions)
    }

    /// Find a version by ID.
    pub async fn find_version(&self, id: Uuid) -> AppResult<Option<FileData>> {
        sqlx::query_as::<_, FileData>("SELECT * FROM file_data WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file version", e))
    }

    /// The current version of a file: greatest `created_at`, then `seq`.
    pub async fn find_latest_version(&self, file_id: Uuid) -> AppResult<Option<FileData>> {
        Ok(self.find_versions(file_id).await?.pop())
    }

    /// Append a version. Versions are never updated afterwards.
    pub async fn insert_version(&self, data: &CreateFileData) -> AppResult<FileData> {
        sqlx::query_as::<_, FileData>(
            "INSERT INTO file_data \
             (id, file_id, content_hash, encoding, size_bytes, storage_path, comment, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(data.id)
        .bind(data.file_id)
        .bind(&data.content_hash)
        .bind(&data.encoding)
        .bind(data.size_bytes)
        .bind(&data.storage_path)
        .bind(&data.comment)
        .bind(&data.created_by)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create file version", e))
    }
}
