//! File lifecycle service for LocalCloud.
//!
//! Upload, versioning, soft-delete, restore, permanent delete, duplicate
//! discovery and storage statistics. Every multi-step mutation runs in one
//! transaction; enrichment runs after commit and never fails the operation.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::duplicate::{group_duplicates, DuplicateReport};
use super::folder::FolderRepository;
use super::hasher;
use super::metadata::{FileMetadata, FileRepository, NewFile};
use super::quota::{QuotaLedger, StorageLimit};
use super::tree::FolderTreeService;
use super::version::{FileVersion, VersionRepository};
use crate::analysis::codec::cosine_similarity;
use crate::analysis::Enricher;
use crate::config::StorageConfig;
use crate::db::Database;
use crate::{LocalCloudError, Result};

/// Fallback display name when sanitizing leaves nothing.
const FALLBACK_FILENAME: &str = "file";

/// An incoming payload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Filename as supplied by the client.
    pub original_name: String,
    /// Payload.
    pub bytes: Vec<u8>,
    /// MIME type; guessed from the name when absent or blank.
    pub mime_type: Option<String>,
    /// Target folder (None = root). Ignored for new versions.
    pub folder_id: Option<i64>,
}

impl Upload {
    /// Create an upload at the root with a guessed MIME type.
    pub fn new(original_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes,
            mime_type: None,
            folder_id: None,
        }
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the target folder.
    pub fn in_folder(mut self, folder_id: Option<i64>) -> Self {
        self.folder_id = folder_id;
        self
    }
}

/// A file ranked by embedding similarity.
#[derive(Debug, Clone)]
pub struct SimilarFile {
    /// The candidate.
    pub file: FileMetadata,
    /// Cosine similarity to the source file.
    pub score: f32,
}

/// Storage statistics for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Files in any state.
    pub file_count: i64,
    /// Soft-deleted files.
    pub deleted_file_count: i64,
    /// Archived versions.
    pub version_count: i64,
    /// Bytes held by file rows.
    pub file_bytes: i64,
    /// Bytes held by versions.
    pub version_bytes: i64,
    /// Total counted against the quota.
    pub used_bytes: i64,
    /// Resolved ceiling.
    pub limit: StorageLimit,
}

/// Reduce a client filename to a filesystem-safe display name.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// The caller's MIME type, or one guessed from the filename.
pub fn resolve_mime_type(mime_type: Option<&str>, original_name: &str) -> String {
    match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(original_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// File lifecycle service.
#[derive(Clone)]
pub struct FileService {
    db: Database,
    enricher: Enricher,
    default_quota_mb: i64,
    max_upload_bytes: Option<u64>,
}

impl FileService {
    /// Create a new file service without analysis.
    pub fn new(db: Database, storage: &StorageConfig) -> Self {
        Self {
            db,
            enricher: Enricher::disabled(),
            default_quota_mb: storage.default_quota_mb,
            max_upload_bytes: storage.max_upload_bytes(),
        }
    }

    /// Attach an enrichment runner.
    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = enricher;
        self
    }

    /// The underlying database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Folder operations over the same database.
    pub fn folders(&self) -> FolderTreeService {
        FolderTreeService::new(self.db.clone())
    }

    /// The quota ledger.
    pub fn quota(&self) -> QuotaLedger<'_> {
        QuotaLedger::new(self.db.pool(), self.default_quota_mb)
    }

    fn validate_payload(&self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(LocalCloudError::InvalidInput("file is empty".to_string()));
        }
        if let Some(max) = self.max_upload_bytes {
            if bytes.len() as u64 > max {
                return Err(LocalCloudError::InvalidInput(format!(
                    "file exceeds the {} MB upload limit",
                    max / (1024 * 1024)
                )));
            }
        }
        Ok(())
    }

    async fn reload(&self, user_id: i64, file: FileMetadata) -> Result<FileMetadata> {
        Ok(FileRepository::new(self.db.pool())
            .get_owned(user_id, file.id)
            .await?
            .unwrap_or(file))
    }

    /// Store a new file.
    pub async fn upload(&self, user_id: i64, upload: Upload) -> Result<FileMetadata> {
        self.validate_payload(&upload.bytes)?;
        self.quota()
            .ensure_available(user_id, upload.bytes.len() as i64)
            .await?;

        if let Some(folder_id) = upload.folder_id {
            if FolderRepository::new(self.db.pool())
                .get_active(user_id, folder_id)
                .await?
                .is_none()
            {
                return Err(LocalCloudError::NotFound("folder".to_string()));
            }
        }

        let hash = hasher::digest(&upload.bytes);
        let mime_type = resolve_mime_type(upload.mime_type.as_deref(), &upload.original_name);
        let new_file = NewFile::new(
            user_id,
            sanitize_filename(&upload.original_name),
            upload.original_name,
            mime_type,
            upload.bytes,
        )
        .with_folder(upload.folder_id)
        .with_hash(hash);

        let file = FileRepository::new(self.db.pool()).create(&new_file).await?;
        info!(user_id, file_id = file.id, bytes = file.size, "File uploaded");

        self.enricher
            .enrich(self.db.pool(), &file, &new_file.content)
            .await;
        self.reload(user_id, file).await
    }

    /// Replace a live file's payload, archiving the current one first.
    ///
    /// The content digest keeps the value computed at upload.
    pub async fn upload_version(
        &self,
        user_id: i64,
        file_id: i64,
        upload: Upload,
    ) -> Result<FileMetadata> {
        self.validate_payload(&upload.bytes)?;

        let files = FileRepository::new(self.db.pool());
        let parent = files
            .get_in_state(user_id, file_id, false)
            .await?
            .ok_or_else(|| LocalCloudError::NotFound("parent file".to_string()))?;

        self.quota()
            .ensure_available(user_id, upload.bytes.len() as i64)
            .await?;

        let mime_type = resolve_mime_type(upload.mime_type.as_deref(), &upload.original_name);
        let filename = sanitize_filename(&upload.original_name);
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let live: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM files WHERE id = ? AND user_id = ? AND is_deleted = 0",
        )
        .bind(parent.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if live.0 == 0 {
            return Err(LocalCloudError::NotFound("parent file".to_string()));
        }

        let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM file_versions WHERE file_id = ?")
            .bind(parent.id)
            .fetch_one(&mut *tx)
            .await?;
        let version = existing.0 + 1;

        sqlx::query(
            "INSERT INTO file_versions (file_id, version, content, size, mime_type, created_at)
             SELECT id, ?, content, size, mime_type, ? FROM files WHERE id = ?",
        )
        .bind(version)
        .bind(now)
        .bind(parent.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE files SET content = ?, size = ?, mime_type = ?, filename = ?,
                              original_name = ?, summary = NULL, tags = NULL,
                              embedding = NULL, updated_at = ?
             WHERE id = ?",
        )
        .bind(&upload.bytes)
        .bind(upload.bytes.len() as i64)
        .bind(&mime_type)
        .bind(&filename)
        .bind(&upload.original_name)
        .bind(now)
        .bind(parent.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            user_id,
            file_id = parent.id,
            version,
            bytes = upload.bytes.len(),
            "File version uploaded"
        );

        let file = self.reload(user_id, parent).await?;
        self.enricher
            .enrich(self.db.pool(), &file, &upload.bytes)
            .await;
        self.reload(user_id, file).await
    }

    /// Move a live file to the recycle bin.
    pub async fn soft_delete(&self, user_id: i64, file_id: i64) -> Result<()> {
        if !FileRepository::new(self.db.pool())
            .set_deleted(user_id, file_id, true)
            .await?
        {
            return Err(LocalCloudError::NotFound("file".to_string()));
        }

        info!(user_id, file_id, "File moved to recycle bin");
        self.enricher.forget(file_id).await;
        Ok(())
    }

    /// Bring a soft-deleted file back and re-run enrichment.
    pub async fn restore(&self, user_id: i64, file_id: i64) -> Result<FileMetadata> {
        let files = FileRepository::new(self.db.pool());
        if !files.set_deleted(user_id, file_id, false).await? {
            return Err(LocalCloudError::NotFound("file".to_string()));
        }
        info!(user_id, file_id, "File restored");

        let file = files
            .get_owned(user_id, file_id)
            .await?
            .ok_or_else(|| LocalCloudError::NotFound("file".to_string()))?;

        if self.enricher.is_enabled() {
            if let Some(content) = files.get_content(user_id, file_id).await? {
                self.enricher.enrich(self.db.pool(), &file, &content).await;
                return self.reload(user_id, file).await;
            }
        }
        Ok(file)
    }

    /// Remove a file and its versions for good. Works in either state.
    pub async fn permanent_delete(&self, user_id: i64, file_id: i64) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let owned: Option<(i64,)> = sqlx::query_as("SELECT id FROM files WHERE id = ? AND user_id = ?")
            .bind(file_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if owned.is_none() {
            return Err(LocalCloudError::NotFound("file".to_string()));
        }

        let versions = sqlx::query("DELETE FROM file_versions WHERE file_id = ?")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            user_id,
            file_id,
            versions = versions.rows_affected(),
            "File permanently deleted"
        );

        self.enricher.forget(file_id).await;
        Ok(())
    }

    /// Metadata of a live file.
    pub async fn get_file(&self, user_id: i64, file_id: i64) -> Result<FileMetadata> {
        FileRepository::new(self.db.pool())
            .get_in_state(user_id, file_id, false)
            .await?
            .ok_or_else(|| LocalCloudError::NotFound("file".to_string()))
    }

    /// Metadata and payload of a live file.
    pub async fn download(&self, user_id: i64, file_id: i64) -> Result<(FileMetadata, Vec<u8>)> {
        let file = self.get_file(user_id, file_id).await?;
        let content = FileRepository::new(self.db.pool())
            .get_content(user_id, file_id)
            .await?
            .ok_or_else(|| LocalCloudError::NotFound("file".to_string()))?;

        debug!(user_id, file_id, bytes = content.len(), "File downloaded");
        Ok((file, content))
    }

    /// Live files at the root (None) or in a live folder, newest first.
    pub async fn list_files(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>> {
        if let Some(folder_id) = folder_id {
            if FolderRepository::new(self.db.pool())
                .get_active(user_id, folder_id)
                .await?
                .is_none()
            {
                return Err(LocalCloudError::NotFound("folder".to_string()));
            }
        }

        FileRepository::new(self.db.pool())
            .list_active_in(user_id, folder_id)
            .await
    }

    /// Soft-deleted files, most recently deleted first.
    pub async fn list_deleted_files(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        FileRepository::new(self.db.pool())
            .list_deleted(user_id)
            .await
    }

    /// Archived versions of a file, oldest first.
    pub async fn list_versions(&self, user_id: i64, file_id: i64) -> Result<Vec<FileVersion>> {
        if FileRepository::new(self.db.pool())
            .get_owned(user_id, file_id)
            .await?
            .is_none()
        {
            return Err(LocalCloudError::NotFound("file".to_string()));
        }

        VersionRepository::new(self.db.pool())
            .list(user_id, file_id)
            .await
    }

    /// Payload of an archived version.
    pub async fn download_version(
        &self,
        user_id: i64,
        file_id: i64,
        version: i64,
    ) -> Result<(FileVersion, Vec<u8>)> {
        VersionRepository::new(self.db.pool())
            .get_with_content(user_id, file_id, version)
            .await?
            .ok_or_else(|| LocalCloudError::NotFound("version".to_string()))
    }

    /// Move a live file to the root (None) or another live folder.
    pub async fn move_file(
        &self,
        user_id: i64,
        file_id: i64,
        folder_id: Option<i64>,
    ) -> Result<FileMetadata> {
        let file = self.get_file(user_id, file_id).await?;

        if let Some(folder_id) = folder_id {
            if FolderRepository::new(self.db.pool())
                .get_active(user_id, folder_id)
                .await?
                .is_none()
            {
                return Err(LocalCloudError::NotFound("folder".to_string()));
            }
        }

        if !FileRepository::new(self.db.pool())
            .set_folder(user_id, file_id, folder_id)
            .await?
        {
            return Err(LocalCloudError::NotFound("file".to_string()));
        }

        info!(user_id, file_id, folder_id = ?folder_id, "File moved");
        self.reload(user_id, file).await
    }

    /// Other live files ranked by embedding similarity to `file_id`.
    pub async fn find_similar(
        &self,
        user_id: i64,
        file_id: i64,
        limit: usize,
    ) -> Result<Vec<SimilarFile>> {
        let source = self.get_file(user_id, file_id).await?;
        let source_embedding = source.embedding();
        if source_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<SimilarFile> = FileRepository::new(self.db.pool())
            .list_active(user_id)
            .await?
            .into_iter()
            .filter(|candidate| candidate.id != file_id)
            .filter_map(|candidate| {
                let score = cosine_similarity(&source_embedding, &candidate.embedding())?;
                Some(SimilarFile {
                    file: candidate,
                    score,
                })
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.file.id.cmp(&b.file.id)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Groups of live files with identical content.
    pub async fn find_duplicate_groups(&self, user_id: i64) -> Result<DuplicateReport> {
        let files = FileRepository::new(self.db.pool())
            .list_active_hashed(user_id)
            .await?;
        let folders: HashMap<i64, _> = FolderRepository::new(self.db.pool())
            .list_all(user_id)
            .await?
            .into_iter()
            .map(|folder| (folder.id, folder))
            .collect();

        let report = group_duplicates(files, &folders);
        debug!(
            user_id,
            groups = report.groups.len(),
            wasted = report.total_wasted_bytes,
            "Duplicate scan finished"
        );
        Ok(report)
    }

    /// Storage statistics for a user.
    pub async fn stats(&self, user_id: i64) -> Result<StorageStats> {
        let files: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_deleted), 0) FROM files WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        let versions: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM file_versions v JOIN files f ON f.id = v.file_id
             WHERE f.user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        let ledger = self.quota();
        let usage = ledger.usage(user_id).await?;
        let limit = ledger.limit_bytes(user_id).await?;

        Ok(StorageStats {
            file_count: files.0,
            deleted_file_count: files.1,
            version_count: versions.0,
            file_bytes: usage.file_bytes,
            version_bytes: usage.version_bytes,
            used_bytes: usage.total(),
            limit,
        })
    }

    /// Whether the analysis service is reachable. Status reporting only.
    pub async fn analysis_available(&self) -> bool {
        self.enricher.is_available().await
    }
}
