//! `HistoryStore` — the durable, indexed, upsert-keyed-by-content-hash
//! record of every attempted upload.
//!
//! Backed by a connection-pooled SQLite database, schema-versioned via
//! SQLite's `PRAGMA user_version` and an ordered list of embedded `.sql`
//! migration files, the same shape the teacher agent uses for its own
//! upload-record table.

pub mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ToSql;
use rusqlite::NO_PARAMS;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use bulkup_migrations::Migrations;

pub use self::error::{Error, ErrorKind, Result};

/// Where the underlying SQLite file lives.
#[derive(Debug, Clone)]
pub enum Source {
    File(PathBuf),
}

/// The status of an upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    Success,
    Failed,
}

impl AsRef<str> for UploadStatus {
    fn as_ref(&self) -> &str {
        match self {
            UploadStatus::Success => "success",
            UploadStatus::Failed => "failed",
        }
    }
}

impl From<UploadStatus> for String {
    fn from(status: UploadStatus) -> Self {
        status.as_ref().to_string()
    }
}

impl FromStr for UploadStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(UploadStatus::Success),
            "failed" => Ok(UploadStatus::Failed),
            _ => Err(Error::path(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// The primary entity of the history store (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub file_path: String,
    pub file_hash: String,
    pub video_id: Option<String>,
    pub metadata: Option<Json>,
    pub timestamp: i64,
    pub status: String,
    pub error: Option<String>,
    pub playlist_name: String,
    pub file_size: i64,
}

impl UploadRecord {
    fn from_row(row: &rusqlite::Row<'_, '_>) -> rusqlite::Result<UploadRecord> {
        let metadata: Option<String> = row.get(3);
        Ok(UploadRecord {
            file_path: row.get(0),
            file_hash: row.get(1),
            video_id: row.get(2),
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            timestamp: row.get(4),
            status: row.get(5),
            error: row.get(6),
            playlist_name: row.get(7),
            file_size: row.get(8),
        })
    }
}

const SELECT_COLUMNS: &str =
    "file_path, file_hash, video_id, metadata, timestamp, status, error, playlist_name, file_size";

/// Export formats supported by `HistoryStore::export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

pub struct HistoryStore {
    pool: Pool<SqliteConnectionManager>,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HistoryStore {{ pool: {:?} }}", self.pool.state())
    }
}

impl HistoryStore {
    /// Opens (or creates) the history store at `source`, running any
    /// pending migrations and, if this is a brand-new store, ingesting a
    /// sibling legacy JSON dump if one is present.
    pub fn new(source: &Source) -> Result<HistoryStore> {
        let manager = match *source {
            Source::File(ref path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                SqliteConnectionManager::file(path)
            }
        };
        let pool = Pool::new(manager)?;
        let store = HistoryStore { pool };

        let was_empty = store.is_empty()?;
        store.run_migrations()?;

        if was_empty {
            if let Source::File(ref path) = *source {
                let legacy = crate::core::legacy_history_file(path);
                if legacy.exists() {
                    let imported = store.migrate_legacy_json(&legacy)?;
                    log::info!(
                        "migrated {} record(s) from legacy history file {:?}",
                        imported,
                        legacy
                    );
                }
            }
        }

        Ok(store)
    }

    fn is_empty(&self) -> Result<bool> {
        let conn = self.pool.get()?;
        let exists: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='upload_record'",
                NO_PARAMS,
                |row| row.get(0),
            )
            .unwrap_or(0);
        if exists == 0 {
            return Ok(true);
        }
        let count: i64 = conn.query_row("SELECT count(*) FROM upload_record", NO_PARAMS, |row| {
            row.get(0)
        })?;
        Ok(count == 0)
    }

    fn internal_get_schema_version(conn: &PooledConnection<SqliteConnectionManager>) -> Result<usize> {
        conn.query_row("PRAGMA user_version", NO_PARAMS, |row| {
            let version: u32 = row.get(0);
            version as usize
        })
        .map_err(Into::into)
    }

    fn internal_set_schema_version(
        conn: &PooledConnection<SqliteConnectionManager>,
        version: usize,
    ) -> Result<usize> {
        conn.execute_named(format!("PRAGMA user_version = {}", version).as_str(), &[])
            .map_err(Into::into)
    }

    /// Returns the current schema version. Exposed for tests/debugging.
    pub fn get_schema_version(&self) -> Result<usize> {
        Self::internal_get_schema_version(&self.pool.get()?)
    }

    /// Forces the schema version. Exposed for tests/debugging only.
    pub fn reset_schema_version(&self, version: usize) -> Result<usize> {
        Self::internal_set_schema_version(&self.pool.get()?, version)
    }

    fn run_migrations(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let mut latest_version = 0;

        for (i, (filename, contents)) in Migrations::get_all().enumerate() {
            let current_version = Self::internal_get_schema_version(&conn)?;
            if current_version <= i {
                log::debug!("running migration {}@{}", filename, i);
                conn.execute_batch(contents.as_ref())
                    .map_err(|e| Error::migration(current_version, e.to_string(), contents))?;
                latest_version = i + 1;
                Self::internal_set_schema_version(&conn, latest_version)?;
            }
        }

        Ok(latest_version)
    }

    /// Ingests a legacy TinyDB-shaped JSON dump, skipping any record lacking
    /// `file_hash`. One-shot and idempotent: only called when the store was
    /// empty at open time.
    fn migrate_legacy_json(&self, legacy_file: &Path) -> Result<usize> {
        let contents = fs::read_to_string(legacy_file)?;
        let root: Json = serde_json::from_str(&contents)?;

        let collection = root
            .get("uploads")
            .cloned()
            .unwrap_or(root);

        let records: Vec<Json> = match collection {
            Json::Array(items) => items,
            Json::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
            _ => {
                return Err(Error::legacy_import(
                    "expected legacy history dump to be an array or object",
                ))
            }
        };

        let mut imported = 0;
        for record in records {
            let file_hash = match record.get("file_hash").and_then(Json::as_str) {
                Some(hash) if !hash.is_empty() => hash.to_string(),
                _ => continue,
            };
            let file_path = record
                .get("file_path")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string();
            let video_id = record
                .get("video_id")
                .and_then(Json::as_str)
                .map(|s| s.to_string());
            let status = record
                .get("status")
                .and_then(Json::as_str)
                .unwrap_or("failed")
                .to_string();
            let error = record
                .get("error")
                .and_then(Json::as_str)
                .map(|s| s.to_string());
            let playlist_name = record
                .get("playlist_name")
                .and_then(Json::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| default_playlist_name(&file_path));
            let file_size = record.get("file_size").and_then(Json::as_i64).unwrap_or(0);
            let metadata = record.get("metadata").cloned();
            let timestamp = record
                .get("timestamp")
                .and_then(Json::as_i64)
                .unwrap_or_else(now);

            self.upsert_row(
                &file_path,
                &file_hash,
                video_id.as_deref(),
                metadata.as_ref(),
                &status,
                error.as_deref(),
                &playlist_name,
                file_size,
                timestamp,
            )?;
            imported += 1;
        }

        Ok(imported)
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert_row(
        &self,
        file_path: &str,
        file_hash: &str,
        video_id: Option<&str>,
        metadata: Option<&Json>,
        status: &str,
        error: Option<&str>,
        playlist_name: &str,
        file_size: i64,
        timestamp: i64,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        let metadata_text = metadata.map(|m| m.to_string());

        conn.execute_named(
            "INSERT INTO upload_record
                (file_path, file_hash, video_id, metadata, timestamp, status, error, playlist_name, file_size)
             VALUES
                (:file_path, :file_hash, :video_id, :metadata, :timestamp, :status, :error, :playlist_name, :file_size)
             ON CONFLICT(file_hash) DO UPDATE SET
                file_path = excluded.file_path,
                video_id = excluded.video_id,
                metadata = excluded.metadata,
                timestamp = excluded.timestamp,
                status = excluded.status,
                error = excluded.error,
                playlist_name = excluded.playlist_name,
                file_size = excluded.file_size",
            &[
                (":file_path", &file_path as &dyn ToSql),
                (":file_hash", &file_hash),
                (":video_id", &video_id),
                (":metadata", &metadata_text),
                (":timestamp", &timestamp),
                (":status", &status),
                (":error", &error),
                (":playlist_name", &playlist_name),
                (":file_size", &file_size),
            ],
        )?;

        Ok(())
    }

    /// Writes/overwrites the row for `file_hash` as a successful upload.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_success(
        &self,
        file_path: &str,
        file_hash: &str,
        video_id: &str,
        metadata: Option<&Json>,
        playlist_name: &str,
        file_size: i64,
    ) -> Result<()> {
        self.upsert_row(
            file_path,
            file_hash,
            Some(video_id),
            metadata,
            UploadStatus::Success.as_ref(),
            None,
            playlist_name,
            file_size,
            now(),
        )
    }

    /// Writes/overwrites the row for `file_hash` as a failed upload.
    pub fn upsert_failure(
        &self,
        file_path: &str,
        file_hash: &str,
        error_text: &str,
        playlist_name: &str,
        file_size: i64,
    ) -> Result<()> {
        self.upsert_row(
            file_path,
            file_hash,
            None,
            None,
            UploadStatus::Failed.as_ref(),
            Some(error_text),
            playlist_name,
            file_size,
            now(),
        )
    }

    /// True iff a row with `file_hash` exists with `status = success`.
    pub fn is_uploaded(&self, file_hash: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM upload_record WHERE file_hash = ?1 AND status = 'success'",
            &[&file_hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// True iff a row with `file_path` exists with `status = success`.
    pub fn is_uploaded_by_path(&self, file_path: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM upload_record WHERE file_path = ?1 AND status = 'success'",
            &[&file_path],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn delete_by(&self, column: &str, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let sql = format!("DELETE FROM upload_record WHERE {} = ?1", column);
        let count = conn.execute(&sql, &[&key])?;
        Ok(count > 0)
    }

    pub fn delete_by_hash(&self, file_hash: &str) -> Result<bool> {
        self.delete_by("file_hash", file_hash)
    }

    pub fn delete_by_path(&self, file_path: &str) -> Result<bool> {
        self.delete_by("file_path", file_path)
    }

    pub fn delete_by_video_id(&self, video_id: &str) -> Result<bool> {
        self.delete_by("video_id", video_id)
    }

    fn get_by(&self, column: &str, key: &str) -> Result<Option<UploadRecord>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM upload_record WHERE {} = ?1",
            SELECT_COLUMNS, column
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_and_then(&[&key], UploadRecord::from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn get_by_hash(&self, file_hash: &str) -> Result<Option<UploadRecord>> {
        self.get_by("file_hash", file_hash)
    }

    pub fn get_by_video_id(&self, video_id: &str) -> Result<Option<UploadRecord>> {
        self.get_by("video_id", video_id)
    }

    /// Returns every record, newest-first by `timestamp`, optionally capped.
    pub fn get_all(&self, limit: Option<usize>) -> Result<Vec<UploadRecord>> {
        let conn = self.pool.get()?;
        let sql = match limit {
            Some(n) => format!(
                "SELECT {} FROM upload_record ORDER BY timestamp DESC LIMIT {}",
                SELECT_COLUMNS, n
            ),
            None => format!(
                "SELECT {} FROM upload_record ORDER BY timestamp DESC",
                SELECT_COLUMNS
            ),
        };
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_and_then(NO_PARAMS, UploadRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Returns every `failed` record, newest-first by `timestamp`.
    pub fn get_failed(&self) -> Result<Vec<UploadRecord>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM upload_record WHERE status = 'failed' ORDER BY timestamp DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_and_then(NO_PARAMS, UploadRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Serializes every record in the requested format. CSV omits `metadata`.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let records = self.get_all(None)?;
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&records)?),
            ExportFormat::Csv => {
                let mut writer = csv::WriterBuilder::new().from_writer(vec![]);
                writer.write_record(&[
                    "file_path",
                    "file_hash",
                    "video_id",
                    "status",
                    "timestamp",
                    "error",
                    "playlist_name",
                    "file_size",
                ])?;
                for record in &records {
                    writer.write_record(&[
                        record.file_path.clone(),
                        record.file_hash.clone(),
                        record.video_id.clone().unwrap_or_default(),
                        record.status.clone(),
                        record.timestamp.to_string(),
                        record.error.clone().unwrap_or_default(),
                        record.playlist_name.clone(),
                        record.file_size.to_string(),
                    ])?;
                }
                let bytes = writer.into_inner().map_err(|e| Error::legacy_import(e.to_string()))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    /// Imports `records`, skipping any missing `file_hash` and any whose
    /// hash is already present. Returns `(imported, skipped_duplicates)`.
    pub fn import(&self, records: &[UploadRecord]) -> Result<(usize, usize)> {
        let mut imported = 0;
        let mut skipped = 0;

        for record in records {
            if record.file_hash.is_empty() {
                skipped += 1;
                continue;
            }
            if self.get_by_hash(&record.file_hash)?.is_some() {
                skipped += 1;
                continue;
            }
            self.upsert_row(
                &record.file_path,
                &record.file_hash,
                record.video_id.as_deref(),
                record.metadata.as_ref(),
                &record.status,
                record.error.as_deref(),
                &record.playlist_name,
                record.file_size,
                record.timestamp,
            )?;
            imported += 1;
        }

        Ok((imported, skipped))
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Default `playlist_name` for a record lacking one: the file's parent
/// directory name.
pub fn default_playlist_name(file_path: &str) -> String {
    Path::new(file_path)
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// Groups records by `playlist_name`, preserving first-seen order of groups.
pub fn group_by_playlist(records: Vec<UploadRecord>) -> BTreeMap<String, Vec<UploadRecord>> {
    let mut groups: BTreeMap<String, Vec<UploadRecord>> = BTreeMap::new();
    for record in records {
        let key = if record.playlist_name.is_empty() {
            default_playlist_name(&record.file_path)
        } else {
            record.playlist_name.clone()
        };
        groups.entry(key).or_insert_with(Vec::new).push(record);
    }
    groups
}
