//! SQLite persistence: courses and the append-only version store.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage failed: {0}")]
    StorageFailed(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Stored payload is invalid: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageFailed(e.to_string())
    }
}

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "course-forge")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Self::open(dirs.data_dir().join("course-forge.db"))
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)
    }

    /// Runs `op` on the blocking pool, giving up after `limit`.
    ///
    /// A call that times out keeps running in the background; every write
    /// is a single transaction, so it either lands whole or not at all.
    pub async fn blocking<T, F>(&self, limit: Duration, op: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        let task = tokio::task::spawn_blocking(move || op(&db));
        match tokio::time::timeout(limit, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(StoreError::StorageFailed(format!("store task failed: {e}"))),
            Err(_) => {
                tracing::error!("Store call exceeded {:?}", limit);
                Err(StoreError::Timeout(limit))
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::StorageFailed("database lock poisoned".to_string()))
    }

    // ============================================================
    // Course operations
    // ============================================================

    pub fn create_course(&self, init: &CourseInit) -> Result<Course> {
        let conn = self.lock()?;
        insert_course(&conn, init)
    }

    /// Inserts the course and its first outline version in one transaction,
    /// so a course never exists without an outline.
    pub fn create_course_with_outline(
        &self,
        init: &CourseInit,
        outline: &StageArtifact,
    ) -> Result<(Course, Version)> {
        if outline.stage() != Stage::Outline {
            return Err(StoreError::StorageFailed(format!(
                "course {} needs an outline, got {}",
                init.id,
                outline.stage().as_str()
            )));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let course = insert_course(&tx, init)?;
        let version = append(&tx, init.id, VersionKind::Initial, outline.clone(), None)?;
        tx.commit()?;

        tracing::info!("Created course {} with outline {}", init.id, version.id);
        Ok((course, version))
    }

    pub fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT init, created_at FROM courses WHERE id = ?",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(init, created_at)| {
            Ok(Course {
                init: serde_json::from_str(&init)?,
                created_at: parse_datetime(&created_at)?,
            })
        })
        .transpose()
    }

    // ============================================================
    // Version operations
    // ============================================================

    /// Appends a version and makes it the latest for its (entity, stage).
    ///
    /// `previous_version_id` is the latest version the caller saw; `None`
    /// means it saw no version at all. If the pointer has moved since, the
    /// call fails with [`StoreError::Conflict`] and nothing is written.
    pub fn record(
        &self,
        entity_id: Uuid,
        kind: VersionKind,
        artifact: &StageArtifact,
        previous_version_id: Option<Uuid>,
    ) -> Result<Version> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = latest_in(&tx, entity_id, artifact.stage())?;
        if current != previous_version_id {
            return Err(StoreError::Conflict(format!(
                "latest {} for {} is {}, expected {}",
                artifact.stage().as_str(),
                entity_id,
                describe(current),
                describe(previous_version_id)
            )));
        }

        let version = append(&tx, entity_id, kind, artifact.clone(), current)?;
        tx.commit()?;

        tracing::info!(
            "Recorded {} version {} of {} for {}",
            kind.as_str(),
            version.id,
            version.stage.as_str(),
            entity_id
        );
        Ok(version)
    }

    /// Restores the payload of `version_id` as a new latest version.
    ///
    /// The new version links to whatever was latest when the rollback ran.
    pub fn rollback(&self, version_id: Uuid) -> Result<Version> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let target = get_in(&tx, version_id)?
            .ok_or_else(|| StoreError::NotFound(format!("version {version_id}")))?;
        let current = latest_in(&tx, target.entity_id, target.stage)?;

        let version = append(
            &tx,
            target.entity_id,
            VersionKind::Rollback,
            target.artifact,
            current,
        )?;
        tx.commit()?;

        tracing::info!(
            "Rolled {} for {} back to {} as {}",
            version.stage.as_str(),
            version.entity_id,
            version_id,
            version.id
        );
        Ok(version)
    }

    pub fn get_version(&self, version_id: Uuid) -> Result<Option<Version>> {
        let conn = self.lock()?;
        get_in(&conn, version_id)
    }

    pub fn latest(&self, entity_id: Uuid, stage: Stage) -> Result<Option<Uuid>> {
        let conn = self.lock()?;
        latest_in(&conn, entity_id, stage)
    }

    pub fn latest_version(&self, entity_id: Uuid, stage: Stage) -> Result<Option<Version>> {
        let conn = self.lock()?;
        match latest_in(&conn, entity_id, stage)? {
            Some(id) => get_in(&conn, id),
            None => Ok(None),
        }
    }

    /// The chain for (entity, stage), newest first, ending at the root.
    pub fn history(&self, entity_id: Uuid, stage: Stage) -> Result<Vec<Version>> {
        let conn = self.lock()?;
        let mut chain = Vec::new();
        let mut next = latest_in(&conn, entity_id, stage)?;

        while let Some(id) = next {
            let version = get_in(&conn, id)?.ok_or_else(|| {
                StoreError::StorageFailed(format!("version chain is broken at {id}"))
            })?;
            next = version.previous_version_id;
            chain.push(version);
        }

        Ok(chain)
    }

    pub fn find_by_tag(&self, tag: &str) -> Result<Vec<Version>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.entity_id, v.stage, v.kind, v.previous_version_id, t.tag, v.artifact, v.created_at
             FROM version_tags t JOIN versions v ON v.id = t.version_id
             WHERE t.tag = ? ORDER BY v.created_at",
        )?;

        let rows = stmt
            .query_map([tag], VersionRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(VersionRow::into_version).collect()
    }
}

fn insert_course(conn: &Connection, init: &CourseInit) -> Result<Course> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?)",
        [init.id.to_string()],
        |row| row.get(0),
    )?;
    if exists {
        return Err(StoreError::Conflict(format!(
            "course {} already exists",
            init.id
        )));
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO courses (id, init, created_at) VALUES (?, ?, ?)",
        (
            init.id.to_string(),
            serde_json::to_string(init)?,
            now.to_rfc3339(),
        ),
    )?;

    Ok(Course {
        init: init.clone(),
        created_at: now,
    })
}

fn append(
    tx: &Transaction<'_>,
    entity_id: Uuid,
    kind: VersionKind,
    artifact: StageArtifact,
    previous_version_id: Option<Uuid>,
) -> Result<Version> {
    let now = Utc::now();
    let stamp = now.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let stage = artifact.stage();
    let version = Version {
        id: Uuid::new_v4(),
        entity_id,
        stage,
        kind,
        previous_version_id,
        tag: auto_tag(kind, stage, now),
        artifact,
        created_at: now,
    };

    tx.execute(
        "INSERT INTO versions (id, entity_id, stage, kind, previous_version_id, artifact, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        (
            version.id.to_string(),
            entity_id.to_string(),
            stage.as_str(),
            kind.as_str(),
            previous_version_id.map(|id| id.to_string()),
            serde_json::to_string(&version.artifact)?,
            stamp.clone(),
        ),
    )?;

    tx.execute(
        "INSERT INTO version_tags (tag, version_id, created_at) VALUES (?, ?, ?)",
        (&version.tag, version.id.to_string(), stamp.clone()),
    )?;

    tx.execute(
        "INSERT INTO latest_versions (entity_id, stage, version_id, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(entity_id, stage)
         DO UPDATE SET version_id = excluded.version_id, updated_at = excluded.updated_at",
        (
            entity_id.to_string(),
            stage.as_str(),
            version.id.to_string(),
            stamp.clone(),
        ),
    )?;

    Ok(version)
}

fn latest_in(conn: &Connection, entity_id: Uuid, stage: Stage) -> Result<Option<Uuid>> {
    let id: Option<String> = conn
        .query_row(
            "SELECT version_id FROM latest_versions WHERE entity_id = ? AND stage = ?",
            (entity_id.to_string(), stage.as_str()),
            |row| row.get(0),
        )
        .optional()?;
    id.as_deref().map(parse_uuid).transpose()
}

fn get_in(conn: &Connection, version_id: Uuid) -> Result<Option<Version>> {
    let row = conn
        .query_row(
            "SELECT v.id, v.entity_id, v.stage, v.kind, v.previous_version_id, t.tag, v.artifact, v.created_at
             FROM versions v LEFT JOIN version_tags t ON t.version_id = v.id
             WHERE v.id = ?",
            [version_id.to_string()],
            VersionRow::from_row,
        )
        .optional()?;
    row.map(VersionRow::into_version).transpose()
}

/// Raw column values; decoding happens outside the rusqlite closure so
/// bad payloads surface as [`StoreError::Payload`].
struct VersionRow {
    id: String,
    entity_id: String,
    stage: String,
    kind: String,
    previous_version_id: Option<String>,
    tag: Option<String>,
    artifact: String,
    created_at: String,
}

impl VersionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity_id: row.get(1)?,
            stage: row.get(2)?,
            kind: row.get(3)?,
            previous_version_id: row.get(4)?,
            tag: row.get(5)?,
            artifact: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_version(self) -> Result<Version> {
        let stage = Stage::from_str(&self.stage)
            .ok_or_else(|| StoreError::StorageFailed(format!("unknown stage {}", self.stage)))?;
        let kind = VersionKind::from_str(&self.kind)
            .ok_or_else(|| StoreError::StorageFailed(format!("unknown kind {}", self.kind)))?;

        Ok(Version {
            id: parse_uuid(&self.id)?,
            entity_id: parse_uuid(&self.entity_id)?,
            stage,
            kind,
            previous_version_id: self
                .previous_version_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?,
            tag: self.tag.unwrap_or_default(),
            artifact: serde_json::from_str(&self.artifact)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn describe(id: Option<Uuid>) -> String {
    id.map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::StorageFailed(format!("bad id {s}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::StorageFailed(format!("bad timestamp {s}: {e}")))
}
