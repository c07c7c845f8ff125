//! SQLite-backed store for synchronized schema documents.

mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::schema::{SchemaDocument, ValidationAction, ValidationLevel};

/// A schema document as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSchema {
    pub name: String,
    pub schema: SchemaDocument,
    /// Read from the indexed column, not from the document.
    pub validation_action: ValidationAction,
    pub validation_level: ValidationLevel,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one synchronization, by model name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.created.len() + self.updated.len() + self.unchanged.len()
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        tracing::debug!("Opened schema store at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens the store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "docmodel", "docmodel")
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("docmodel.db"))
    }

    pub fn migrate(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(schema::SCHEMA)?;
            Ok(())
        })
    }

    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))?;
        f(&mut conn)
    }

    /// Writes every document in one transaction.
    ///
    /// A document identical to the stored one is left untouched; a changed
    /// one replaces it and bumps its revision.
    pub fn sync_schemas(&self, models: &[(String, SchemaDocument)]) -> Result<SyncReport> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut report = SyncReport::default();
            let now = Utc::now().to_rfc3339();

            for (name, schema) in models {
                let document = serde_json::to_string(schema)?;
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT document FROM model_schemas WHERE name = ?1",
                        params![name],
                        |row| row.get(0),
                    )
                    .optional()?;

                match existing {
                    None => {
                        tx.execute(
                            "INSERT INTO model_schemas (name, document, validation_action, validation_level, revision, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                            params![
                                name,
                                document,
                                schema.validation_action.as_str(),
                                schema.validation_level.as_str(),
                                now
                            ],
                        )?;
                        report.created.push(name.clone());
                    }
                    Some(stored) if stored == document => {
                        report.unchanged.push(name.clone());
                    }
                    Some(_) => {
                        tx.execute(
                            "UPDATE model_schemas
                             SET document = ?2, validation_action = ?3, validation_level = ?4,
                                 revision = revision + 1, updated_at = ?5
                             WHERE name = ?1",
                            params![
                                name,
                                document,
                                schema.validation_action.as_str(),
                                schema.validation_level.as_str(),
                                now
                            ],
                        )?;
                        report.updated.push(name.clone());
                    }
                }
            }

            tx.commit()?;
            Ok(report)
        })
    }

    pub fn get_schema(&self, name: &str) -> Result<Option<StoredSchema>> {
        self.with_connection(|conn| {
            let stored = conn
                .query_row(
                    "SELECT name, document, validation_action, validation_level,
                            revision, created_at, updated_at
                     FROM model_schemas WHERE name = ?1",
                    params![name],
                    map_stored_schema,
                )
                .optional()?;
            Ok(stored)
        })
    }

    pub fn list_schemas(&self) -> Result<Vec<StoredSchema>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, document, validation_action, validation_level,
                            revision, created_at, updated_at
                 FROM model_schemas ORDER BY name",
            )?;
            let rows = stmt.query_map([], map_stored_schema)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

fn map_stored_schema(row: &Row<'_>) -> rusqlite::Result<StoredSchema> {
    let document: String = row.get(1)?;
    let schema = serde_json::from_str(&document).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
    })?;

    Ok(StoredSchema {
        name: row.get(0)?,
        schema,
        validation_action: parse_column(row, 2, ValidationAction::from_str)?,
        validation_level: parse_column(row, 3, ValidationLevel::from_str)?,
        revision: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
    })
}

fn parse_column<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            anyhow!("Unexpected column value {:?}", raw).into(),
        )
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
