//! The store session contract and its SQLite implementation.

use std::future::Future;
use std::path::PathBuf;

use docmodel_core::db::{Database, SyncReport};
use docmodel_core::SchemaDocument;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store is locked by another writer.
    #[error("store busy: {0}")]
    Busy(String),

    #[error("failed to connect to store: {0}")]
    Connection(String),

    #[error("schema synchronization failed: {0}")]
    Sync(String),
}

impl StoreError {
    /// Whether a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Busy(_))
    }

    fn connection(err: anyhow::Error) -> Self {
        if is_busy(&err) {
            Self::Busy(format!("{err:#}"))
        } else {
            Self::Connection(format!("{err:#}"))
        }
    }

    fn sync(err: anyhow::Error) -> Self {
        if is_busy(&err) {
            Self::Busy(format!("{err:#}"))
        } else {
            Self::Sync(format!("{err:#}"))
        }
    }
}

fn is_busy(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(failure, _))
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Opens sessions against a store.
pub trait Connector {
    type Session: StoreSession + Send;

    fn connect(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;
}

/// A connected store that accepts schema registrations.
pub trait StoreSession {
    /// Stages `schema` under `name`. Nothing is written until
    /// [`StoreSession::synchronize_schemas`].
    fn register_model(&mut self, name: &str, schema: SchemaDocument) -> Result<(), StoreError>;

    /// Applies every staged schema.
    fn synchronize_schemas(
        &mut self,
    ) -> impl Future<Output = Result<SyncReport, StoreError>> + Send;
}

#[derive(Clone)]
enum Target {
    Path(PathBuf),
    Default,
    Open(Database),
}

/// Connects to a SQLite schema store.
#[derive(Clone)]
pub struct SqliteConnector {
    target: Target,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::Path(path.into()),
        }
    }

    /// The store in the platform data directory.
    pub fn default_location() -> Self {
        Self {
            target: Target::Default,
        }
    }

    /// Uses an already open database.
    pub fn with_database(db: Database) -> Self {
        Self {
            target: Target::Open(db),
        }
    }
}

impl Connector for SqliteConnector {
    type Session = SqliteSession;

    fn connect(&self) -> impl Future<Output = Result<SqliteSession, StoreError>> + Send {
        let target = self.target.clone();
        async move {
            let db = tokio::task::spawn_blocking(move || {
                let db = match target {
                    Target::Path(path) => Database::open(path)?,
                    Target::Default => Database::open_default()?,
                    Target::Open(db) => db,
                };
                db.migrate()?;
                Ok::<_, anyhow::Error>(db)
            })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .map_err(StoreError::connection)?;

            Ok(SqliteSession::new(db))
        }
    }
}

pub struct SqliteSession {
    db: Database,
    pending: Vec<(String, SchemaDocument)>,
}

impl SqliteSession {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            pending: Vec::new(),
        }
    }

    /// Names staged for the next synchronization.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|(name, _)| name.as_str())
    }
}

impl StoreSession for SqliteSession {
    fn register_model(&mut self, name: &str, schema: SchemaDocument) -> Result<(), StoreError> {
        match self.pending.iter_mut().find(|(staged, _)| staged == name) {
            Some(entry) => {
                tracing::debug!(model = name, "replacing staged schema");
                entry.1 = schema;
            }
            None => self.pending.push((name.to_string(), schema)),
        }
        Ok(())
    }

    fn synchronize_schemas(
        &mut self,
    ) -> impl Future<Output = Result<SyncReport, StoreError>> + Send {
        let db = self.db.clone();
        let pending = std::mem::take(&mut self.pending);
        async move {
            tokio::task::spawn_blocking(move || db.sync_schemas(&pending))
                .await
                .map_err(|e| StoreError::Sync(e.to_string()))?
                .map_err(StoreError::sync)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmodel_core::schema::{Catalog, FieldOptions};

    fn schema(name: &str) -> SchemaDocument {
        let mut catalog = Catalog::new();
        let mut model = catalog.model(name).unwrap();
        model.field::<String>("title", FieldOptions::required()).unwrap();
        model.finish().unwrap().schema
    }

    #[test]
    fn busy_database_is_transient() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(StoreError::connection(busy.into()).is_transient());

        let fatal = StoreError::connection(anyhow::anyhow!("unable to open database file"));
        assert!(!fatal.is_transient());
    }

    #[tokio::test]
    async fn nothing_is_written_before_synchronization() {
        let db = Database::open_memory().unwrap();
        let mut session = SqliteConnector::with_database(db.clone()).connect().await.unwrap();

        session.register_model("Post", schema("Post")).unwrap();
        assert!(db.list_schemas().unwrap().is_empty());

        let report = session.synchronize_schemas().await.unwrap();
        assert_eq!(report.created, vec!["Post"]);
        assert!(db.get_schema("Post").unwrap().is_some());
        assert_eq!(session.pending().count(), 0);
    }

    #[tokio::test]
    async fn registering_twice_keeps_one_entry() {
        let mut session = SqliteConnector::with_database(Database::open_memory().unwrap())
            .connect()
            .await
            .unwrap();

        session.register_model("Post", schema("Post")).unwrap();
        session.register_model("Post", schema("Post")).unwrap();
        assert_eq!(session.pending().collect::<Vec<_>>(), vec!["Post"]);
    }
}
