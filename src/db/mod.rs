use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;
use crate::error::{Result, VendorGraphError};

pub mod migrate;
pub mod repository;
pub mod writer;

pub use repository::SqliteVendorRepository;

/// Connection pragmas applied to every connection.
/// WAL lets CRUD writers and graph readers proceed concurrently; readers see
/// each statement's own snapshot, not one snapshot per traversal.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA cache_size = -16384;";

/// How long a reader waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle on the relational vendor store. Cheap to clone; every operation
/// opens its own connection.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection with the standard pragmas.
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(conn)
    }

    /// Run a closure against a fresh connection on the blocking pool.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        task::spawn_blocking(move || {
            let mut conn = db.open_connection()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| VendorGraphError::ServiceUnavailable(format!("database task failed: {}", e)))?
    }

    /// Open the store and bring its schema up to date.
    pub async fn open_migrated<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db = Self::new(db_path);
        db.with_connection(migrate::run_migrations).await?;
        Ok(db)
    }
}
