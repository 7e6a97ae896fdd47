//! Storage query abstraction.
//!
//! Every backend implements [`Queries`] with identical semantics:
//!
//! ```text
//! memory              MemoryStore      DashMap<resource, Arc<Vec<Item>>>
//! file:<path>|*.json  JsonFileStore    { "<resource>": [items] } in one file
//! dir:<path>          JsonDirStore     <path>/<resource>.json per resource
//! postgres://...      PostgresStore    JSONB rows (feature `postgres`)
//! ```
//!
//! Reads always observe prior writes; writes to one resource are serialized.

pub mod collection;
pub mod json_dir;
pub mod json_file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use reststack_model::types::{Document, Item};

use crate::filter::Filter;

pub use json_dir::JsonDirStore;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A caller-supplied id is already taken.
    #[error("ID '{id}' already exists")]
    AlreadyExists {
        /// The conflicting id.
        id: String,
    },
    /// The item to update or replace does not exist.
    #[error("ID '{id}' not found")]
    NotFound {
        /// The missing id.
        id: String,
    },
    /// The resource name cannot be stored by this backend.
    #[error("invalid resource name: '{resource}'")]
    InvalidResource {
        /// The rejected name.
        resource: String,
    },
    /// Filesystem failure.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Persisted data could not be decoded.
    #[error("corrupt data in {location}: {message}")]
    Corrupt {
        /// File path or table name.
        location: String,
        /// Decoder message.
        message: String,
    },
    /// The connection string selects no known backend.
    #[error("invalid connection string: '{value}'")]
    InvalidConnectionString {
        /// The rejected value.
        value: String,
    },
    /// The backend exists but is not compiled in.
    #[error("storage backend '{backend}' is not enabled in this build")]
    UnsupportedBackend {
        /// Backend name.
        backend: String,
    },
    /// A database query failed.
    #[error("query failed: {message}")]
    Query {
        /// Driver message.
        message: String,
    },
    /// The database could not be reached.
    #[error("connection failed: {message}")]
    Connection {
        /// Driver message.
        message: String,
    },
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Uniform CRUD + filter contract over a storage backend.
///
/// Collections are created implicitly on first access.
#[async_trait]
pub trait Queries: Send + Sync + fmt::Debug {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// All items of `resource` in insertion order, optionally filtered.
    async fn get_all(&self, resource: &str, filter: Option<&Filter>) -> StorageResult<Vec<Item>>;

    /// One item by id.
    async fn get_by_id(&self, resource: &str, id: &str) -> StorageResult<Option<Item>>;

    /// Create an item with the given id, or a generated UUID v4.
    ///
    /// Fails with [`StorageError::AlreadyExists`] without mutating anything
    /// when the id is taken.
    async fn create(
        &self,
        resource: &str,
        id: Option<&str>,
        fields: Document,
    ) -> StorageResult<Item>;

    /// Shallow-merge `item.fields` over the persisted item.
    async fn update(&self, resource: &str, item: Item) -> StorageResult<Item>;

    /// Replace every field of the persisted item except its id.
    async fn replace(&self, resource: &str, item: Item) -> StorageResult<Item>;

    /// Delete one item; deleting a missing id succeeds.
    async fn delete_by_id(&self, resource: &str, id: &str) -> StorageResult<()>;

    /// Delete every item of `resource`.
    async fn delete_all(&self, resource: &str) -> StorageResult<()>;

    /// Delete every item of `resource` matching `filter`.
    async fn delete_by_filter(&self, resource: &str, filter: &Filter) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Backend selected by a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// In-process memory.
    Memory,
    /// Single JSON document on disk.
    JsonFile(PathBuf),
    /// One JSON file per resource in a directory.
    JsonDir(PathBuf),
    /// PostgreSQL JSONB table.
    Postgres(String),
}

impl Backend {
    /// Parse a connection string:
    ///
    /// ```text
    /// memory | memory://           -> Memory
    /// file:<path> | <path>.json    -> JsonFile
    /// dir:<path>                   -> JsonDir
    /// postgres://… | postgresql:// -> Postgres
    /// ```
    pub fn parse(conn: &str) -> StorageResult<Self> {
        let conn = conn.trim();
        let invalid = || StorageError::InvalidConnectionString {
            value: conn.to_owned(),
        };

        if conn == "memory" || conn == "memory://" {
            return Ok(Self::Memory);
        }
        if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
            if cfg!(feature = "postgres") {
                return Ok(Self::Postgres(conn.to_owned()));
            }
            return Err(StorageError::UnsupportedBackend {
                backend: "postgres".to_owned(),
            });
        }
        if let Some(path) = conn.strip_prefix("file:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            return if path.is_empty() {
                Err(invalid())
            } else {
                Ok(Self::JsonFile(PathBuf::from(path)))
            };
        }
        if let Some(path) = conn.strip_prefix("dir:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            return if path.is_empty() {
                Err(invalid())
            } else {
                Ok(Self::JsonDir(PathBuf::from(path)))
            };
        }
        if conn.ends_with(".json") && !conn.contains("://") {
            return Ok(Self::JsonFile(PathBuf::from(conn)));
        }
        Err(invalid())
    }

    /// Short backend name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::JsonFile(_) => "json-file",
            Self::JsonDir(_) => "json-dir",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Open the backend.
    pub async fn open(&self) -> StorageResult<Arc<dyn Queries>> {
        let queries: Arc<dyn Queries> = match self {
            Self::Memory => Arc::new(MemoryStore::new()),
            Self::JsonFile(path) => Arc::new(JsonFileStore::open(path).await?),
            Self::JsonDir(path) => Arc::new(JsonDirStore::open(path).await?),
            #[cfg(feature = "postgres")]
            Self::Postgres(url) => Arc::new(PostgresStore::connect(url).await?),
            #[cfg(not(feature = "postgres"))]
            Self::Postgres(_) => {
                return Err(StorageError::UnsupportedBackend {
                    backend: "postgres".to_owned(),
                });
            }
        };
        Ok(queries)
    }
}

/// Parse `conn` and open the selected backend.
pub async fn open(conn: &str) -> StorageResult<Arc<dyn Queries>> {
    let backend = Backend::parse(conn)?;
    tracing::debug!(backend = backend.name(), "opening storage backend");
    backend.open().await
}
