//! Single-file JSON storage backend.
//!
//! The whole database is one document:
//!
//! ```json
//! { "items": [ { "id": "1", "name": "widget" } ], "users": [] }
//! ```
//!
//! Every read loads the file; every write rereads, mutates and rewrites the
//! whole document through a temp file and a rename. Writes are serialized by
//! a single lock.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use reststack_model::types::{Document, Item};

use super::{Queries, StorageError, StorageResult, collection};
use crate::filter::Filter;

type Database = BTreeMap<String, Vec<Item>>;

/// JSON-file implementation of [`Queries`].
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if missing) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }
        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        if !tokio::fs::try_exists(&store.path)
            .await
            .map_err(|source| io_error(&store.path, source))?
        {
            write_json(&store.path, &Database::new()).await?;
        }
        debug!(path = %store.path.display(), "opened JSON file store");
        Ok(store)
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<Database> {
        read_json(&self.path).await
    }

    async fn collection(&self, resource: &str) -> StorageResult<Vec<Item>> {
        Ok(self.load().await?.remove(resource).unwrap_or_default())
    }

    /// Reread, mutate one collection and rewrite the whole document.
    async fn write<T>(
        &self,
        resource: &str,
        op: impl FnOnce(&mut Vec<Item>) -> StorageResult<T> + Send,
    ) -> StorageResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut db = self.load().await?;
        let items = db.entry(resource.to_owned()).or_default();
        let out = op(items)?;
        write_json(&self.path, &db).await?;
        Ok(out)
    }
}

#[async_trait]
impl Queries for JsonFileStore {
    fn backend_name(&self) -> &'static str {
        "json-file"
    }

    async fn get_all(&self, resource: &str, filter: Option<&Filter>) -> StorageResult<Vec<Item>> {
        let items = self.collection(resource).await?;
        Ok(collection::select(&items, filter))
    }

    async fn get_by_id(&self, resource: &str, id: &str) -> StorageResult<Option<Item>> {
        let items = self.collection(resource).await?;
        Ok(collection::find(&items, id))
    }

    async fn create(
        &self,
        resource: &str,
        id: Option<&str>,
        fields: Document,
    ) -> StorageResult<Item> {
        self.write(resource, |items| collection::insert(items, id, fields))
            .await
    }

    async fn update(&self, resource: &str, item: Item) -> StorageResult<Item> {
        self.write(resource, |items| collection::merge(items, item))
            .await
    }

    async fn replace(&self, resource: &str, item: Item) -> StorageResult<Item> {
        self.write(resource, |items| collection::replace(items, item))
            .await
    }

    async fn delete_by_id(&self, resource: &str, id: &str) -> StorageResult<()> {
        self.write(resource, |items| {
            collection::remove(items, id);
            Ok(())
        })
        .await
    }

    async fn delete_all(&self, resource: &str) -> StorageResult<()> {
        self.write(resource, |items| {
            items.clear();
            Ok(())
        })
        .await
    }

    async fn delete_by_filter(&self, resource: &str, filter: &Filter) -> StorageResult<()> {
        self.write(resource, |items| {
            collection::remove_matching(items, filter);
            Ok(())
        })
        .await
    }
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a JSON document; a missing file reads as the default value.
pub(crate) async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> StorageResult<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(io_error(path, e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
        location: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Write a JSON document through a sibling temp file and a rename.
pub(crate) async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Corrupt {
        location: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|source| io_error(&tmp, source))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| io_error(path, source))
}
