//! Per-resource JSON directory backend.
//!
//! Each resource lives in `<dir>/<resource>.json` holding a JSON array of
//! items. Files are created lazily on first access. Read-modify-write cycles
//! are serialized per resource, so writers to different resources never
//! contend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use reststack_model::types::{Document, Item};

use super::json_file::{io_error, read_json, write_json};
use super::{Queries, StorageError, StorageResult, collection};
use crate::filter::Filter;

/// JSON-directory implementation of [`Queries`].
#[derive(Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl JsonDirStore {
    /// Open (and create if missing) the directory at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;
        debug!(dir = %dir.display(), "opened JSON directory store");
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    /// Directory holding the resource files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a resource file, rejecting names that are not plain file
    /// names.
    fn resource_path(&self, resource: &str) -> StorageResult<PathBuf> {
        if !is_safe_file_name(resource) {
            return Err(StorageError::InvalidResource {
                resource: resource.to_owned(),
            });
        }
        Ok(self.dir.join(format!("{resource}.json")))
    }

    fn lock_for(&self, resource: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(resource.to_owned()).or_default().value())
    }

    /// Load a resource, creating its file with `[]` on first access.
    async fn load(&self, resource: &str) -> StorageResult<Vec<Item>> {
        let path = self.resource_path(resource)?;
        if !exists(&path).await? {
            let lock = self.lock_for(resource);
            let _guard = lock.lock().await;
            if !exists(&path).await? {
                write_json(&path, &Vec::<Item>::new()).await?;
                debug!(resource, "created resource file");
            }
        }
        read_json(&path).await
    }

    async fn write<T>(
        &self,
        resource: &str,
        op: impl FnOnce(&mut Vec<Item>) -> StorageResult<T> + Send,
    ) -> StorageResult<T> {
        let path = self.resource_path(resource)?;
        let lock = self.lock_for(resource);
        let _guard = lock.lock().await;
        let mut items: Vec<Item> = read_json(&path).await?;
        let out = op(&mut items)?;
        write_json(&path, &items).await?;
        Ok(out)
    }
}

async fn exists(path: &Path) -> StorageResult<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|source| io_error(path, source))
}

/// `[A-Za-z0-9_.-]+`, not starting with a dot.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[async_trait]
impl Queries for JsonDirStore {
    fn backend_name(&self) -> &'static str {
        "json-dir"
    }

    async fn get_all(&self, resource: &str, filter: Option<&Filter>) -> StorageResult<Vec<Item>> {
        let items = self.load(resource).await?;
        Ok(collection::select(&items, filter))
    }

    async fn get_by_id(&self, resource: &str, id: &str) -> StorageResult<Option<Item>> {
        let items = self.load(resource).await?;
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
