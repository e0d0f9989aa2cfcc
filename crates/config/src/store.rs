//! Artifact persistence on top of `object_store`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use tracing::debug;

/// Store every stage reads its inputs from and writes its outputs to.
///
/// Paths are relative to the store root and use forward slashes. Writing a
/// path creates its parent directories.
#[derive(Clone)]
pub struct ArtifactStore {
    inner: Arc<dyn ObjectStore>,
    root: PathBuf,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ArtifactStore {
    /// Opens a store on the local file system, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn local(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create artifact root: {}", root.display()))?;

        let inner = LocalFileSystem::new_with_prefix(root)
            .with_context(|| format!("Failed to open artifact root: {}", root.display()))?;

        Ok(Self {
            inner: Arc::new(inner),
            root: root.to_path_buf(),
        })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a store path on the local file system.
    #[must_use]
    pub fn local_path(&self, relative_path: &str) -> PathBuf {
        relative_path
            .split('/')
            .filter(|p| !p.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// Writes `data` to `relative_path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `object_store` fails.
    pub async fn put(&self, relative_path: &str, data: impl Into<Bytes>) -> Result<()> {
        let object_path = ObjectStorePath::from(relative_path);
        let data: Bytes = data.into();
        let size = data.len();

        self.inner
            .put(&object_path, data.into())
            .await
            .with_context(|| format!("Failed to write {relative_path} to object_store"))?;

        debug!(path = relative_path, bytes = size, "Artifact written");
        Ok(())
    }

    /// Reads the whole content of `relative_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from `object_store` fails.
    pub async fn get(&self, relative_path: &str) -> Result<Bytes> {
        let object_path = ObjectStorePath::from(relative_path);

        self.inner
            .get(&object_path)
            .await
            .with_context(|| format!("Failed to read {relative_path} from object_store"))?
            .bytes()
            .await
            .with_context(|| format!("Failed to read bytes of {relative_path} from object_store"))
    }

    /// Returns whether an object exists at `relative_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub async fn exists(&self, relative_path: &str) -> Result<bool> {
        let object_path = ObjectStorePath::from(relative_path);

        match self.inner.head(&object_path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {relative_path}")),
        }
    }

    /// Copies an object, overwriting the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        // Reading and re-writing creates the destination's parent directories.
        let data = self.get(from).await?;
        self.put(to, data).await
    }

    /// Lists the immediate sub-directory names under `prefix`.
    ///
    /// A missing prefix yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.local_path(prefix).is_dir() {
            return Ok(Vec::new());
        }

        let object_path = ObjectStorePath::from(prefix);
        let listing = self
            .inner
            .list_with_delimiter(Some(&object_path))
            .await
            .with_context(|| format!("Failed to list {prefix}"))?;

        Ok(listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename().map(str::to_string))
            .collect())
    }
}
