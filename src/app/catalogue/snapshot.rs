//! On-disk catalogue snapshots
//!
//! Each source gets its own directory under the cache root holding the
//! catalogue and its name index as JSON. Snapshots are only replaced by an
//! explicit rebuild; a missing, unreadable or out-of-version file simply
//! counts as absent.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::catalogue::Catalogue;
use crate::app::client::download::temp_path_for;
use crate::app::models::DataSource;
use crate::app::resolver::NameIndex;
use crate::constants::files;
use crate::errors::{CatalogueError, CatalogueResult};

#[derive(Serialize)]
struct Envelope<'a, T> {
    format_version: u32,
    source: DataSource,
    saved_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
    source: DataSource,
}

#[derive(Deserialize)]
struct OwnedEnvelope<T> {
    data: T,
}

/// Reads and writes the snapshot files of one data source
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    source: DataSource,
}

impl SnapshotStore {
    pub fn new(cache_root: &Path, source: DataSource) -> Self {
        Self {
            dir: cache_root.join(source.slug()),
            source,
        }
    }

    /// Platform cache directory for snapshots
    pub fn default_cache_root() -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join(files::APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".cache").join(files::APP_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn catalogue_path(&self) -> PathBuf {
        self.dir.join(files::CATALOGUE_FILE)
    }

    pub fn name_index_path(&self) -> PathBuf {
        self.dir.join(files::NAME_INDEX_FILE)
    }

    /// Load the catalogue and its name index
    ///
    /// Returns `Ok(None)` when no usable catalogue snapshot exists. A usable
    /// catalogue with a missing index gets a freshly derived index.
    pub async fn load(&self) -> CatalogueResult<Option<(Catalogue, NameIndex)>> {
        let Some(catalogue) = self.read::<Catalogue>(&self.catalogue_path()).await else {
            return Ok(None);
        };

        let index = match self.read::<NameIndex>(&self.name_index_path()).await {
            Some(index) => index,
            None => {
                debug!("Name index snapshot missing, deriving it from the catalogue");
                NameIndex::build(&catalogue)
            }
        };

        info!(
            "Loaded {} catalogue snapshot ({} regions, built {})",
            self.source,
            catalogue.len(),
            catalogue.built_at()
        );
        Ok(Some((catalogue, index)))
    }

    /// Persist the catalogue and its name index, replacing earlier snapshots
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError` if serialization or file I/O fails
    pub async fn save(&self, catalogue: &Catalogue, index: &NameIndex) -> CatalogueResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CatalogueError::SnapshotIo {
                path: self.dir.clone(),
                source,
            })?;

        self.write(&self.catalogue_path(), catalogue).await?;
        self.write(&self.name_index_path(), index).await?;

        info!(
            "Saved {} catalogue snapshot to {}",
            self.source,
            self.dir.display()
        );
        Ok(())
    }

    /// Remove this source's snapshot files; returns whether anything was removed
    pub async fn clear(&self) -> CatalogueResult<bool> {
        let mut removed = false;
        for path in [self.catalogue_path(), self.name_index_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(CatalogueError::SnapshotIo { path, source }),
            }
        }
        Ok(removed)
    }

    async fn read<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read snapshot {}: {}", path.display(), e);
                return None;
            }
        };

        let header: Header = match serde_json::from_slice(&bytes) {
            Ok(header) => header,
            Err(e) => {
                warn!("Ignoring unreadable snapshot {}: {}", path.display(), e);
                return None;
            }
        };
        if header.format_version != files::SNAPSHOT_FORMAT_VERSION || header.source != self.source
        {
            warn!(
                "Ignoring snapshot {} (version {}, source {})",
                path.display(),
                header.format_version,
                header.source
            );
            return None;
        }

        match serde_json::from_slice::<OwnedEnvelope<T>>(&bytes) {
            Ok(envelope) => Some(envelope.data),
            Err(e) => {
                warn!("Ignoring unreadable snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, path: &Path, data: &T) -> CatalogueResult<()> {
        let envelope = Envelope {
            format_version: files::SNAPSHOT_FORMAT_VERSION,
            source: self.source,
            saved_at: Utc::now(),
            data,
        };
        let json = serde_json::to_vec_pretty(&envelope)?;

        let temp_path = temp_path_for(path);
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|source| CatalogueError::SnapshotIo {
                path: temp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|source| CatalogueError::SnapshotIo {
                path: path.to_path_buf(),
                source,
            })
    }
}
