//! Content-addressed image store on the local filesystem.
//!
//! # Layout
//!
//! ```text
//! <root>/<sha256-hex>.jpeg
//! ```
//!
//! The existence of a file at its digest path is the whole index; there is
//! no separate metadata. Entries are written once and never updated or
//! removed.
//!
//! # Concurrency
//!
//! Writers for the same digest are serialized by a per-digest async lock, so
//! only one of them ever writes. Writers for different digests proceed in
//! parallel. Each write goes to a unique temporary file in the same
//! directory, is synced, and is then renamed onto the final path, so a
//! partially written file is never visible under a digest name, even across
//! processes or when the writing task is cancelled.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use tracing::{debug, info};

use super::digest::ContentDigest;
use crate::error::StorageError;
use crate::render::{EncodedImage, JPEG_EXTENSION};

/// Lock table size above which dead entries are pruned.
const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Result of [`ContentStore::store_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOutcome {
    /// Digest of the stored bytes
    pub digest: ContentDigest,

    /// Final path of the cache file
    pub path: PathBuf,

    /// `true` if this call wrote the file, `false` on a cache hit
    pub stored: bool,
}

/// Counters for store activity since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Files written
    pub writes: u64,

    /// Requests satisfied by an existing file
    pub hits: u64,
}

/// Write-once, content-addressed file store.
///
/// # Example
///
/// ```no_run
/// use textshot::render::EncodedImage;
/// use textshot::store::ContentStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ContentStore::open("public/images").await?;
/// let outcome = store.store_if_absent(&EncodedImage::jpeg(vec![0xFF, 0xD8])).await?;
/// println!("{} stored={}", outcome.digest, outcome.stored);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ContentStore {
    root: PathBuf,
    locks: Mutex<HashMap<ContentDigest, Weak<tokio::sync::Mutex<()>>>>,
    writes: AtomicU64,
    hits: AtomicU64,
}

impl ContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Root`] if the directory cannot be created or
    /// the path exists and is not a directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();

        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Root {
                path: root.display().to_string(),
                message: e.to_string(),
            })?;

        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|e| StorageError::Root {
                path: root.display().to_string(),
                message: e.to_string(),
            })?;
        if !metadata.is_dir() {
            return Err(StorageError::Root {
                path: root.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
            writes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        })
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path for a digest.
    pub fn path_for(&self, digest: &ContentDigest) -> PathBuf {
        self.root.join(digest.file_name(JPEG_EXTENSION))
    }

    /// Whether a file for `digest` is present.
    pub async fn contains(&self, digest: &ContentDigest) -> Result<bool, StorageError> {
        let path = self.path_for(digest);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(&path, &e))
    }

    /// Persist `image` under its digest unless it is already present.
    ///
    /// Returns the digest, the final path, and whether this call wrote the
    /// file. Callers see the same digest and path either way.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] on any filesystem failure. Nothing is
    /// retried.
    pub async fn store_if_absent(&self, image: &EncodedImage) -> Result<StoreOutcome, StorageError> {
        let digest = ContentDigest::of(&image.bytes);
        let path = self.root.join(digest.file_name(image.extension()));

        let lock = self.lock_for(&digest);
        let _guard = lock.lock().await;

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(&path, &e))?;

        if exists {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(digest = %digest, "Image already cached");
            return Ok(StoreOutcome {
                digest,
                path,
                stored: false,
            });
        }

        self.publish(&digest, &path, image.bytes.clone()).await?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        info!(digest = %digest, bytes = image.len(), "Stored new image");

        Ok(StoreOutcome {
            digest,
            path,
            stored: true,
        })
    }

    /// Activity counters since the store was opened.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            writes: self.writes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    /// Write `bytes` to a temp file and rename it onto `path`.
    ///
    /// The write runs as one unit on the blocking pool. Dropping the caller's
    /// future does not interrupt it, so a started write always ends with the
    /// file renamed into place or the temp file removed.
    async fn publish(
        &self,
        digest: &ContentDigest,
        path: &Path,
        bytes: Bytes,
    ) -> Result<(), StorageError> {
        let temp_path = self.root.join(format!(
            ".{}.{}-{}.tmp",
            digest,
            std::process::id(),
            TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));
        let final_path = path.to_path_buf();

        tokio::task::spawn_blocking(move || write_then_rename(temp_path, &final_path, &bytes))
            .await
            .map_err(|e| StorageError::Io {
                path: path.display().to_string(),
                message: format!("write task failed: {}", e),
            })?
    }

    /// Get or create the lock for a digest.
    fn lock_for(&self, digest: &ContentDigest) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(lock) = locks.get(digest).and_then(Weak::upgrade) {
            return lock;
        }

        if locks.len() >= LOCK_TABLE_PRUNE_THRESHOLD {
            locks.retain(|_, lock| lock.strong_count() > 0);
        }

        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(digest.clone(), Arc::downgrade(&lock));
        lock
    }
}

/// Create `temp_path`, write and sync `bytes`, then rename onto `path`.
fn write_then_rename(temp_path: PathBuf, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut temp = TempFile::new(temp_path);

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp.path())
        .map_err(|e| StorageError::io(temp.path(), &e))?;

    file.write_all(bytes)
        .map_err(|e| StorageError::io(temp.path(), &e))?;
    file.sync_all()
        .map_err(|e| StorageError::io(temp.path(), &e))?;
    drop(file);

    std::fs::rename(temp.path(), path).map_err(|e| StorageError::io(path, &e))?;
    temp.disarm();

    Ok(())
}

/// Removes a temp file on drop unless disarmed.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
