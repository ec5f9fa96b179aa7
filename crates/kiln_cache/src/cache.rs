//! The validate-or-recompute file metadata cache.
//!
//! For every file the compiler pipeline touches, the cache decides whether a
//! previously computed [`FileMetadata`] is still trustworthy, and computes
//! and records a fresh one otherwise. The stat fingerprint (change time and
//! size) gates the fast path: an unchanged file is served from the table
//! without ever re-reading its content, which is what makes repeated builds
//! fast. A restored cache normally runs in strict mode, where it is a
//! read-only production artifact and any miss is a hard failure.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kiln_common::ContentHash;

use crate::classify;
use crate::encoding;
use crate::entry::{CacheEntry, CacheLookup, FileContents, FileMetadata};
use crate::error::CacheError;
use crate::observer::{CacheObserver, NullObserver};
use crate::snapshot::CacheSnapshot;

/// Incremental cache of per-file metadata, keyed by root-relative path.
///
/// Blocking (`*_sync`) and suspension-capable entry points share all pure
/// computation; only the filesystem shell differs, so the two can never
/// diverge in result for the same inputs.
///
/// The cache takes `&mut self` for mutating lookups, so a single instance
/// needs no internal locking; callers that want cross-task sharing wrap it
/// themselves and accept that two concurrent misses for the same path do
/// redundant (but equivalent) work.
pub struct FileChangeCache {
    /// Absolute directory the cache keys are relative to, if any.
    root: Option<String>,

    /// Root recorded inside a restored blob, when it differs from `root`.
    /// Lets a cache built under one absolute path be read under another.
    legacy_root: Option<String>,

    /// When `true`, the cache is read-only and a miss is a hard error.
    strict: bool,

    /// Tracked files by cache key. Ordered for deterministic serialization.
    table: BTreeMap<String, CacheEntry>,

    observer: Box<dyn CacheObserver>,
}

impl std::fmt::Debug for FileChangeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileChangeCache")
            .field("root", &self.root)
            .field("legacy_root", &self.legacy_root)
            .field("strict", &self.strict)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl FileChangeCache {
    /// Creates an empty cache whose keys are derived relative to `root`
    /// (or absolute, when `root` is `None`).
    ///
    /// Fresh caches are normally non-strict: they fill themselves by
    /// recomputing whatever they are asked about.
    pub fn new(root: Option<&Path>, strict: bool) -> Self {
        Self {
            root: root.map(path_string),
            legacy_root: None,
            strict,
            table: BTreeMap::new(),
            observer: Box::new(NullObserver),
        }
    }

    /// Replaces the observer invoked at cache decision points.
    pub fn with_observer(mut self, observer: Box<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Restores a cache from an already-parsed snapshot.
    ///
    /// The root recorded inside the snapshot becomes the legacy root: keys in
    /// the table were derived against it, so lookups strip it as a prefix
    /// after the caller's `root`. Restored caches are normally strict.
    pub fn from_snapshot(snapshot: CacheSnapshot, root: Option<&Path>, strict: bool) -> Self {
        let legacy_root = if snapshot.app_root.is_empty() {
            None
        } else {
            Some(snapshot.app_root)
        };
        Self {
            root: root.map(path_string),
            legacy_root,
            strict,
            table: snapshot.change_cache,
            observer: Box::new(NullObserver),
        }
    }

    /// Reads and restores a persisted cache blob.
    ///
    /// Fails with [`CacheError::CorruptCache`] if the blob does not
    /// decompress and parse as a whole; no partially populated cache is
    /// returned.
    pub async fn load(path: &Path, root: Option<&Path>, strict: bool) -> Result<Self, CacheError> {
        let blob = tokio::fs::read(path).await.map_err(|e| CacheError::IoFailure {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot = CacheSnapshot::from_gzip_bytes(&blob)?;
        Ok(Self::from_snapshot(snapshot, root, strict))
    }

    /// Blocking form of [`load`](Self::load).
    pub fn load_sync(path: &Path, root: Option<&Path>, strict: bool) -> Result<Self, CacheError> {
        let blob = std::fs::read(path).map_err(|e| CacheError::IoFailure {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot = CacheSnapshot::from_gzip_bytes(&blob)?;
        Ok(Self::from_snapshot(snapshot, root, strict))
    }

    /// The root the cache keys are derived against, if any.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Returns `true` if the cache fails on misses instead of recomputing.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no files are tracked.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns validated metadata for `absolute_path`, recomputing if needed.
    ///
    /// In strict mode the filesystem is never touched: the stored metadata is
    /// returned if present, otherwise the lookup fails with
    /// [`CacheError::CacheMiss`]. In non-strict mode a valid entry is served
    /// without re-reading content; a missing or stale entry triggers a fresh
    /// computation whose result (metadata plus decoded text or raw bytes)
    /// replaces the entry and is returned.
    pub async fn get_metadata(&mut self, absolute_path: &Path) -> Result<CacheLookup, CacheError> {
        let cache_key = self.cache_key(absolute_path);
        if self.strict {
            return self.lookup_strict(&cache_key, absolute_path);
        }

        let meta = tokio::fs::metadata(absolute_path)
            .await
            .map_err(|e| stat_error(absolute_path, e))?;
        let (ctime, size) = validate_stat(absolute_path, &meta)?;

        if let Some(info) = self.serve_valid_entry(&cache_key, ctime, size) {
            return Ok(CacheLookup::Hit(info));
        }

        let bytes = tokio::fs::read(absolute_path)
            .await
            .map_err(|e| read_error(absolute_path, e))?;
        Ok(self.record_fresh(cache_key, absolute_path, ctime, size, bytes))
    }

    /// Blocking form of [`get_metadata`](Self::get_metadata).
    pub fn get_metadata_sync(&mut self, absolute_path: &Path) -> Result<CacheLookup, CacheError> {
        let cache_key = self.cache_key(absolute_path);
        if self.strict {
            return self.lookup_strict(&cache_key, absolute_path);
        }

        let meta = std::fs::metadata(absolute_path).map_err(|e| stat_error(absolute_path, e))?;
        let (ctime, size) = validate_stat(absolute_path, &meta)?;

        if let Some(info) = self.serve_valid_entry(&cache_key, ctime, size) {
            return Ok(CacheLookup::Hit(info));
        }

        let bytes = std::fs::read(absolute_path).map_err(|e| read_error(absolute_path, e))?;
        Ok(self.record_fresh(cache_key, absolute_path, ctime, size, bytes))
    }

    /// Serializable projection of the current state.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            change_cache: self.table.clone(),
            app_root: self.root.clone().unwrap_or_default(),
        }
    }

    /// Persists the whole cache to `destination`, replacing prior content.
    ///
    /// The blob is written to a temporary sibling and renamed into place, so
    /// readers never observe a half-written file.
    pub async fn save(&self, destination: &Path) -> Result<(), CacheError> {
        let blob = self.encode_blob(destination)?;
        let tmp = sibling_tmp_path(destination);
        let write = async {
            tokio::fs::write(&tmp, &blob).await?;
            tokio::fs::rename(&tmp, destination).await
        };
        write.await.map_err(|e| CacheError::IoFailure {
            path: destination.to_path_buf(),
            source: e,
        })
    }

    /// Blocking form of [`save`](Self::save). Produces byte-identical output
    /// for the same cache state.
    pub fn save_sync(&self, destination: &Path) -> Result<(), CacheError> {
        let blob = self.encode_blob(destination)?;
        let tmp = sibling_tmp_path(destination);
        std::fs::write(&tmp, &blob)
            .and_then(|_| std::fs::rename(&tmp, destination))
            .map_err(|e| CacheError::IoFailure {
                path: destination.to_path_buf(),
                source: e,
            })
    }

    fn encode_blob(&self, destination: &Path) -> Result<Vec<u8>, CacheError> {
        self.snapshot()
            .to_gzip_bytes()
            .map_err(|e| CacheError::IoFailure {
                path: destination.to_path_buf(),
                source: e,
            })
    }

    /// Derives the table key for an absolute path by stripping the primary
    /// root, then the legacy root, as literal prefixes.
    fn cache_key(&self, absolute_path: &Path) -> String {
        let mut key = path_string(absolute_path);
        if let Some(root) = &self.root {
            if let Some(stripped) = key.strip_prefix(root.as_str()) {
                key = stripped.to_string();
            }
        }
        if let Some(legacy) = &self.legacy_root {
            if let Some(stripped) = key.strip_prefix(legacy.as_str()) {
                key = stripped.to_string();
            }
        }
        key
    }

    fn lookup_strict(
        &self,
        cache_key: &str,
        absolute_path: &Path,
    ) -> Result<CacheLookup, CacheError> {
        match self.table.get(cache_key) {
            Some(entry) => {
                self.observer.cache_hit(cache_key);
                Ok(CacheLookup::Hit(entry.info.clone()))
            }
            None => Err(CacheError::CacheMiss {
                path: absolute_path.to_path_buf(),
            }),
        }
    }

    /// Returns the stored metadata if the entry for `cache_key` still vouches
    /// for the current stat fingerprint; reports a stale entry otherwise.
    fn serve_valid_entry(&self, cache_key: &str, ctime: i64, size: u64) -> Option<FileMetadata> {
        let entry = self.table.get(cache_key)?;
        if entry.is_valid_for(ctime, size) {
            self.observer.cache_hit(cache_key);
            return Some(entry.info.clone());
        }
        self.observer.entry_invalidated(cache_key, entry);
        None
    }

    /// Computes fresh metadata from the file bytes and records it.
    ///
    /// A stale entry under the same key is simply overwritten.
    fn record_fresh(
        &mut self,
        cache_key: String,
        absolute_path: &Path,
        ctime: i64,
        size: u64,
        bytes: Vec<u8>,
    ) -> CacheLookup {
        self.observer.cache_miss(&cache_key);
        let contents = compute_contents(absolute_path, bytes);
        self.table.insert(
            cache_key,
            CacheEntry {
                ctime,
                size,
                info: contents.info().clone(),
            },
        );
        CacheLookup::Computed(contents)
    }
}

/// Computes the full [`FileContents`] for a file's bytes.
///
/// Encoding detection runs over the head of the buffer; a detected encoding
/// decodes the entire file and hashes the decoded text re-encoded as UTF-8,
/// otherwise the raw bytes are hashed and the content heuristics are false.
/// The dependency-tree flag depends only on the path.
fn compute_contents(absolute_path: &Path, bytes: Vec<u8>) -> FileContents {
    let in_dependency_tree = classify::is_in_dependency_tree(&path_string(absolute_path));

    match encoding::detect_encoding(&bytes) {
        None => {
            let info = FileMetadata {
                content_hash: ContentHash::from_bytes(&bytes),
                is_minified: false,
                is_in_dependency_tree: in_dependency_tree,
                has_inline_source_map: false,
                is_binary: true,
            };
            FileContents::Binary { bytes, info }
        }
        Some(text_encoding) => {
            let content = encoding::decode_lossy(&bytes, text_encoding);
            let info = FileMetadata {
                content_hash: ContentHash::from_bytes(content.as_bytes()),
                is_minified: classify::contents_are_minified(&content),
                is_in_dependency_tree: in_dependency_tree,
                has_inline_source_map: classify::has_inline_source_map(&content),
                is_binary: false,
            };
            FileContents::Text { content, info }
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Temporary sibling used for write-then-rename persistence.
fn sibling_tmp_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Checks the stat result and extracts the (change time, size) fingerprint.
fn validate_stat(path: &Path, meta: &std::fs::Metadata) -> Result<(i64, u64), CacheError> {
    if !meta.is_file() {
        return Err(CacheError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok((change_time_millis(meta), meta.len()))
}

/// Filesystem change time in milliseconds.
///
/// Unix exposes the inode change time directly; elsewhere the modification
/// time is the closest portable stand-in.
#[cfg(unix)]
fn change_time_millis(meta: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime() * 1000 + meta.ctime_nsec() / 1_000_000
}

#[cfg(not(unix))]
fn change_time_millis(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// An unresolvable path is a validation failure, not an I/O failure.
fn stat_error(path: &Path, err: std::io::Error) -> CacheError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CacheError::NotAFile {
            path: path.to_path_buf(),
        }
    } else {
        CacheError::IoFailure {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

fn read_error(path: &Path, err: std::io::Error) -> CacheError {
    CacheError::IoFailure {
        path: path.to_path_buf(),
        source: err,
    }
}
