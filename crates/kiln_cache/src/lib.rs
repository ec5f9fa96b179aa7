//! Incremental file metadata cache for the kiln compilation pipeline.
//!
//! This crate decides, for every file the pipeline might touch, whether a
//! previously computed result is still valid, and if not, computes and
//! records the metadata needed to validate it next time: a content hash, the
//! detected text encoding (or binary classification), and the minification,
//! source-map, and vendored-path flags the compiler layer consumes.
//!
//! After a precompilation pass, the whole cache is serialized as a gzip blob
//! and restored in production in strict (read-only) mode, where content is
//! never hashed again and a miss is a hard failure.

#![warn(missing_docs)]

pub mod cache;
pub mod classify;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod observer;
pub mod snapshot;

pub use cache::FileChangeCache;
pub use encoding::TextEncoding;
pub use entry::{CacheEntry, CacheLookup, FileContents, FileMetadata};
pub use error::CacheError;
pub use observer::{CacheObserver, NullObserver, TracingObserver};
pub use snapshot::CacheSnapshot;
