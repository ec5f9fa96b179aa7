//! Persisted projection of the cache and its gzip-framed JSON codec.
//!
//! The on-disk artifact is a single gzip block whose decompressed payload is
//! a UTF-8 JSON document with exactly two top-level fields: `changeCache`
//! (the table) and `appRoot` (the root the keys were derived against). The
//! format must be exactly reproducible for cross-run and cross-machine
//! compatibility, which is why the table is a `BTreeMap`: serialization
//! order is deterministic for a given state.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::entry::CacheEntry;
use crate::error::CacheError;

/// Serializable projection of a cache's durable state.
///
/// Strict mode and any legacy root are runtime properties and are not
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Tracked files, keyed by root-relative cache key.
    #[serde(rename = "changeCache")]
    pub change_cache: BTreeMap<String, CacheEntry>,

    /// Root the keys were derived against; empty when keys are absolute.
    #[serde(rename = "appRoot")]
    pub app_root: String,
}

impl CacheSnapshot {
    /// Encodes the snapshot as a gzip-compressed JSON document.
    pub fn to_gzip_bytes(&self) -> std::io::Result<Vec<u8>> {
        let json = serde_json::to_vec(self).map_err(std::io::Error::other)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()
    }

    /// Decodes a snapshot from a gzip-compressed JSON document.
    ///
    /// An uncompressed, truncated, or structurally invalid blob fails with
    /// [`CacheError::CorruptCache`]; no partial snapshot is ever returned.
    pub fn from_gzip_bytes(blob: &[u8]) -> Result<Self, CacheError> {
        let mut decoder = GzDecoder::new(blob);
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .map_err(|e| CacheError::CorruptCache {
                reason: format!("gzip decompression failed: {e}"),
            })?;
        serde_json::from_slice(&json).map_err(|e| CacheError::CorruptCache {
            reason: format!("cache document parse failed: {e}"),
        })
    }
}
