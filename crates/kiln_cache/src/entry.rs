//! Data model for tracked files: computed metadata, table entries, and the
//! shapes returned by lookups.

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

/// File-level facts computed once per content change.
///
/// The downstream compiler layer reads these to decide whether a file needs
/// compiling at all. Field renames match the persisted blob format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Hex digest of the file content. Text files hash their decoded text
    /// re-encoded as UTF-8; binary files hash the raw bytes.
    #[serde(rename = "hash")]
    pub content_hash: ContentHash,

    /// Whether the content looks minified (average-line-length heuristic).
    #[serde(rename = "isMinified")]
    pub is_minified: bool,

    /// Whether the path lexically falls under a vendored-dependencies
    /// directory.
    #[serde(rename = "isInNodeModules")]
    pub is_in_dependency_tree: bool,

    /// Whether an inline source map marker sits on the file's last line.
    #[serde(rename = "hasSourceMap")]
    pub has_inline_source_map: bool,

    /// Whether no text encoding could be detected.
    #[serde(rename = "isFileBinary")]
    pub is_binary: bool,
}

/// One tracked file: the stat fingerprint observed when its metadata was
/// computed, plus the metadata itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Filesystem change time (milliseconds) at computation.
    pub ctime: i64,

    /// Byte length at computation.
    pub size: u64,

    /// The metadata computed at that moment.
    pub info: FileMetadata,
}

impl CacheEntry {
    /// Returns `true` if this entry still vouches for a file with the given
    /// current stat fingerprint.
    ///
    /// Validity is necessary, not sufficient, for content equality: content
    /// could in principle change within the same change time and size, an
    /// accepted limitation of this fast path.
    pub fn is_valid_for(&self, ctime: i64, size: u64) -> bool {
        self.ctime >= ctime && self.size == size
    }
}

/// File content captured during a fresh metadata computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    /// A file with a detected text encoding, decoded in full.
    Text {
        /// The decoded text.
        content: String,
        /// Metadata computed against the decoded text.
        info: FileMetadata,
    },
    /// A file with no detectable text encoding.
    Binary {
        /// The raw bytes.
        bytes: Vec<u8>,
        /// Metadata computed against the raw bytes.
        info: FileMetadata,
    },
}

impl FileContents {
    /// The metadata, regardless of payload kind.
    pub fn info(&self) -> &FileMetadata {
        match self {
            FileContents::Text { info, .. } | FileContents::Binary { info, .. } => info,
        }
    }
}

/// Outcome of a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Served from the in-memory table; file content was not (re)read.
    Hit(FileMetadata),
    /// Freshly computed from disk, with the content that was read.
    Computed(FileContents),
}

impl CacheLookup {
    /// The metadata, regardless of how it was obtained.
    pub fn info(&self) -> &FileMetadata {
        match self {
            CacheLookup::Hit(info) => info,
            CacheLookup::Computed(contents) => contents.info(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> FileMetadata {
        FileMetadata {
            content_hash: ContentHash::from_bytes(b"sample"),
            is_minified: false,
            is_in_dependency_tree: false,
            has_inline_source_map: false,
            is_binary: false,
        }
    }

    #[test]
    fn entry_valid_when_fingerprint_unchanged() {
        let entry = CacheEntry {
            ctime: 1000,
            size: 42,
            info: sample_info(),
        };
        assert!(entry.is_valid_for(1000, 42));
    }

    #[test]
    fn entry_valid_when_recorded_ctime_is_newer() {
        let entry = CacheEntry {
            ctime: 2000,
            size: 42,
            info: sample_info(),
        };
        assert!(entry.is_valid_for(1000, 42));
    }

    #[test]
    fn entry_invalid_when_ctime_advanced() {
        let entry = CacheEntry {
            ctime: 1000,
            size: 42,
            info: sample_info(),
        };
        assert!(!entry.is_valid_for(2000, 42));
    }

    #[test]
    fn entry_invalid_when_size_changed() {
        let entry = CacheEntry {
            ctime: 1000,
            size: 42,
            info: sample_info(),
        };
        assert!(!entry.is_valid_for(1000, 43));
    }

    #[test]
    fn metadata_wire_field_names() {
        let json = serde_json::to_value(sample_info()).unwrap();
        let obj = json.as_object().unwrap();
        for field in [
            "hash",
            "isMinified",
            "isInNodeModules",
            "hasSourceMap",
            "isFileBinary",
        ] {
            assert!(obj.contains_key(field), "missing wire field {field}");
        }
        assert_eq!(obj.len(), 5);
    }

    #[test]
    fn entry_serde_roundtrip() {
        let entry = CacheEntry {
            ctime: 1_700_000_000_000,
            size: 1234,
            info: sample_info(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn lookup_info_accessor() {
        let info = sample_info();
        let hit = CacheLookup::Hit(info.clone());
        assert_eq!(hit.info(), &info);

        let computed = CacheLookup::Computed(FileContents::Text {
            content: "let x = 1;".to_string(),
            info: info.clone(),
        });
        assert_eq!(computed.info(), &info);

        let binary = CacheLookup::Computed(FileContents::Binary {
            bytes: vec![0, 1, 2],
            info: info.clone(),
        });
        assert_eq!(binary.info(), &info);
    }
}
