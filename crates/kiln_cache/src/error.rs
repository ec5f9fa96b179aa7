//! Error types for file metadata cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache lookups and persistence.
///
/// All errors propagate to the immediate caller. The cache never retries
/// internally and never degrades from strict to non-strict behavior.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A strict-mode lookup found no entry for the requested path.
    ///
    /// Strict mode exists to guarantee that no recomputation happens, so a
    /// miss is always a hard failure naming the offending path. It indicates
    /// an incomplete precompilation pass.
    #[error("no cache entry for {path}: it was not precompiled")]
    CacheMiss {
        /// The absolute path that was requested.
        path: PathBuf,
    },

    /// The path is absent or does not resolve to a regular file.
    #[error("{path} is not a regular file")]
    NotAFile {
        /// The path that failed validation.
        path: PathBuf,
    },

    /// An underlying stat, read, or write failed.
    ///
    /// The in-memory table is left unmodified for the failing entry.
    #[error("I/O failure at {path}: {source}")]
    IoFailure {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A persisted cache blob could not be decompressed or parsed.
    ///
    /// Loading fails as a whole; no partially populated cache is returned.
    #[error("corrupt cache blob: {reason}")]
    CorruptCache {
        /// Description of the decompression or parse failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_miss_display() {
        let err = CacheError::CacheMiss {
            path: PathBuf::from("/app/src/index.js"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/app/src/index.js"));
        assert!(msg.contains("not precompiled"));
    }

    #[test]
    fn not_a_file_display() {
        let err = CacheError::NotAFile {
            path: PathBuf::from("/app/src"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/app/src"));
        assert!(msg.contains("not a regular file"));
    }

    #[test]
    fn io_failure_display() {
        let err = CacheError::IoFailure {
            path: PathBuf::from("/app/compile-cache.gz"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("I/O failure"));
        assert!(msg.contains("compile-cache.gz"));
    }

    #[test]
    fn corrupt_cache_display() {
        let err = CacheError::CorruptCache {
            reason: "unexpected EOF".to_string(),
        };
        assert!(err.to_string().contains("unexpected EOF"));
    }
}
