//! Pure, stateless content and path classifiers.
//!
//! These heuristics feed [`FileMetadata`](crate::entry::FileMetadata): the
//! downstream compiler layer uses them to decide whether a file needs
//! compiling at all (already minified, already source-mapped, vendored).

/// Number of leading characters examined by the minification heuristic.
const MINIFY_WINDOW: usize = 1024;

/// Average line length above which content is classified as minified.
const MINIFY_AVG_LINE_LEN: f64 = 80.0;

/// Comment marker that introduces an inline source map reference.
const SOURCE_MAP_MARKER: &str = "//# sourceMap";

/// Vendored-dependency directory name, matched case-insensitively.
const DEPENDENCY_DIR: &str = "node_modules";

/// Packaged-runtime archive naming convention.
const RUNTIME_ARCHIVE: &str = "atom.asar";

/// Returns `true` if the content looks minified.
///
/// Examines up to the first 1024 characters. With no newlines in that
/// window, anything longer than 80 characters is considered minified;
/// otherwise the average line length in the window decides.
pub fn contents_are_minified(source: &str) -> bool {
    let mut window_len = 0usize;
    let mut newline_count = 0usize;
    for c in source.chars().take(MINIFY_WINDOW) {
        window_len += 1;
        if c == '\n' {
            newline_count += 1;
        }
    }

    if newline_count == 0 {
        return window_len as f64 > MINIFY_AVG_LINE_LEN;
    }

    window_len as f64 / newline_count as f64 > MINIFY_AVG_LINE_LEN
}

/// Returns `true` if an inline source map marker sits on the final line.
///
/// The marker only counts when its last occurrence is positioned after the
/// text's last newline, i.e. a marker buried mid-file does not qualify.
pub fn has_inline_source_map(source: &str) -> bool {
    let marker = match source.rfind(SOURCE_MAP_MARKER) {
        Some(idx) => idx as i64,
        None => return false,
    };
    let last_newline = source.rfind('\n').map(|idx| idx as i64).unwrap_or(-1);
    marker > last_newline
}

/// Returns `true` if the path lexically falls under a vendored-dependencies
/// directory or names a packaged-runtime archive.
///
/// The dependency directory is matched case-insensitively under both
/// forward- and back-slash separators.
pub fn is_in_dependency_tree(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let vendored = lower.match_indices(DEPENDENCY_DIR).any(|(idx, matched)| {
        matches!(
            lower.as_bytes().get(idx + matched.len()),
            Some(b'/') | Some(b'\\')
        )
    });
    vendored || path.contains(RUNTIME_ARCHIVE)
}
