//! Text encoding detection for telling source text apart from binary data.
//!
//! Detection samples the head of the file and tries each candidate encoding
//! in a fixed order, accepting the first one whose decoded sample does not
//! look like control-character noise. A file with no accepted encoding is
//! classified binary.

/// Number of leading bytes sampled for detection. Smaller files use their
/// full length.
const SAMPLE_LEN: usize = 4096;

/// Ratio of noise characters above which a decoded sample is rejected.
const NOISE_RATIO: f64 = 0.02;

/// A text encoding the cache can detect and decode.
///
/// Candidates are tried in declaration order. UTF-8 goes first: decoding
/// binary data as UTF-16 frequently "succeeds" cleanly with garbage, while
/// a genuine UTF-8 text file rarely misclassifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8.
    Utf8,
    /// UTF-16, little-endian.
    Utf16Le,
}

const CANDIDATES: [TextEncoding; 2] = [TextEncoding::Utf8, TextEncoding::Utf16Le];

/// Detects the text encoding of the given bytes, or `None` for binary data.
///
/// Only the first 4096 bytes are examined. Empty input detects nothing
/// (an empty file is classified binary).
pub fn detect_encoding(buf: &[u8]) -> Option<TextEncoding> {
    if buf.is_empty() {
        return None;
    }
    let sample = &buf[..buf.len().min(SAMPLE_LEN)];
    CANDIDATES
        .into_iter()
        .find(|encoding| !looks_like_noise(&decode_lossy(sample, *encoding)))
}

/// Decodes bytes under the given encoding, replacing invalid sequences with
/// `U+FFFD`.
///
/// For UTF-16-LE a trailing odd byte is dropped.
pub fn decode_lossy(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Utf16Le => {
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|result| result.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
    }
}

/// Control-character noise heuristic over a decoded sample.
///
/// Counts code points below 8 plus `U+FFFD` (the lossy-decode artifact).
/// A count over the threshold (2 for samples under 64 chars, 16 otherwise)
/// rejects outright; a zero count accepts outright; in between, the sample
/// is accepted only when the noise ratio stays under 2%. This is a
/// heuristic, not a decoder validity check; rare misclassifications are
/// acceptable.
fn looks_like_noise(sample: &str) -> bool {
    let len = sample.chars().count();
    let threshold = if len < 64 { 2 } else { 16 };

    let mut count = 0usize;
    for c in sample.chars() {
        if (c as u32) < 8 || c == char::REPLACEMENT_CHARACTER {
            count += 1;
        }
        if count > threshold {
            return true;
        }
    }

    if count == 0 {
        return false;
    }
    count as f64 / len as f64 >= NOISE_RATIO
}
