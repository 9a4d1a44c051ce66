//! Source validation
//!
//! Decides whether an uploaded file is worth handing to the compiler. Both the
//! extension and at least one language marker must be present. Any read problem
//! counts as "invalid"; validation never errors.

use std::path::Path;
use tracing::{debug, warn};

/// Extensions of the two accepted source dialects (MQL5, MQL4)
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["mq5", "mq4"];

/// Tokens of which at least one must appear in an admissible source
pub const LANGUAGE_MARKERS: [&str; 6] = [
    "#property",
    "OnInit",
    "OnTick",
    "OnStart",
    "input ",
    "extern ",
];

/// Whether the path carries one of the accepted extensions (case-insensitive)
pub fn has_accepted_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}

/// Whether the text contains at least one language marker
pub fn contains_language_marker(content: &str) -> bool {
    LANGUAGE_MARKERS.iter().any(|marker| content.contains(marker))
}

/// Decodes source bytes, honouring a UTF-16 byte-order mark
///
/// MetaEditor saves sources as UTF-16LE by default, so a plain UTF-8 read would
/// miss every marker in such files.
pub fn decode_source(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Validates a candidate source file
///
/// Returns true only when the path is a readable regular file with an accepted
/// extension whose content contains a language marker.
pub async fn validate(path: &Path) -> bool {
    if !has_accepted_extension(path) {
        debug!("Rejecting {}: unsupported extension", path.display());
        return false;
    }

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("File validation error for {}: {}", path.display(), e);
            return false;
        }
    };

    if !metadata.is_file() {
        debug!("Rejecting {}: not a regular file", path.display());
        return false;
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("File validation error for {}: {}", path.display(), e);
            return false;
        }
    };

    let valid = contains_language_marker(&decode_source(&bytes));
    if !valid {
        debug!("Rejecting {}: no language marker found", path.display());
    }
    valid
}
