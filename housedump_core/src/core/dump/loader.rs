use std::path::Path;

use log::{info, warn};

use crate::error::IngestError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Reads a dump file. Invalid UTF-8 sequences are replaced rather than rejected.
pub async fn load_dump(path: impl AsRef<Path>) -> Result<String, IngestError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    info!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(decode_best_effort(&bytes))
}

/// Decodes bytes as UTF-8 without failing; a leading byte order mark is dropped.
pub fn decode_best_effort(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match String::from_utf8_lossy(bytes) {
        std::borrow::Cow::Borrowed(text) => text.to_string(),
        std::borrow::Cow::Owned(text) => {
            warn!("Dump is not valid UTF-8, invalid sequences were replaced");
            text
        }
    }
}
