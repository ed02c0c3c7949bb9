//! Local filename construction for downloaded attachments.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use super::classify::FileCategory;

/// Number of hex digits of the URL hash kept in filenames.
const HASH_PREFIX_LEN: usize = 8;

/// Builds `<category>_<hash8>_<unix-millis>_<sequence><extension>`.
///
/// `hash8` is the first eight hex digits of the SHA-256 of `original_url`.
/// The sequence number keeps names unique within one run even when two
/// downloads land in the same millisecond.
#[must_use]
pub fn build_local_filename(
    category: FileCategory,
    original_url: &str,
    extension: &str,
    sequence: u64,
    now: SystemTime,
) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    format!(
        "{}_{}_{millis}_{sequence}{extension}",
        category.as_str(),
        url_hash_prefix(original_url)
    )
}

/// First eight lowercase hex digits of the SHA-256 of `url`.
#[must_use]
pub fn url_hash_prefix(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    hex.truncate(HASH_PREFIX_LEN);
    hex
}
