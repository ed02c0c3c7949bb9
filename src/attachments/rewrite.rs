//! Substitution of downloaded attachment URLs in text.

use super::model::AttachmentUrlMap;

/// Replaces every original URL found in `map` with the local file name.
///
/// Longer URLs are substituted first so a URL that is a prefix of another
/// never rewrites part of the longer one. URLs without a local file are left
/// untouched.
#[must_use]
pub fn substitute_local_paths(text: &str, map: &AttachmentUrlMap) -> String {
    let mut entries: Vec<(&str, String)> = map
        .iter()
        .map(|(url, path)| {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            (url, name)
        })
        .collect();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut output = text.to_string();
    for (url, name) in entries {
        if output.contains(url) {
            output = output.replace(url, &name);
        }
    }
    output
}
