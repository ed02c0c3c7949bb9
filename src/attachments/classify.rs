//! Extension and category derivation for matched attachments.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::model::{AttachmentReference, ResolvedUrl};

/// Extension assigned to non-image files whose name carries no extension.
///
/// It maps to [`FileCategory::Other`], so such files are never fetched.
pub const IGNORE_EXTENSION: &str = ".ignore";

/// Extension assumed for image-shaped URLs that expose none.
pub const DEFAULT_IMAGE_EXTENSION: &str = ".png";

const MAX_EXTENSION_LEN: usize = 10;

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "svg", "ico", "tif", "tiff", "heic", "avif",
];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "odt", "rtf", "epub"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx", "ods", "csv", "tsv"];
const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "odp", "key"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "log", "rst", "diff", "patch"];
const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "tsx", "jsx", "go", "java", "kt", "swift", "c", "cpp", "cc", "h",
    "hpp", "cs", "rb", "php", "sh", "bash", "zsh", "ps1", "sql", "html", "css", "scss", "vue",
];
const DATA_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml", "xml", "ini", "env", "ndjson"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "gz", "tgz", "tar", "bz2", "xz", "7z", "rar"];
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "ogg", "flac", "aac", "mp4", "mov", "m4v", "avi", "mkv", "webm",
];

/// Coarse file-type bucket used for naming and gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    /// Raster and vector images.
    Images,
    /// PDFs and word-processor documents.
    Documents,
    /// Spreadsheets and CSV-like tables.
    Spreadsheets,
    /// Slide decks.
    Presentations,
    /// Plain text, markdown, logs and patches.
    Text,
    /// Source code.
    Code,
    /// Structured data and configuration files.
    Data,
    /// Compressed archives.
    Archives,
    /// Audio and video.
    Media,
    /// Anything not in the tables. Never downloaded.
    Other,
}

impl FileCategory {
    /// Lowercase name used as the local filename prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Documents => "documents",
            Self::Spreadsheets => "spreadsheets",
            Self::Presentations => "presentations",
            Self::Text => "text",
            Self::Code => "code",
            Self::Data => "data",
            Self::Archives => "archives",
            Self::Media => "media",
            Self::Other => "other",
        }
    }

    /// Parses a category name case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let category = match name.trim().to_ascii_lowercase().as_str() {
            "images" => Self::Images,
            "documents" => Self::Documents,
            "spreadsheets" => Self::Spreadsheets,
            "presentations" => Self::Presentations,
            "text" => Self::Text,
            "code" => Self::Code,
            "data" => Self::Data,
            "archives" => Self::Archives,
            "media" => Self::Media,
            "other" => Self::Other,
            _ => return None,
        };
        Some(category)
    }

    /// Looks up the category for an extension (with or without leading dot).
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let tables: [(&[&str], Self); 9] = [
            (IMAGE_EXTENSIONS, Self::Images),
            (DOCUMENT_EXTENSIONS, Self::Documents),
            (SPREADSHEET_EXTENSIONS, Self::Spreadsheets),
            (PRESENTATION_EXTENSIONS, Self::Presentations),
            (TEXT_EXTENSIONS, Self::Text),
            (CODE_EXTENSIONS, Self::Code),
            (DATA_EXTENSIONS, Self::Data),
            (ARCHIVE_EXTENSIONS, Self::Archives),
            (MEDIA_EXTENSIONS, Self::Media),
        ];
        tables
            .iter()
            .find(|(table, _)| table.contains(&ext.as_str()))
            .map_or(Self::Other, |(_, category)| *category)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives `(extension, category)` for a matched pair.
///
/// Image-shaped resolved URLs take their extension from the resolved URL,
/// falling back to [`DEFAULT_IMAGE_EXTENSION`]. Everything else takes it from
/// the file name at the end of the original reference, falling back to
/// [`IGNORE_EXTENSION`].
#[must_use]
pub fn classify(reference: &AttachmentReference, resolved: &ResolvedUrl) -> (String, FileCategory) {
    let extension = if resolved.is_image_shaped {
        let path = url_path(&resolved.url);
        final_segment_extension(&path)
            .or_else(|| last_extension_in_path(&path))
            .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
    } else {
        final_segment_extension(&url_path(&reference.original_url))
            .unwrap_or_else(|| IGNORE_EXTENSION.to_string())
    };
    let category = FileCategory::from_extension(&extension);
    (extension, category)
}

/// Returns true when the attachment passes the optional allow-lists.
///
/// Extensions compare case-insensitively with or without a leading dot. A
/// `None` list places no restriction.
#[must_use]
pub fn is_allowed(
    extension: &str,
    category: FileCategory,
    allowed_extensions: Option<&[String]>,
    allowed_categories: Option<&[FileCategory]>,
) -> bool {
    let ext = extension.trim_start_matches('.');
    let extension_ok = allowed_extensions.is_none_or(|list| {
        list.iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    });
    let category_ok = allowed_categories.is_none_or(|list| list.contains(&category));
    extension_ok && category_ok
}

/// URL path with query and fragment removed.
fn url_path(raw: &str) -> String {
    if let Ok(parsed) = Url::parse(raw) {
        return parsed.path().to_string();
    }
    let without_fragment = raw.split('#').next().unwrap_or(raw);
    without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment)
        .to_string()
}

fn final_segment_extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    normalize_extension(ext)
}

fn last_extension_in_path(path: &str) -> Option<String> {
    path.split('/')
        .rev()
        .filter_map(|segment| segment.rsplit_once('.'))
        .find_map(|(stem, ext)| if stem.is_empty() { None } else { normalize_extension(ext) })
}

fn normalize_extension(ext: &str) -> Option<String> {
    let looks_like_extension = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    looks_like_extension.then(|| format!(".{}", ext.to_ascii_lowercase()))
}
