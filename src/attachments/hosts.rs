//! Where attachments live on the hosting platform.

/// Default web server of the hosting platform.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Default host serving signed private images.
pub const DEFAULT_PRIVATE_IMAGE_HOST: &str = "https://private-user-images.githubusercontent.com";

/// Default legacy image host.
pub const DEFAULT_LEGACY_IMAGE_HOST: &str = "https://user-images.githubusercontent.com";

/// URL prefixes that identify attachment links in markdown and rendered HTML.
///
/// Prefixes are compared literally (scheme included, no trailing slash), so
/// an Enterprise server or a local test server can stand in for github.com.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentHosts {
    server_url: String,
    private_image_host: String,
    legacy_image_host: String,
}

impl Default for AttachmentHosts {
    fn default() -> Self {
        Self::new(
            DEFAULT_SERVER_URL,
            DEFAULT_PRIVATE_IMAGE_HOST,
            DEFAULT_LEGACY_IMAGE_HOST,
        )
    }
}

impl AttachmentHosts {
    /// Creates a host set; trailing slashes are removed.
    #[must_use]
    pub fn new(
        server_url: impl Into<String>,
        private_image_host: impl Into<String>,
        legacy_image_host: impl Into<String>,
    ) -> Self {
        Self {
            server_url: trim_slash(server_url.into()),
            private_image_host: trim_slash(private_image_host.into()),
            legacy_image_host: trim_slash(legacy_image_host.into()),
        }
    }

    /// Default image hosts with a different web server (GitHub Enterprise).
    #[must_use]
    pub fn for_server(server_url: impl Into<String>) -> Self {
        Self {
            server_url: trim_slash(server_url.into()),
            ..Self::default()
        }
    }

    /// Web server prefix, e.g. `https://github.com`.
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Signed private image host prefix.
    #[must_use]
    pub fn private_image_host(&self) -> &str {
        &self.private_image_host
    }

    /// Legacy image host prefix.
    #[must_use]
    pub fn legacy_image_host(&self) -> &str {
        &self.legacy_image_host
    }

    /// Prefix shared by every uploaded-file link in markdown.
    #[must_use]
    pub fn attachments_prefix(&self) -> String {
        format!("{}/user-attachments/", self.server_url)
    }

    /// Returns true when `url` is served by one of the image hosts.
    #[must_use]
    pub fn is_image_host(&self, url: &str) -> bool {
        has_prefix_segment(url, &self.private_image_host)
            || has_prefix_segment(url, &self.legacy_image_host)
    }
}

fn trim_slash(mut value: String) -> String {
    while value.ends_with('/') {
        value.pop();
    }
    value
}

fn has_prefix_segment(url: &str, prefix: &str) -> bool {
    url.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
