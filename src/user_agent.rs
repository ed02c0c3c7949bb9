//! Shared User-Agent string for every HTTP request the crate makes.
//!
//! GitHub rejects API requests without a User-Agent, and CDN traffic should be
//! attributable to the tool as well.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/attachments";

/// Default User-Agent for API and download requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("attachments/{version} (issue-attachment-fetcher; +{PROJECT_UA_URL})")
}
