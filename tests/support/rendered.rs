//! In-memory rendered bodies for pipeline tests.

use std::collections::HashMap;

use async_trait::async_trait;
use attachments_core::attachments::{RenderedBodyError, RenderedBodySource, SourceText};

/// Serves fixed HTML per source text, keyed like `SourceText`'s `Display`.
#[derive(Debug, Default, Clone)]
pub struct StaticBodies {
    bodies: HashMap<String, String>,
}

impl StaticBodies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the rendered HTML of `source`.
    pub fn with(mut self, source: &SourceText, html: impl Into<String>) -> Self {
        self.bodies.insert(source.to_string(), html.into());
        self
    }

    fn lookup(&self, key: String) -> Result<Option<String>, RenderedBodyError> {
        Ok(self.bodies.get(&key).cloned())
    }
}

#[async_trait]
impl RenderedBodySource for StaticBodies {
    async fn issue_comment_html(
        &self,
        comment_id: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.lookup(format!("issue_comment#{comment_id}"))
    }

    async fn review_comment_html(
        &self,
        comment_id: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.lookup(format!("review_comment#{comment_id}"))
    }

    async fn review_html(
        &self,
        _pull_number: u64,
        review_id: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.lookup(format!("review_body#{review_id}"))
    }

    async fn issue_html(&self, issue_number: u64) -> Result<Option<String>, RenderedBodyError> {
        self.lookup(format!("issue_body#{issue_number}"))
    }

    async fn pull_request_html(
        &self,
        pull_number: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.lookup(format!("pr_body#{pull_number}"))
    }
}
