//! Repository coordinates.

use std::fmt;
use std::str::FromStr;

use super::error::GithubError;

/// An `owner/name` repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    /// Parses `owner/name`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`GithubError::InvalidRepo`] unless the input has exactly two
    /// non-empty segments made of ASCII letters, digits, `-`, `_` or `.`.
    pub fn parse(input: &str) -> Result<Self, GithubError> {
        let trimmed = input.trim();
        let mut parts = trimmed.split('/');
        let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(GithubError::invalid_repo(input));
        };
        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(GithubError::invalid_repo(input));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoRef {
    type Err = GithubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
