use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{SealdropError, SealdropResult};

/// Identifier minted by the store for each uploaded share.
///
/// Always a UUID, which also keeps store object paths free of `/` and `..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> SealdropResult<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| SealdropError::InvalidLink(format!("{s:?}: {e}")))
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = SealdropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A shareable link: `{base_url}/s/{file_id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub base_url: String,
    pub file_id: FileId,
}

impl ShareLink {
    pub fn new(base_url: &str, file_id: FileId) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            file_id,
        }
    }

    /// Parse a full link or a bare file ID. Query strings and fragments are
    /// ignored.
    pub fn parse(input: &str) -> SealdropResult<Self> {
        let input = input.trim();
        let without_suffix = input
            .split(|c: char| c == '#' || c == '?')
            .next()
            .unwrap_or(input)
            .trim_end_matches('/');

        match without_suffix.rsplit_once("/s/") {
            Some((base, id)) => Ok(Self::new(base, FileId::parse(id)?)),
            None if !without_suffix.contains('/') => Ok(Self {
                base_url: String::new(),
                file_id: FileId::parse(without_suffix)?,
            }),
            None => Err(SealdropError::InvalidLink(format!(
                "{input:?}: expected <base>/s/<id> or a bare id"
            ))),
        }
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/s/{}", self.base_url, self.file_id)
    }
}
