use std::path::{Component, Path};

use serde::Deserialize;

use crate::error::ConfigError;

/// Index file served for directory requests when none is configured.
pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// Settings for the static stage.
///
/// Constructed once at startup and shared read-only by every request. Missing fields take their
/// defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// URL prefix stripped from request paths before lookup. Empty matches everything.
    pub prefix: String,
    /// File served in place of a directory.
    pub index_file: String,
    /// Lifespan in seconds for `Cache-Control` on served files.
    pub cache_max_age: Option<u32>,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            index_file: DEFAULT_INDEX_FILE.to_owned(),
            cache_max_age: None,
        }
    }
}

impl StaticConfig {
    /// Check the index file name.
    ///
    /// The prefix is taken as-is. A prefix with a trailing slash only ever matches its own
    /// directory, since the remainder of any longer path would not start with `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_file.is_empty() {
            return Err(ConfigError::EmptyIndexFile);
        }
        if !is_plain_file_name(&self.index_file) {
            return Err(ConfigError::InvalidIndexFile {
                value: self.index_file.clone(),
            });
        }
        Ok(())
    }
}

/// Whether `name` is a single plain path component, so that joining it onto a directory stays
/// inside that directory.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
