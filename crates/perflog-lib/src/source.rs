//! Log input streams

use std::path::Path;

use crate::error::{AnalyzerError, Result};
use crate::models::SourceTag;

/// One named stream of log text with its source tag
#[derive(Debug, Clone, PartialEq)]
pub struct LogSource {
    pub name: String,
    pub tag: SourceTag,
    pub text: String,
}

impl LogSource {
    pub fn from_text(name: impl Into<String>, tag: SourceTag, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag,
            text: text.into(),
        }
    }

    /// Read a local log file, replacing invalid UTF-8
    ///
    /// Files whose name contains `cmd` are tagged as command streams.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let tag = if name.to_lowercase().contains("cmd") {
            SourceTag::Cmd
        } else {
            SourceTag::Web
        };

        Ok(Self {
            name,
            tag,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Override the inferred tag
    pub fn with_tag(mut self, tag: SourceTag) -> Self {
        self.tag = tag;
        self
    }
}
