use std::io;
use tantivy::{directory::error::OpenDirectoryError, query::QueryParserError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad field names, malformed directives, malformed script lines and
    /// similar input problems. Fatal to the whole run.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("query parse error: {0}")]
    Parse(#[from] QueryParserError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("failed to open index directory: {0}")]
    OpenDirectory(#[from] OpenDirectoryError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),
}

impl Error {
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// True for errors caused by the caller's input rather than the index or
    /// the filesystem.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
