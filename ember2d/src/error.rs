use std::io;

use thiserror::Error;

/// Broad category of a [`MapError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The stream could not be opened, read, or written.
    Io,
    /// The bytes do not form a valid map (truncated, unterminated, bad text).
    Format,
    /// A record points at an entity that does not exist.
    Reference,
    /// The texture backend refused to create a texture.
    Texture,
}

/// Errors that can occur while loading or saving a map.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("map ended while reading {0}")]
    Truncated(&'static str),

    #[error("unterminated string while reading {0}")]
    UnterminatedString(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("{0} contains a NUL byte and cannot be written")]
    InteriorNul(&'static str),

    #[error("{section} count {count} is too large")]
    CountTooLarge { section: &'static str, count: u64 },

    #[error("{section} entry {entry} references {target} {index}, but only {available} exist")]
    IndexOutOfRange {
        section: &'static str,
        entry: usize,
        target: &'static str,
        index: u64,
        available: usize,
    },

    #[error("physics object entry {entry} targets object {object}, which already has physics")]
    DuplicatePhysicsObject { entry: usize, object: u64 },

    #[error("player references physics object {index}, but only {available} exist")]
    InvalidPlayerIndex { index: i64, available: usize },

    #[error("{section} entry {entry} references a {target} that cannot be resolved")]
    UnresolvedReference {
        section: &'static str,
        entry: usize,
        target: &'static str,
    },

    #[error("failed to load texture `{path}`: {source}")]
    Texture {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl MapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::Io(_) => ErrorKind::Io,
            MapError::Truncated(_)
            | MapError::UnterminatedString(_)
            | MapError::InvalidUtf8(_)
            | MapError::InteriorNul(_)
            | MapError::CountTooLarge { .. } => ErrorKind::Format,
            MapError::IndexOutOfRange { .. }
            | MapError::DuplicatePhysicsObject { .. }
            | MapError::InvalidPlayerIndex { .. }
            | MapError::UnresolvedReference { .. } => ErrorKind::Reference,
            MapError::Texture { .. } => ErrorKind::Texture,
        }
    }
}
