use std::path::PathBuf;
use thiserror::Error;

use crate::runtime::context::ContextError;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Invalid sidecar metadata '{path}': {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Nothing to pack")]
    Empty,
    #[error("Sprite '{key}' ({width}x{height} with padding) exceeds the maximum canvas size {max}x{max}")]
    PackingImpossible {
        key: String,
        width: u32,
        height: u32,
        max: u32,
    },
    #[error("Out of space: placed {placed} of {total} sprites within {max}x{max}")]
    OutOfSpace { placed: usize, total: usize, max: u32 },
    #[error("Malformed atlas '{atlas}': {kind}")]
    Format { atlas: String, kind: FormatError },
    #[error("Unknown sprite named '{name}' in '{atlas}'")]
    NotFound { name: String, atlas: String },
    #[error("Sprite '{name}' in '{atlas}' is {actual}, not {expected}")]
    WrongKind {
        name: String,
        atlas: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("Graphics device error: {0}")]
    Device(String),
    #[error("Encoding error: {0}")]
    Encode(String),
}

/// Structural problems in a packaged atlas or its sprite directory.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
    #[error("missing required entry '{0}'")]
    MissingEntry(&'static str),
    #[error("unrecognized entry '{0}'")]
    UnexpectedEntry(String),
    #[error("entry '{0}' appears more than once")]
    DuplicateEntry(String),
    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("length prefix is malformed or too large")]
    BadLength,
    #[error("negative sprite count {0}")]
    NegativeCount(i32),
    #[error("unknown filter mode {0}")]
    UnknownFilterMode(i32),
    #[error("{0} trailing bytes after the sprite directory")]
    TrailingBytes(usize),
    #[error("sprite '{0}' is defined more than once")]
    DuplicateSprite(String),
    #[error("sprite '{sprite}' has border {border:?} that does not fit its size {size:?}")]
    InvalidBorder {
        sprite: String,
        border: [f32; 4],
        size: [f32; 2],
    },
    #[error("sprite '{sprite}' has invalid color '{value}'")]
    InvalidColor { sprite: String, value: String },
    #[error("sheet image could not be decoded: {0}")]
    InvalidSheet(String),
}

impl FormatError {
    pub fn in_atlas(self, atlas: impl Into<String>) -> AtlasError {
        AtlasError::Format {
            atlas: atlas.into(),
            kind: self,
        }
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
