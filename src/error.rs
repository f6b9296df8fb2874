//! Error types for every stage of reading a .blend file.
//!
//! Construction errors all funnel into [`BlendError`]; query-time errors are
//! reported per call as [`QueryError`] and never invalidate the parsed file.

use std::io;
use thiserror::Error;

/// Errors produced by the byte streams backing the parser.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The path does not exist.
    #[error("file not found")]
    FileNotFound,
    /// The path names a directory instead of a regular file.
    #[error("path is a directory")]
    DirectorySpecified,
    /// The file exists but could not be opened for reading.
    #[error("access denied")]
    AccessDenied,
    /// A read, seek or align tried to consume past the end of the stream.
    #[error("attempted to read past the end of the stream")]
    ShortRead,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Errors found while decoding the file header, the block stream or the
/// embedded SDNA descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid file header")]
    InvalidFileHeader,
    /// A block carries a payload but declares a null persisted address.
    #[error("invalid block header")]
    InvalidBlockHeader,
    #[error("unexpected end of file")]
    UnexpectedEndOfFile,
    /// Bytes remained after the end sentinel block.
    #[error("file not exhausted after the end block")]
    FileNotExhausted,
    /// No block with the `DNA1` code exists.
    #[error("no SDNA block found")]
    SdnaNotFound,
    /// A section tag inside the SDNA block did not match its expected magic.
    #[error("invalid SDNA section header")]
    InvalidSdnaHeader,
    #[error("unexpected end of SDNA data")]
    UnexpectedEndOfSdna,
    /// Bytes remained after the SDNA struct section.
    #[error("SDNA block not exhausted after the struct section")]
    SdnaNotExhausted,
}

/// Errors found while building the type graph from the SDNA tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectionError {
    /// A struct's own type index is out of bounds, or its fields overrun the
    /// declared struct size.
    #[error("invalid SDNA struct at index {0}")]
    InvalidSdnaStruct(usize),
    /// A field references a type or name index out of bounds.
    #[error("invalid SDNA field (type {type_index}, name {name_index})")]
    InvalidSdnaField { type_index: usize, name_index: usize },
    /// A field-name string does not match the declarator grammar.
    #[error("invalid SDNA field name {0:?}")]
    InvalidSdnaFieldName(String),
}

/// Errors returned by path queries and typed field access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query string is empty or not a valid sequence of steps.
    #[error("invalid query expression")]
    InvalidQuery,
    /// The queried bytes do not match the size of the requested type.
    #[error("queried data does not match the requested type")]
    InvalidType,
    /// A pointer along the path was null or did not resolve to any block.
    #[error("pointer did not resolve")]
    InvalidValue,
    #[error("no field named {0:?}")]
    FieldNotFound(String),
    #[error("index {index} out of bounds for {len} bytes")]
    IndexOutOfBounds { index: usize, len: usize },
    /// A name step landed on a non-aggregate, or an index step on a type
    /// with no element type.
    #[error("step does not apply to this type")]
    IndexedInvalidType,
}

/// Anything that can go wrong while opening a .blend file.
#[derive(Debug, Error)]
pub enum BlendError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Reflection(#[from] ReflectionError),
}
