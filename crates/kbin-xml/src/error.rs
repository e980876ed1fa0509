//! Error types for kbin encoding and decoding.

use std::fmt;

use thiserror::Error;

use crate::TextEncoding;

const CONVERT_ILLEGAL_HELP: &str = "enable convert_illegal in DecodeOptions";

/// How a type was referenced when the lookup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKey {
    Id(u8),
    Name(String),
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {}", id),
            Self::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// Errors that can occur when encoding or decoding kbin documents.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffer error (out of bounds reads, bad widths).
    #[error("{0}")]
    Common(#[from] kbin_common::Error),

    /// Bad signature, compression marker or encoding check byte.
    #[error("corrupt kbin header: {0}")]
    HeaderCorrupt(String),

    /// A type id or name that is not in the type table.
    #[error("unknown node type {0}")]
    UnknownType(TypeKey),

    /// Token count does not fit the declared type or `__count`.
    #[error("node \"{name}\" has {actual} values, expected {expected}")]
    ArrayLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A node name contains a character outside the sixbit alphabet.
    #[error("name \"{name}\" contains {symbol:?}, which cannot be sixbit packed")]
    InvalidSymbol { name: String, symbol: char },

    /// A decoded name is not usable as an element name.
    #[error("could not create node with name \"{name}\"; to rename it to \"{renamed}\", {}", CONVERT_ILLEGAL_HELP)]
    InvalidNodeName { name: String, renamed: String },

    /// String bytes are not valid in the document encoding.
    #[error("could not decode string as {encoding}; to force a UTF-8 decode, {} (raw bytes: {bytes:02x?})", CONVERT_ILLEGAL_HELP)]
    StringDecodeFailure {
        encoding: TextEncoding,
        bytes: Vec<u8>,
    },

    /// Text cannot be represented in the document encoding.
    #[error("could not encode {value:?} as {encoding}")]
    StringEncodeFailure {
        encoding: TextEncoding,
        value: String,
    },

    /// A text token that does not parse as the declared type.
    #[error("invalid {type_name} value {value:?}")]
    InvalidValue { type_name: String, value: String },

    /// A name is too long (or empty) for the name codec in use.
    #[error("name \"{name}\" is {len} bytes, allowed range is {min}..={max}")]
    NameLength {
        name: String,
        len: usize,
        min: usize,
        max: usize,
    },

    /// A `nodeEnd` record with no open element.
    #[error("unmatched nodeEnd at node stream offset {offset}")]
    UnbalancedNodeEnd { offset: usize },

    /// The node stream produced no element.
    #[error("kbin document contains no root element")]
    EmptyDocument,

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    Xml(String),
}

/// Result type for kbin operations.
pub type Result<T> = std::result::Result<T, Error>;
