//! Error taxonomy.
//!
//! - [`SchemaError`]: a descriptor or type registration is invalid. Raised
//!   once, when the definition is built.
//! - [`EncodeError`]: the caller handed the encoder a value its descriptor
//!   cannot represent. A programming error, never a data error.
//! - [`DeserializationError`]: the input bytes are corrupt or were produced
//!   under a different descriptor. [`DeserializationError::Eof`] refines it for
//!   the case where nothing at all was left to read.

use std::io;

use comserde_buffers::DecodingError;
use thiserror::Error;

use crate::value::TypeName;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown wire format: {0:?}")]
    UnknownFormat(String),
    #[error("field `{field}` of {type_name} is not serialized and has no default")]
    SkippedFieldWithoutDefault { type_name: TypeName, field: String },
    #[error("field `{field}` declared twice on {type_name}")]
    DuplicateField { type_name: TypeName, field: String },
    #[error("variant `{variant}` declared twice on {type_name}")]
    DuplicateVariant { type_name: TypeName, variant: String },
    #[error("{type_name} declares {count} flags, at most 127 fit in a bitset")]
    TooManyFlags { type_name: TypeName, count: usize },
    #[error("open union {base} is frozen, {member} can no longer be registered")]
    UnionFrozen { base: TypeName, member: TypeName },
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("expected a value of kind {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("integer {value} is out of range for format {format}")]
    IntegerOutOfRange { value: i128, format: &'static str },
    #[error("nt-bytes value contains a 0x00 byte")]
    EmbeddedTerminator,
    #[error("expected a tuple of {expected} element(s), found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("value matches none of the {count} declared union variants")]
    NoMatchingVariant { count: usize },
    #[error("value is not one of the {count} declared literal constants")]
    UndeclaredLiteral { count: usize },
    #[error("value of {found} cannot be encoded as {expected}")]
    WrongType { expected: TypeName, found: TypeName },
    #[error("{type_name} has no variant named `{variant}`")]
    UnknownVariant { type_name: TypeName, variant: String },
    #[error("field `{field}` of {type_name} is missing and has no default")]
    MissingField { type_name: TypeName, field: String },
    #[error("{0} is abstract and cannot be encoded without a concrete subtype")]
    AbstractType(TypeName),
    #[error("open union {0} must be frozen before use")]
    UnionNotFrozen(TypeName),
    #[error("no descriptor registered for {0}")]
    UnresolvedType(TypeName),
    #[error("value of kind {0} has no concrete type to encode as an object")]
    NotAnObject(&'static str),
    #[error("value of kind {0} has no natural descriptor and implicit opaque encoding is denied")]
    ImplicitOpaque(&'static str),
    #[error("value cannot be represented as JSON: {0}")]
    NotJson(String),
    #[error("opaque serializer failed: {0}")]
    Opaque(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("no more values to decode")]
    Eof(#[source] Box<DeserializationError>),
    #[error("malformed input")]
    Decoding(#[from] DecodingError),
    #[error("invalid {encoding} text")]
    InvalidText { encoding: &'static str },
    #[error("decoded integer does not fit the value model")]
    IntegerOutOfRange,
    #[error("ordinal {ordinal} is out of range for {count} variant(s)")]
    OrdinalOutOfRange { ordinal: u128, count: usize },
    #[error("ordinal {ordinal} is not a variant of {type_name}")]
    InvalidEnumOrdinal { type_name: TypeName, ordinal: u128 },
    #[error("bits {bits:#x} are not declared flags of {type_name}")]
    InvalidFlagBits { type_name: TypeName, bits: u128 },
    #[error("open union {0} must be frozen before use")]
    UnionNotFrozen(TypeName),
    #[error("no type registered under {0}")]
    UnresolvedType(TypeName),
    #[error("{0} does not resolve to a decodable type")]
    NotDecodable(TypeName),
    #[error("constructing {type_name} failed: {message}")]
    Construction { type_name: TypeName, message: String },
    #[error("descriptor consumed no input, {remaining} byte(s) left unread")]
    NoProgress { remaining: usize },
    #[error("invalid json payload")]
    Json(#[source] serde_json::Error),
    #[error("invalid opaque payload: {0}")]
    Opaque(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DeserializationError {
    /// Returns `true` when the source was already exhausted, i.e. a stream of
    /// values ended cleanly rather than being cut off.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof(_))
    }
}
