//! Encoding descriptors.
//!
//! A [`Descriptor`] is a closed, immutable description of how one logical type
//! is laid out on the wire. Descriptors are built once (typically next to the
//! type they describe) and shared by every encode/decode call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::derive::{CustomCodec, EnumDef, FlagDef, OpenUnion, StructDef};
use crate::error::SchemaError;
use crate::value::{TypeName, Value};

/// Leaf wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    /// Unsigned varint with 0/1/2/3 fixed low bytes.
    V8,
    V16,
    V32,
    V64,
    /// Signed (sign-and-magnitude folded) varint with 0/1/2/3 fixed low bytes.
    W8,
    W16,
    W32,
    W64,
    F32,
    F64,
    /// Two consecutive `f32`s, real part first.
    Complex,
    /// Varint length followed by raw bytes.
    Bytes,
    /// Raw bytes followed by a single `0x00`.
    NtBytes,
    Utf8,
    Utf16,
    /// JSON text in `utf-8` format.
    Json,
    /// Zero bytes.
    Void,
}

impl Format {
    pub const ALL: [Format; 26] = [
        Format::Bool,
        Format::U8,
        Format::U16,
        Format::U32,
        Format::U64,
        Format::I8,
        Format::I16,
        Format::I32,
        Format::I64,
        Format::V8,
        Format::V16,
        Format::V32,
        Format::V64,
        Format::W8,
        Format::W16,
        Format::W32,
        Format::W64,
        Format::F32,
        Format::F64,
        Format::Complex,
        Format::Bytes,
        Format::NtBytes,
        Format::Utf8,
        Format::Utf16,
        Format::Json,
        Format::Void,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Bool => "bool",
            Format::U8 => "u8",
            Format::U16 => "u16",
            Format::U32 => "u32",
            Format::U64 => "u64",
            Format::I8 => "i8",
            Format::I16 => "i16",
            Format::I32 => "i32",
            Format::I64 => "i64",
            Format::V8 => "v8",
            Format::V16 => "v16",
            Format::V32 => "v32",
            Format::V64 => "v64",
            Format::W8 => "w8",
            Format::W16 => "w16",
            Format::W32 => "w32",
            Format::W64 => "w64",
            Format::F32 => "f32",
            Format::F64 => "f64",
            Format::Complex => "complex",
            Format::Bytes => "bytes",
            Format::NtBytes => "nt-bytes",
            Format::Utf8 => "utf-8",
            Format::Utf16 => "utf-16",
            Format::Json => "json",
            Format::Void => "void",
        }
    }

    /// Number of verbatim low bytes in front of the varint remainder, for the
    /// `v*` and `w*` families.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Format::V8 | Format::W8 => Some(0),
            Format::V16 | Format::W16 => Some(1),
            Format::V32 | Format::W32 => Some(2),
            Format::V64 | Format::W64 => Some(3),
            _ => None,
        }
    }

    /// Kind check used when selecting a union variant. Shallow: integers are
    /// not range-checked and JSON containers are not inspected.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Format::Bool => matches!(value, Value::Bool(_)),
            Format::U8
            | Format::U16
            | Format::U32
            | Format::U64
            | Format::I8
            | Format::I16
            | Format::I32
            | Format::I64
            | Format::V8
            | Format::V16
            | Format::V32
            | Format::V64
            | Format::W8
            | Format::W16
            | Format::W32
            | Format::W64 => matches!(value, Value::Int(_)),
            Format::F32 | Format::F64 => matches!(value, Value::Float(_)),
            Format::Complex => matches!(value, Value::Complex { .. }),
            Format::Bytes | Format::NtBytes => matches!(value, Value::Bytes(_)),
            Format::Utf8 | Format::Utf16 => matches!(value, Value::Str(_)),
            Format::Json => matches!(
                value,
                Value::None
                    | Value::Bool(_)
                    | Value::Int(_)
                    | Value::Float(_)
                    | Value::Str(_)
                    | Value::List(_)
                    | Value::Map(_)
            ),
            Format::Void => value.is_none(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| SchemaError::UnknownFormat(s.to_owned()))
    }
}

/// Smallest unsigned format able to hold every ordinal in `[0, n)`.
///
/// Cardinalities beyond `2^64` fall back to `v64`.
pub fn get_width_for_cardinality(n: u128) -> Format {
    if n <= 1 << 8 {
        Format::U8
    } else if n <= 1 << 16 {
        Format::U16
    } else if n <= 1 << 32 {
        Format::U32
    } else if n <= 1 << 64 {
        Format::U64
    } else {
        Format::V64
    }
}

/// How one logical type is encoded.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Primitive(Format),
    /// Varint count, then each element.
    List(Box<Descriptor>),
    /// Same wire layout as `List`; decodes to a set.
    Set(Box<Descriptor>),
    /// Optional max length, then the contents as a list.
    Deque(Box<Descriptor>),
    /// Fixed-arity heterogeneous tuple: each element in turn, no count.
    Tuple(Vec<Descriptor>),
    /// Homogeneous tuple of any length, laid out like `List`.
    VarTuple(Box<Descriptor>),
    /// Varint count, then each key followed by its value.
    Map(Box<Descriptor>, Box<Descriptor>),
    /// Two-variant union with the absent value first.
    Optional(Box<Descriptor>),
    /// Ordered variants; the first that matches a value is chosen.
    Union(Vec<Descriptor>),
    /// Closed, ordered set of constants.
    Literal(Vec<Value>),
    /// A logical type paired with an optional wire override. The override,
    /// when present, replaces the default entirely.
    Annotated {
        default: Box<Descriptor>,
        overrides: Option<Box<Descriptor>>,
    },
    Struct(Arc<StructDef>),
    Enum(Arc<EnumDef>),
    Flag(Arc<FlagDef>),
    OpenUnion(Arc<OpenUnion>),
    /// Hand-written encoding.
    Custom(Arc<dyn CustomCodec>),
    /// Named reference, resolved through the codec's type resolver at use.
    Ref(TypeName),
    /// Concrete type name on the wire, followed by that type's encoding.
    Object,
    /// Non-portable fallback through a general-purpose serializer.
    Opaque,
}

impl Descriptor {
    pub fn list(elem: Descriptor) -> Self {
        Descriptor::List(Box::new(elem))
    }

    pub fn set(elem: Descriptor) -> Self {
        Descriptor::Set(Box::new(elem))
    }

    pub fn deque(elem: Descriptor) -> Self {
        Descriptor::Deque(Box::new(elem))
    }

    pub fn var_tuple(elem: Descriptor) -> Self {
        Descriptor::VarTuple(Box::new(elem))
    }

    pub fn map(key: Descriptor, value: Descriptor) -> Self {
        Descriptor::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(inner: Descriptor) -> Self {
        Descriptor::Optional(Box::new(inner))
    }

    pub fn annotated(default: Descriptor, overrides: Option<Descriptor>) -> Self {
        Descriptor::Annotated {
            default: Box::new(default),
            overrides: overrides.map(Box::new),
        }
    }

    pub fn named(type_name: impl Into<TypeName>) -> Self {
        Descriptor::Ref(type_name.into())
    }

    /// Parses a format name such as `"w32"` or `"nt-bytes"`. `"pickle"`
    /// and `"opaque"` name the opaque fallback.
    pub fn format(name: &str) -> Result<Self, SchemaError> {
        match name {
            "pickle" | "opaque" => Ok(Descriptor::Opaque),
            _ => name.parse().map(Descriptor::Primitive),
        }
    }

    /// The descriptor actually used on the wire: annotations are peeled,
    /// taking the override whenever one is present.
    pub fn wire(&self) -> &Descriptor {
        match self {
            Descriptor::Annotated {
                overrides: Some(overrides),
                ..
            } => overrides.wire(),
            Descriptor::Annotated { default, .. } => default.wire(),
            other => other,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Descriptor::Primitive(format) => format.name(),
            Descriptor::List(_) => "list",
            Descriptor::Set(_) => "set",
            Descriptor::Deque(_) => "deque",
            Descriptor::Tuple(_) => "tuple",
            Descriptor::VarTuple(_) => "var-tuple",
            Descriptor::Map(..) => "map",
            Descriptor::Optional(_) => "optional",
            Descriptor::Union(_) => "union",
            Descriptor::Literal(_) => "literal",
            Descriptor::Annotated { .. } => "annotated",
            Descriptor::Struct(_) => "struct",
            Descriptor::Enum(_) => "enum",
            Descriptor::Flag(_) => "flag",
            Descriptor::OpenUnion(_) => "open-union",
            Descriptor::Custom(_) => "custom",
            Descriptor::Ref(_) => "ref",
            Descriptor::Object => "object",
            Descriptor::Opaque => "opaque",
        }
    }
}

impl From<Format> for Descriptor {
    fn from(format: Format) -> Self {
        Descriptor::Primitive(format)
    }
}

impl From<Arc<StructDef>> for Descriptor {
    fn from(def: Arc<StructDef>) -> Self {
        Descriptor::Struct(def)
    }
}

impl From<Arc<EnumDef>> for Descriptor {
    fn from(def: Arc<EnumDef>) -> Self {
        Descriptor::Enum(def)
    }
}

impl From<Arc<FlagDef>> for Descriptor {
    fn from(def: Arc<FlagDef>) -> Self {
        Descriptor::Flag(def)
    }
}

impl From<Arc<dyn CustomCodec>> for Descriptor {
    fn from(codec: Arc<dyn CustomCodec>) -> Self {
        Descriptor::Custom(codec)
    }
}

impl From<Arc<OpenUnion>> for Descriptor {
    fn from(def: Arc<OpenUnion>) -> Self {
        Descriptor::OpenUnion(def)
    }
}
