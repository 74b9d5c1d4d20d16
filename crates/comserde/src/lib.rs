//! Compact, schema-driven binary serialization.
//!
//! A value is encoded against a [`Descriptor`] that fixes its wire layout.
//! The bytes carry no schema, no version and no type tags beyond the ordinals
//! a descriptor asks for, so the same descriptor, with the same field and
//! variant order, is required to decode them again.
//!
//! ```
//! use comserde::{dumps, loads, Descriptor, Format, Value};
//!
//! let bytes = dumps(&Value::Int(300), None).unwrap();
//! assert_eq!(bytes, [0xac, 0x02]);
//!
//! let optional = Descriptor::optional(Format::V8.into());
//! assert_eq!(dumps(&Value::None, Some(&optional)).unwrap(), [0x00]);
//! assert_eq!(loads(&[0x01, 0x07], &optional).unwrap(), Value::Int(7));
//! ```
//!
//! User types are described once with [`StructDef`], [`EnumDef`],
//! [`FlagDef`] and [`OpenUnion`], or encoded by hand through a
//! [`CustomCodec`], and made reachable by name through a [`TypeRegistry`].

mod composite;
pub mod derive;
mod descriptor;
mod entry;
mod error;
mod options;
pub mod primitive;
mod registry;
mod value;
pub mod varint;

pub use comserde_buffers::{DecodingError, Reader, StreamingReader, Writer};
pub use derive::{ConstructHook, CustomCodec, EnumDef, FieldDef, FinalizeHook, FlagDef, OpenUnion, StructBuilder, StructDef};
pub use descriptor::{get_width_for_cardinality, Descriptor, Format};
pub use entry::{dump, dumps, load, loads, Codec, Loader, Stream};
pub use error::{DeserializationError, EncodeError, SchemaError};
pub use options::{ImplicitOpaque, Options};
pub use registry::{TypeRegistry, TypeResolver};
pub use value::{Deque, EnumValue, FlagValue, StructValue, TypeName, Value, ValueMap, ValueSet};
