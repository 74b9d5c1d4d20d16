use std::fmt;

use comserde_buffers::{Reader, Writer};

use crate::entry::Codec;
use crate::error::{DeserializationError, EncodeError};
use crate::value::{TypeName, Value};

/// Hand-written wire behavior for one type.
///
/// Used through [`Descriptor::Custom`](crate::Descriptor::Custom) or by
/// registering it with a [`TypeRegistry`](crate::TypeRegistry), which makes
/// the type reachable by name, as a dynamic object and through descriptor
/// inference. Nested values go through [`Codec::encode_into`] and
/// [`Codec::read_value`] so they share the caller's registry and options.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use comserde::{
///     Codec, CustomCodec, DeserializationError, Descriptor, EncodeError, Reader, StructValue, TypeName,
///     Value, Writer,
/// };
///
/// /// A millisecond timestamp stored as a fixed `u64`.
/// struct Instant(TypeName);
///
/// impl CustomCodec for Instant {
///     fn type_name(&self) -> &TypeName {
///         &self.0
///     }
///
///     fn write(&self, _: &Codec, writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
///         let millis = value
///             .as_struct()
///             .and_then(|v| v.get("millis"))
///             .and_then(Value::as_int)
///             .and_then(|ms| u64::try_from(ms).ok())
///             .ok_or(EncodeError::TypeMismatch { expected: "time.Instant", found: value.kind() })?;
///         writer.u64(millis);
///         Ok(())
///     }
///
///     fn read(&self, _: &Codec, reader: &mut Reader<'_>) -> Result<Value, DeserializationError> {
///         let millis = reader.u64()?;
///         Ok(StructValue::new(self.0.clone()).with("millis", millis).into())
///     }
/// }
///
/// let descriptor = Descriptor::Custom(Arc::new(Instant("time.Instant".into())));
/// let value = Value::from(StructValue::new("time.Instant").with("millis", 1_000));
/// let bytes = Codec::default().encode(&value, &descriptor).unwrap();
/// assert_eq!(bytes, 1_000u64.to_le_bytes());
/// ```
pub trait CustomCodec: Send + Sync {
    /// The concrete type this codec encodes.
    fn type_name(&self) -> &TypeName;

    fn write(&self, codec: &Codec, writer: &mut Writer, value: &Value) -> Result<(), EncodeError>;

    fn read(&self, codec: &Codec, reader: &mut Reader<'_>) -> Result<Value, DeserializationError>;

    /// Shape test used when picking a union variant. Defaults to an exact
    /// type-name match.
    fn matches(&self, value: &Value) -> bool {
        value.type_name() == Some(self.type_name())
    }
}

impl fmt::Debug for dyn CustomCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomCodec").field(self.type_name()).finish()
    }
}
