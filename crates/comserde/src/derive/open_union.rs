use std::sync::{Arc, OnceLock};

use comserde_buffers::{Reader, Writer};
use parking_lot::Mutex;

use super::wrong_type;
use crate::entry::Codec;
use crate::error::{DeserializationError, EncodeError, SchemaError};
use crate::value::{TypeName, Value};
use crate::varint::{read_varint, write_varint};

/// Union over the registered subtypes of an abstract base type.
///
/// Subtypes are registered first, then the union is frozen. The ordinal of a
/// subtype is its registration position in the frozen set. Once frozen the
/// set never changes: later registrations are rejected, and an unfrozen
/// union refuses to encode or decode.
#[derive(Debug)]
pub struct OpenUnion {
    base: TypeName,
    pending: Mutex<Vec<Arc<super::StructDef>>>,
    frozen: OnceLock<Arc<[Arc<super::StructDef>]>>,
}

impl OpenUnion {
    pub fn new(base: impl Into<TypeName>) -> Arc<Self> {
        Arc::new(Self {
            base: base.into(),
            pending: Mutex::new(Vec::new()),
            frozen: OnceLock::new(),
        })
    }

    pub fn base(&self) -> &TypeName {
        &self.base
    }

    /// Adds a subtype. Registering the same type name twice keeps the first
    /// registration.
    pub fn register(&self, member: Arc<super::StructDef>) -> Result<(), SchemaError> {
        let mut pending = self.pending.lock();
        if self.frozen.get().is_some() {
            return Err(SchemaError::UnionFrozen {
                base: self.base.clone(),
                member: member.name().clone(),
            });
        }
        if pending.iter().all(|m| m.name() != member.name()) {
            tracing::debug!(base = %self.base, member = %member.name(), "registered union member");
            pending.push(member);
        }
        Ok(())
    }

    /// Fixes the member set and returns it. Idempotent.
    pub fn freeze(&self) -> Arc<[Arc<super::StructDef>]> {
        let pending = self.pending.lock();
        self.frozen
            .get_or_init(|| {
                tracing::debug!(base = %self.base, members = pending.len(), "froze open union");
                pending.iter().cloned().collect()
            })
            .clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// The frozen member set, if the union has been frozen.
    pub fn variants(&self) -> Option<&[Arc<super::StructDef>]> {
        self.frozen.get().map(|members| &members[..])
    }

    /// Whether a value of type `name` can travel through this union. The base
    /// itself is accepted so that encoding reports it as abstract.
    pub fn admits(&self, name: &TypeName) -> bool {
        *name == self.base
            || self
                .variants()
                .is_some_and(|members| members.iter().any(|m| m.name() == name))
    }

    pub(crate) fn write(&self, codec: &Codec, writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
        let members = self
            .variants()
            .ok_or_else(|| EncodeError::UnionNotFrozen(self.base.clone()))?;
        let name = match value {
            Value::Struct(instance) => &instance.type_name,
            other => return Err(wrong_type(&self.base, other, "struct")),
        };
        if *name == self.base {
            return Err(EncodeError::AbstractType(self.base.clone()));
        }
        let ordinal = members
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| wrong_type(&self.base, value, "struct"))?;
        tracing::trace!(base = %self.base, member = %name, ordinal, "selected union member");
        write_varint(writer, ordinal as u128);
        members[ordinal].write(codec, writer, value)
    }

    pub(crate) fn read(&self, codec: &Codec, reader: &mut Reader<'_>) -> Result<Value, DeserializationError> {
        let members = self
            .variants()
            .ok_or_else(|| DeserializationError::UnionNotFrozen(self.base.clone()))?;
        let ordinal = read_varint(reader)?;
        let member = usize::try_from(ordinal)
            .ok()
            .and_then(|i| members.get(i))
            .ok_or(DeserializationError::OrdinalOutOfRange {
                ordinal,
                count: members.len(),
            })?;
        member.read(codec, reader)
    }
}
