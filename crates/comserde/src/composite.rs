//! The recursive dispatcher: one exhaustive match over [`Descriptor`] for
//! encoding, one for decoding, and the shape test used to pick union
//! variants.

use comserde_buffers::{Reader, Writer};

use crate::descriptor::{Descriptor, Format};
use crate::entry::Codec;
use crate::error::{DeserializationError, EncodeError};
use crate::options::ImplicitOpaque;
use crate::primitive;
use crate::value::{Deque, TypeName, Value, ValueMap, ValueSet};
use crate::varint::{read_varint, write_varint};

fn mismatch(expected: &'static str, found: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

fn read_ordinal(reader: &mut Reader<'_>, count: usize) -> Result<usize, DeserializationError> {
    let ordinal = read_varint(reader)?;
    usize::try_from(ordinal)
        .ok()
        .filter(|&i| i < count)
        .ok_or(DeserializationError::OrdinalOutOfRange { ordinal, count })
}

fn read_len(reader: &mut Reader<'_>) -> Result<usize, DeserializationError> {
    usize::try_from(read_varint(reader)?).map_err(|_| DeserializationError::IntegerOutOfRange)
}

impl Codec {
    pub(crate) fn write(&self, writer: &mut Writer, value: &Value, descriptor: &Descriptor) -> Result<(), EncodeError> {
        match descriptor {
            Descriptor::Primitive(format) => primitive::write(writer, value, *format),
            Descriptor::List(elem) | Descriptor::Set(elem) | Descriptor::VarTuple(elem) => {
                let items = value.elements().ok_or_else(|| mismatch(descriptor.label(), value))?;
                self.write_seq(writer, items, elem)
            }
            Descriptor::Deque(elem) => {
                let items = value.elements().ok_or_else(|| mismatch("deque", value))?;
                let max_len = match value {
                    Value::Deque(deque) => deque.max_len(),
                    _ => None,
                };
                match max_len {
                    None => write_varint(writer, 0),
                    Some(max_len) => {
                        write_varint(writer, 1);
                        write_varint(writer, max_len as u128);
                    }
                }
                self.write_seq(writer, items, elem)
            }
            Descriptor::Tuple(elems) => {
                let items = match value {
                    Value::Tuple(items) | Value::List(items) => items,
                    other => return Err(mismatch("tuple", other)),
                };
                if items.len() != elems.len() {
                    return Err(EncodeError::ArityMismatch {
                        expected: elems.len(),
                        found: items.len(),
                    });
                }
                items
                    .iter()
                    .zip(elems)
                    .try_for_each(|(item, elem)| self.write(writer, item, elem))
            }
            Descriptor::Map(key, val) => {
                let Value::Map(map) = value else {
                    return Err(mismatch("map", value));
                };
                write_varint(writer, map.len() as u128);
                for (k, v) in map.iter() {
                    self.write(writer, k, key)?;
                    self.write(writer, v, val)?;
                }
                Ok(())
            }
            Descriptor::Optional(inner) => {
                if value.is_none() {
                    write_varint(writer, 0);
                    Ok(())
                } else {
                    write_varint(writer, 1);
                    self.write(writer, value, inner)
                }
            }
            Descriptor::Union(variants) => {
                let ordinal = self
                    .select_variant(value, variants)
                    .ok_or(EncodeError::NoMatchingVariant { count: variants.len() })?;
                tracing::trace!(ordinal, count = variants.len(), kind = value.kind(), "selected union variant");
                write_varint(writer, ordinal as u128);
                self.write(writer, value, &variants[ordinal])
            }
            Descriptor::Literal(constants) => {
                let index = constants
                    .iter()
                    .position(|c| c == value)
                    .ok_or(EncodeError::UndeclaredLiteral { count: constants.len() })?;
                if constants.len() > 1 {
                    tracing::trace!(index, count = constants.len(), "selected literal");
                    write_varint(writer, index as u128);
                }
                Ok(())
            }
            Descriptor::Annotated { .. } => self.write(writer, value, descriptor.wire()),
            Descriptor::Struct(def) => def.write(self, writer, value),
            Descriptor::Enum(def) => def.write(writer, value),
            Descriptor::Flag(def) => def.write(writer, value),
            Descriptor::OpenUnion(union) => union.write(self, writer, value),
            Descriptor::Custom(custom) => custom.write(self, writer, value),
            Descriptor::Ref(name) => {
                let resolved = self.resolve_for_encode(name)?;
                self.write(writer, value, &resolved)
            }
            Descriptor::Object => {
                let name = value.type_name().ok_or(EncodeError::NotAnObject(value.kind()))?;
                let resolved = self.resolve_for_encode(name)?;
                primitive::write_str(writer, &name.namespace);
                primitive::write_str(writer, &name.qualname);
                self.write(writer, value, &resolved)
            }
            Descriptor::Opaque => primitive::write_opaque(writer, value),
        }
    }

    fn write_seq(&self, writer: &mut Writer, items: Vec<&Value>, elem: &Descriptor) -> Result<(), EncodeError> {
        write_varint(writer, items.len() as u128);
        items.into_iter().try_for_each(|item| self.write(writer, item, elem))
    }

    fn resolve_for_encode(&self, name: &TypeName) -> Result<Descriptor, EncodeError> {
        self.resolver
            .resolve(name)
            .ok_or_else(|| EncodeError::UnresolvedType(name.clone()))
    }

    pub(crate) fn read(&self, reader: &mut Reader<'_>, descriptor: &Descriptor) -> Result<Value, DeserializationError> {
        match descriptor {
            Descriptor::Primitive(format) => primitive::read(reader, *format),
            Descriptor::List(elem) => Ok(Value::List(self.read_seq(reader, elem)?)),
            Descriptor::VarTuple(elem) => Ok(Value::Tuple(self.read_seq(reader, elem)?)),
            Descriptor::Set(elem) => Ok(Value::Set(self.read_seq(reader, elem)?.into_iter().collect::<ValueSet>())),
            Descriptor::Deque(elem) => {
                let max_len = match read_ordinal(reader, 2)? {
                    0 => None,
                    _ => Some(read_len(reader)?),
                };
                let items = self.read_seq(reader, elem)?;
                Ok(Value::Deque(Deque::bounded(max_len, items)))
            }
            Descriptor::Tuple(elems) => elems
                .iter()
                .map(|elem| self.read(reader, elem))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple),
            Descriptor::Map(key, val) => {
                let len = read_len(reader)?;
                let mut map = ValueMap::new();
                for _ in 0..len {
                    let k = self.read(reader, key)?;
                    let v = self.read(reader, val)?;
                    map.insert(k, v);
                }
                Ok(Value::Map(map))
            }
            Descriptor::Optional(inner) => match read_ordinal(reader, 2)? {
                0 => Ok(Value::None),
                _ => self.read(reader, inner),
            },
            Descriptor::Union(variants) => {
                let ordinal = read_ordinal(reader, variants.len())?;
                self.read(reader, &variants[ordinal])
            }
            Descriptor::Literal(constants) => {
                let index = match constants.len() {
                    1 => 0,
                    count => read_ordinal(reader, count)?,
                };
                Ok(constants[index].clone())
            }
            Descriptor::Annotated { .. } => self.read(reader, descriptor.wire()),
            Descriptor::Struct(def) => def.read(self, reader),
            Descriptor::Enum(def) => def.read(reader),
            Descriptor::Flag(def) => def.read(reader),
            Descriptor::OpenUnion(union) => union.read(self, reader),
            Descriptor::Custom(custom) => custom.read(self, reader),
            Descriptor::Ref(name) => {
                let resolved = self
                    .resolver
                    .resolve(name)
                    .ok_or_else(|| DeserializationError::UnresolvedType(name.clone()))?;
                self.read(reader, &resolved)
            }
            Descriptor::Object => {
                let namespace = primitive::read_str(reader)?;
                let qualname = primitive::read_str(reader)?;
                let name = TypeName { namespace, qualname };
                match self.resolver.resolve(&name) {
                    None => Err(DeserializationError::UnresolvedType(name)),
                    Some(
                        resolved @ (Descriptor::Struct(_)
                        | Descriptor::Enum(_)
                        | Descriptor::Flag(_)
                        | Descriptor::OpenUnion(_)
                        | Descriptor::Custom(_)),
                    ) => self.read(reader, &resolved),
                    Some(_) => Err(DeserializationError::NotDecodable(name)),
                }
            }
            Descriptor::Opaque => primitive::read_opaque(reader),
        }
    }

    fn read_seq(&self, reader: &mut Reader<'_>, elem: &Descriptor) -> Result<Vec<Value>, DeserializationError> {
        let len = read_len(reader)?;
        let mut items = Vec::with_capacity(len.min(self.options.max_prealloc));
        for _ in 0..len {
            items.push(self.read(reader, elem)?);
        }
        Ok(items)
    }

    /// Shallow shape test: does `value` have the kind `descriptor` encodes?
    ///
    /// Containers are not inspected element by element, integers are not
    /// range-checked, and registered types match by exact type name.
    pub fn matches(&self, value: &Value, descriptor: &Descriptor) -> bool {
        match (descriptor, value) {
            (Descriptor::Opaque, _) => true,
            (Descriptor::Annotated { default, .. }, _) => self.matches(value, default),
            (Descriptor::Primitive(format), _) => format.accepts(value),
            (Descriptor::Optional(_), Value::None) => true,
            (Descriptor::Optional(inner), _) => self.matches(value, inner),
            (Descriptor::Union(variants), _) => self.select_variant(value, variants).is_some(),
            (Descriptor::Literal(constants), _) => constants.contains(value),
            (Descriptor::List(_), Value::List(_))
            | (Descriptor::Set(_), Value::Set(_))
            | (Descriptor::Deque(_), Value::Deque(_))
            | (Descriptor::VarTuple(_), Value::Tuple(_))
            | (Descriptor::Map(..), Value::Map(_)) => true,
            (Descriptor::Tuple(elems), Value::Tuple(items)) => elems.len() == items.len(),
            (Descriptor::Struct(def), Value::Struct(v)) => *def.name() == v.type_name,
            (Descriptor::Enum(def), Value::Enum(v)) => *def.name() == v.type_name,
            (Descriptor::Flag(def), Value::Flag(v)) => *def.name() == v.type_name,
            (Descriptor::OpenUnion(union), Value::Struct(v)) => union.admits(&v.type_name),
            (Descriptor::Custom(custom), _) => custom.matches(value),
            (Descriptor::Ref(name), _) => self
                .resolver
                .resolve(name)
                .is_some_and(|resolved| self.matches(value, &resolved)),
            (Descriptor::Object, _) => value
                .type_name()
                .is_some_and(|name| self.resolver.resolve(name).is_some()),
            _ => false,
        }
    }

    /// Index of the first variant `value` matches, in declaration order.
    pub fn select_variant(&self, value: &Value, variants: &[Descriptor]) -> Option<usize> {
        variants.iter().position(|variant| self.matches(value, variant))
    }

    /// The descriptor a value is encoded with when none is given.
    pub fn descriptor_for(&self, value: &Value) -> Result<Descriptor, EncodeError> {
        let format = match value {
            Value::None => Format::Void,
            Value::Bool(_) => Format::Bool,
            Value::Int(_) => Format::V8,
            Value::Float(_) => Format::F32,
            Value::Complex { .. } => Format::Complex,
            Value::Bytes(_) => Format::Bytes,
            Value::Str(_) => Format::Utf8,
            Value::Struct(_) | Value::Enum(_) | Value::Flag(_) => {
                let name = value.type_name().ok_or(EncodeError::NotAnObject(value.kind()))?;
                return self.resolve_for_encode(name);
            }
            Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::Map(_) | Value::Deque(_) => {
                return match self.options.implicit_opaque {
                    ImplicitOpaque::Deny => Err(EncodeError::ImplicitOpaque(value.kind())),
                    ImplicitOpaque::Allow => Ok(Descriptor::Opaque),
                    ImplicitOpaque::Warn => {
                        tracing::warn!(kind = value.kind(), "no descriptor given, encoding opaquely");
                        Ok(Descriptor::Opaque)
                    }
                };
            }
        };
        Ok(Descriptor::Primitive(format))
    }
}
