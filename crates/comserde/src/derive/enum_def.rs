use std::sync::Arc;

use comserde_buffers::{Reader, Writer};

use super::{check_variants, wrong_type};
use crate::descriptor::{get_width_for_cardinality, Format};
use crate::error::{DeserializationError, EncodeError, SchemaError};
use crate::primitive;
use crate::value::{EnumValue, TypeName, Value};

/// Ordered variant list of an enum type. A variant's position is its wire
/// ordinal, written at the smallest width that holds every ordinal.
#[derive(Debug)]
pub struct EnumDef {
    name: TypeName,
    variants: Vec<String>,
    width: Format,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<TypeName>, variants: I) -> Result<Arc<Self>, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        check_variants(&name, &variants)?;
        let width = get_width_for_cardinality(variants.len() as u128);
        tracing::debug!(type_name = %name, variants = variants.len(), %width, "registered enum");
        Ok(Arc::new(Self { name, variants, width }))
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Format the ordinal is written in.
    pub fn width(&self) -> Format {
        self.width
    }

    pub fn ordinal(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == variant)
    }

    /// The variant named `variant`, as a value.
    pub fn value(&self, variant: &str) -> Option<EnumValue> {
        self.ordinal(variant)
            .map(|_| EnumValue::new(self.name.clone(), variant))
    }

    pub(crate) fn write(&self, writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
        let variant = match value {
            Value::Enum(e) if e.type_name == self.name => &e.variant,
            other => return Err(wrong_type(&self.name, other, "enum")),
        };
        let ordinal = self.ordinal(variant).ok_or_else(|| EncodeError::UnknownVariant {
            type_name: self.name.clone(),
            variant: variant.clone(),
        })?;
        primitive::write_uint(writer, ordinal as u128, self.width)
    }

    pub(crate) fn read(&self, reader: &mut Reader<'_>) -> Result<Value, DeserializationError> {
        let ordinal = primitive::read_uint(reader, self.width)?;
        let variant = usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.variants.get(i))
            .ok_or_else(|| DeserializationError::InvalidEnumOrdinal {
                type_name: self.name.clone(),
                ordinal,
            })?;
        Ok(Value::Enum(EnumValue::new(self.name.clone(), variant.clone())))
    }
}
