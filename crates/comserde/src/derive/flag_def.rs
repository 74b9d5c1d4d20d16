use std::sync::Arc;

use comserde_buffers::{Reader, Writer};

use super::{check_variants, wrong_type};
use crate::descriptor::{get_width_for_cardinality, Format};
use crate::error::{DeserializationError, EncodeError, SchemaError};
use crate::primitive;
use crate::value::{FlagValue, TypeName, Value};

/// Bitsets wider than this do not fit the 128-bit integer model.
const MAX_FLAGS: usize = 127;

/// Ordered flag list of a bitset type. Flag `i` has weight `2^i`; the
/// combined bits are written at the width that holds `2^len` values.
#[derive(Debug)]
pub struct FlagDef {
    name: TypeName,
    variants: Vec<String>,
    width: Format,
}

impl FlagDef {
    pub fn new<I, S>(name: impl Into<TypeName>, variants: I) -> Result<Arc<Self>, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        if variants.len() > MAX_FLAGS {
            return Err(SchemaError::TooManyFlags {
                type_name: name,
                count: variants.len(),
            });
        }
        check_variants(&name, &variants)?;
        let width = get_width_for_cardinality(1u128 << variants.len());
        tracing::debug!(type_name = %name, flags = variants.len(), %width, "registered flag");
        Ok(Arc::new(Self { name, variants, width }))
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn width(&self) -> Format {
        self.width
    }

    pub fn weight(&self, flag: &str) -> Option<u128> {
        self.variants
            .iter()
            .position(|v| v == flag)
            .map(|i| 1u128 << i)
    }

    pub(crate) fn write(&self, writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
        let flags = match value {
            Value::Flag(f) if f.type_name == self.name => &f.flags,
            other => return Err(wrong_type(&self.name, other, "flag")),
        };
        let mut bits = 0u128;
        for flag in flags {
            bits |= self.weight(flag).ok_or_else(|| EncodeError::UnknownVariant {
                type_name: self.name.clone(),
                variant: flag.clone(),
            })?;
        }
        primitive::write_uint(writer, bits, self.width)
    }

    pub(crate) fn read(&self, reader: &mut Reader<'_>) -> Result<Value, DeserializationError> {
        let bits = primitive::read_uint(reader, self.width)?;
        if bits >> self.variants.len() != 0 {
            return Err(DeserializationError::InvalidFlagBits {
                type_name: self.name.clone(),
                bits,
            });
        }
        let flags = self
            .variants
            .iter()
            .enumerate()
            .filter(|(i, _)| bits & (1 << i) != 0)
            .map(|(_, flag)| flag.clone());
        Ok(Value::Flag(FlagValue::new(self.name.clone(), flags)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions() -> Arc<FlagDef> {
        FlagDef::new("fs.Permission", ["Read", "Write", "Execute"]).unwrap()
    }

    #[test]
    fn test_bits_by_declaration_order() {
        let def = permissions();
        let mut writer = Writer::new();
        def.write(&mut writer, &FlagValue::new("fs.Permission", ["Execute", "Read"]).into())
            .unwrap();
        assert_eq!(writer.flush(), [0b101]);

        let mut reader = Reader::new(&[0b011]);
        assert_eq!(
            def.read(&mut reader).unwrap(),
            Value::Flag(FlagValue::new("fs.Permission", ["Read", "Write"]))
        );
    }

    #[test]
    fn test_undeclared_bits_rejected() {
        let mut reader = Reader::new(&[0b1000]);
        assert!(matches!(
            permissions().read(&mut reader),
            Err(DeserializationError::InvalidFlagBits { bits: 8, .. })
        ));
    }

    #[test]
    fn test_width_and_limit() {
        assert_eq!(permissions().width(), Format::U8);
        let wide = FlagDef::new("demo.Wide", (0..9).map(|i| format!("F{i}"))).unwrap();
        assert_eq!(wide.width(), Format::U16);
        let widest = FlagDef::new("demo.Widest", (0..127).map(|i| format!("F{i}"))).unwrap();
        assert_eq!(widest.width(), Format::V64);
        assert!(matches!(
            FlagDef::new("demo.TooWide", (0..128).map(|i| format!("F{i}"))),
            Err(SchemaError::TooManyFlags { count: 128, .. })
        ));
    }
}
