use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use comserde_buffers::{Reader, Writer};

use super::wrong_type;
use crate::descriptor::Descriptor;
use crate::entry::Codec;
use crate::error::{DeserializationError, EncodeError, SchemaError};
use crate::value::{StructValue, TypeName, Value};

/// Builds an instance from every field value, in declaration order. When
/// present it replaces field-by-field assignment on decode.
pub type ConstructHook =
    Arc<dyn Fn(&TypeName, Vec<(String, Value)>) -> Result<StructValue, String> + Send + Sync>;

/// Runs on every decoded instance to restore invariants.
pub type FinalizeHook = Arc<dyn Fn(&mut StructValue) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
enum FieldDefault {
    Value(Value),
    With(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    fn produce(&self) -> Value {
        match self {
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::With(factory) => factory(),
        }
    }
}

/// One entry of a struct's field table.
#[derive(Clone)]
pub struct FieldDef {
    name: String,
    descriptor: Descriptor,
    serialize: bool,
    default: Option<FieldDefault>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, descriptor: impl Into<Descriptor>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            serialize: true,
            default: None,
        }
    }

    /// Keeps the field off the wire. Decoding fills it from its default,
    /// which must then be declared.
    pub fn skip(mut self) -> Self {
        self.serialize = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Default computed afresh for every instance.
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::With(Arc::new(factory)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn is_serialized(&self) -> bool {
        self.serialize
    }

    pub fn default(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::produce)
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor.label())
            .field("serialize", &self.serialize)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Field table and construction hooks of a struct type.
pub struct StructDef {
    name: TypeName,
    fields: Vec<FieldDef>,
    construct: Option<ConstructHook>,
    finalize: Option<FinalizeHook>,
}

impl fmt::Debug for StructDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDef")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl StructDef {
    pub fn builder(name: impl Into<TypeName>) -> StructBuilder {
        StructBuilder {
            name: name.into(),
            fields: Vec::new(),
            construct: None,
            finalize: None,
        }
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// An instance holding every field's default. Fields without a default
    /// are left unset.
    pub fn instance(&self) -> StructValue {
        let mut instance = StructValue::new(self.name.clone());
        for field in &self.fields {
            if let Some(value) = field.default() {
                instance.set(field.name.clone(), value);
            }
        }
        instance
    }

    pub(crate) fn write(&self, codec: &Codec, writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
        let instance = match value {
            Value::Struct(instance) if instance.type_name == self.name => instance,
            other => return Err(wrong_type(&self.name, other, "struct")),
        };
        for field in self.fields.iter().filter(|field| field.serialize) {
            let field_value = match instance.get(&field.name) {
                Some(v) => Cow::Borrowed(v),
                None => Cow::Owned(field.default().ok_or_else(|| EncodeError::MissingField {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                })?),
            };
            codec.write(writer, &field_value, &field.descriptor)?;
        }
        Ok(())
    }

    pub(crate) fn read(&self, codec: &Codec, reader: &mut Reader<'_>) -> Result<Value, DeserializationError> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = if field.serialize {
                codec.read(reader, &field.descriptor)?
            } else {
                field.default().unwrap_or(Value::None)
            };
            values.push((field.name.clone(), value));
        }

        let construction = |message: String| DeserializationError::Construction {
            type_name: self.name.clone(),
            message,
        };
        let mut instance = match &self.construct {
            Some(construct) => construct(&self.name, values).map_err(construction)?,
            None => {
                let mut instance = StructValue::new(self.name.clone());
                for (name, value) in values {
                    instance.set(name, value);
                }
                instance
            }
        };
        if let Some(finalize) = &self.finalize {
            finalize(&mut instance).map_err(construction)?;
        }
        Ok(Value::Struct(instance))
    }
}

/// Collects a struct's fields in wire order.
pub struct StructBuilder {
    name: TypeName,
    fields: Vec<FieldDef>,
    construct: Option<ConstructHook>,
    finalize: Option<FinalizeHook>,
}

impl StructBuilder {
    pub fn field(self, name: impl Into<String>, descriptor: impl Into<Descriptor>) -> Self {
        self.field_def(FieldDef::new(name, descriptor))
    }

    pub fn field_def(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn on_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TypeName, Vec<(String, Value)>) -> Result<StructValue, String> + Send + Sync + 'static,
    {
        self.construct = Some(Arc::new(hook));
        self
    }

    pub fn on_finalize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut StructValue) -> Result<(), String> + Send + Sync + 'static,
    {
        self.finalize = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<Arc<StructDef>, SchemaError> {
        if let Some(field) = super::check_unique(self.fields.iter().map(|f| f.name.as_str())) {
            return Err(SchemaError::DuplicateField {
                type_name: self.name.clone(),
                field: field.to_owned(),
            });
        }
        if let Some(field) = self.fields.iter().find(|f| !f.serialize && f.default.is_none()) {
            return Err(SchemaError::SkippedFieldWithoutDefault {
                type_name: self.name.clone(),
                field: field.name.clone(),
            });
        }
        tracing::debug!(
            type_name = %self.name,
            fields = self.fields.len(),
            skipped = self.fields.iter().filter(|f| !f.serialize).count(),
            "registered struct"
        );
        Ok(Arc::new(StructDef {
            name: self.name,
            fields: self.fields,
            construct: self.construct,
            finalize: self.finalize,
        }))
    }
}
