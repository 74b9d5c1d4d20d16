//! Type-name resolution for dynamic objects, named references and default
//! descriptor inference.

use std::collections::HashMap;
use std::sync::Arc;

use crate::derive::{CustomCodec, EnumDef, FlagDef, OpenUnion, StructDef};
use crate::descriptor::Descriptor;
use crate::value::TypeName;

/// Maps a concrete type name to the descriptor that encodes it.
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, name: &TypeName) -> Option<Descriptor>;
}

/// In-memory [`TypeResolver`]. Populate it fully, then share it read-only
/// with any number of codecs.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeName, Descriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: impl Into<TypeName>, descriptor: Descriptor) -> &mut Self {
        let name = name.into();
        tracing::debug!(type_name = %name, descriptor = descriptor.label(), "registered type");
        self.types.insert(name, descriptor);
        self
    }

    pub fn register_struct(&mut self, def: &Arc<StructDef>) -> &mut Self {
        self.register(def.name().clone(), Descriptor::Struct(def.clone()))
    }

    pub fn register_enum(&mut self, def: &Arc<EnumDef>) -> &mut Self {
        self.register(def.name().clone(), Descriptor::Enum(def.clone()))
    }

    pub fn register_flag(&mut self, def: &Arc<FlagDef>) -> &mut Self {
        self.register(def.name().clone(), Descriptor::Flag(def.clone()))
    }

    /// Registers the union under its base name. Members still need their own
    /// registration to be reachable by name.
    pub fn register_union(&mut self, union: &Arc<OpenUnion>) -> &mut Self {
        self.register(union.base().clone(), Descriptor::OpenUnion(union.clone()))
    }

    /// Registers a hand-written codec under the type name it reports.
    pub fn register_custom(&mut self, codec: Arc<dyn CustomCodec>) -> &mut Self {
        self.register(codec.type_name().clone(), Descriptor::Custom(codec))
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, name: &TypeName) -> Option<Descriptor> {
        self.types.get(name).cloned()
    }
}
