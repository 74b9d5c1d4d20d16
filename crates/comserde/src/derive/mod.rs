//! Registered wire behavior for user types.
//!
//! Each definition is built once, validated at build time, and then shared
//! read-only through an [`Arc`](std::sync::Arc) by every descriptor that
//! refers to it.

mod custom;
mod enum_def;
mod flag_def;
mod open_union;
mod struct_def;

pub use custom::CustomCodec;
pub use enum_def::EnumDef;
pub use flag_def::FlagDef;
pub use open_union::OpenUnion;
pub use struct_def::{ConstructHook, FieldDef, FinalizeHook, StructBuilder, StructDef};

use crate::error::{EncodeError, SchemaError};
use crate::value::{TypeName, Value};

/// Rejects the first name that appears twice.
fn check_unique<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

fn check_variants(type_name: &TypeName, variants: &[String]) -> Result<(), SchemaError> {
    match check_unique(variants.iter().map(String::as_str)) {
        Some(variant) => Err(SchemaError::DuplicateVariant {
            type_name: type_name.clone(),
            variant: variant.to_owned(),
        }),
        None => Ok(()),
    }
}

/// Error for a value that is not an instance of `expected`.
fn wrong_type(expected: &TypeName, value: &Value, kind: &'static str) -> EncodeError {
    match value.type_name() {
        Some(found) => EncodeError::WrongType {
            expected: expected.clone(),
            found: found.clone(),
        },
        None => EncodeError::TypeMismatch {
            expected: kind,
            found: value.kind(),
        },
    }
}
