//! Static type descriptors for workflow discovery.
//!
//! The source SDK builds these by walking Python's runtime type hints
//! (`typing.get_type_hints`, `__annotations__`) at registration time. Rust
//! has no equivalent reflection, so each type that can appear in a workflow
//! signature implements [`Describe`] to report its own shape instead.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A workflow input/output shape, as reported by the `/discover` endpoint.
///
/// Either a primitive name (`"int"`, `"str"`, `"bool"`, ...) or a map from
/// field name to nested descriptor, matching the original SDK's recursive
/// `{"field": "type" | {...}}` discovery payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum TypeDescriptor {
    Primitive(String),
    Fields(BTreeMap<String, TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }
}

/// Implemented by any type that can appear as a workflow or action's input
/// or output, so the registry can describe it without runtime reflection.
pub trait Describe {
    fn describe() -> TypeDescriptor;
}

macro_rules! describe_primitive {
    ($ty:ty, $name:literal) => {
        impl Describe for $ty {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::primitive($name)
            }
        }
    };
}

describe_primitive!(bool, "bool");
describe_primitive!(i8, "int");
describe_primitive!(i16, "int");
describe_primitive!(i32, "int");
describe_primitive!(i64, "int");
describe_primitive!(u8, "int");
describe_primitive!(u16, "int");
describe_primitive!(u32, "int");
describe_primitive!(u64, "int");
describe_primitive!(f32, "float");
describe_primitive!(f64, "float");
describe_primitive!(String, "str");
describe_primitive!((), "None");

impl Describe for serde_json::Value {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive("Any")
    }
}

/// An untyped JSON object — Python's bare `dict` annotation, as opposed to a
/// `dict[K, V]` with known type parameters (see `BTreeMap`/`HashMap` below).
impl Describe for serde_json::Map<String, serde_json::Value> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive("dict")
    }
}

/// Renders a descriptor as the single token used inside a compound
/// descriptor string (`"T | None"`, `"list[T]"`, `"dict[str, T]"`). Record
/// descriptors render as an inline `{field: token, ...}` form, per Open
/// Question (c): a descriptor position may hold a string or a nested map,
/// and a string descriptor may itself embed a structural map this way.
fn token(descriptor: &TypeDescriptor) -> String {
    match descriptor {
        TypeDescriptor::Primitive(name) => name.clone(),
        TypeDescriptor::Fields(fields) => {
            let body = fields
                .iter()
                .map(|(name, value)| format!("{name}: {}", token(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{body}}}")
        }
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive(format!("{} | None", token(&T::describe())))
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive(format!("list[{}]", token(&T::describe())))
    }
}

impl<T: Describe> Describe for BTreeMap<String, T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive(format!("dict[str, {}]", token(&T::describe())))
    }
}

impl<T: Describe> Describe for HashMap<String, T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive(format!("dict[str, {}]", token(&T::describe())))
    }
}
