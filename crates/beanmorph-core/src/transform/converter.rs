//! Value Converter: turns a source value into a value of the destination kind
//!
//! Scalars go through widening or the coercion registry, collections are
//! converted element by element, and nested objects are handed back to the
//! session through [`NestedTransform`] so cycle and depth guards apply.
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::reflect::TypeRef;
use crate::transform::coercion::CoercionRegistry;
use crate::transform::resolver::display_path;
use crate::value::{ObjectRef, Value, ValueKind};

/// Recursion hook for nested objects
pub trait NestedTransform {
    /// Transform a nested source object into `dest`
    fn transform_nested(&mut self, source: &ObjectRef, dest: TypeRef, path: &str) -> Result<Value>;

    /// Build a `dest` instance from zero values
    fn zero_object(&mut self, dest: TypeRef, path: &str) -> Result<Value>;
}

#[derive(Debug, Clone, Copy)]
pub struct ValueConverter<'a> {
    coercions: &'a CoercionRegistry,
}

impl<'a> ValueConverter<'a> {
    pub fn new(coercions: &'a CoercionRegistry) -> Self {
        Self { coercions }
    }

    /// Convert `value` into `kind`, reporting failures at `path`
    pub fn convert(&self, value: Value, kind: &ValueKind, path: &str, nested: &mut dyn NestedTransform) -> Result<Value> {
        match kind {
            ValueKind::Optional(inner) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    self.convert(value, inner, path, nested)
                }
            }
            _ if value.is_null() => self.zero_value(kind, path, nested),
            ValueKind::Scalar(target) => {
                if value.scalar_kind().is_none() {
                    return Err(incompatible(&value, kind, path, None));
                }
                match self.coercions.convert(&value, *target) {
                    Some(Ok(converted)) => Ok(converted),
                    Some(Err(detail)) => Err(incompatible(&value, kind, path, Some(detail))),
                    None => Err(incompatible(&value, kind, path, None)),
                }
            }
            ValueKind::Object(dest) => match &value {
                Value::Object(source) => nested.transform_nested(source, *dest, path),
                other => Err(incompatible(other, kind, path, None)),
            },
            ValueKind::List(element) => match value {
                Value::List(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| self.convert(item, element, &format!("{}[{}]", path, index), nested))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List),
                other => Err(incompatible(&other, kind, path, None)),
            },
            ValueKind::Map(key_kind, value_kind) => match value {
                Value::Map(entries) => {
                    let mut converted: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
                    for (source_key, item) in entries {
                        let entry_path = format!("{}[{}]", path, source_key);
                        let key = self.convert(source_key.clone(), key_kind, &entry_path, nested)?;
                        // Distinct source keys must stay distinct
                        if converted.iter().any(|(existing, _)| *existing == key) {
                            return Err(incompatible(
                                &source_key,
                                key_kind,
                                &entry_path,
                                Some(format!("key converts to {}, which another entry already uses", key)),
                            ));
                        }
                        let item = self.convert(item, value_kind, &entry_path, nested)?;
                        converted.push((key, item));
                    }
                    Ok(Value::Map(converted))
                }
                other => Err(incompatible(&other, kind, path, None)),
            },
        }
    }

    /// Zero value of a kind; nested objects are built from zero values
    pub fn zero_value(&self, kind: &ValueKind, path: &str, nested: &mut dyn NestedTransform) -> Result<Value> {
        match kind {
            ValueKind::Scalar(scalar) => Ok(scalar.zero_value()),
            ValueKind::Optional(_) => Ok(Value::Null),
            ValueKind::List(_) => Ok(Value::List(Vec::new())),
            ValueKind::Map(_, _) => Ok(Value::Map(Vec::new())),
            ValueKind::Object(dest) => nested.zero_object(*dest, path),
        }
    }
}

fn incompatible(value: &Value, kind: &ValueKind, path: &str, detail: Option<String>) -> Error {
    Error::IncompatibleType {
        path: display_path(path).to_string(),
        from: value.type_name(),
        to: kind.to_string(),
        detail,
    }
}
