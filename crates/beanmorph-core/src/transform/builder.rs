//! Object Builder: assembles destination instances from resolved values
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::reflect::Bean;
use crate::transform::resolver::{display_path, join_path};
use crate::transform::shape::{ConstructionKind, FieldDescriptor, ShapeMetadata};
use crate::value::Value;

/// Builds one destination object at `path`
pub struct ObjectBuilder<'s> {
    shape: &'s ShapeMetadata,
    path: &'s str,
}

impl<'s> ObjectBuilder<'s> {
    pub fn new(shape: &'s ShapeMetadata, path: &'s str) -> Self {
        Self { shape, path }
    }

    /// Construct a new instance
    ///
    /// `values` pairs a field index with its converted value. Constructor
    /// slots without a value are filled through `zero`.
    pub fn build(
        &self,
        values: Vec<(usize, Value)>,
        zero: &mut dyn FnMut(&FieldDescriptor) -> Result<Value>,
    ) -> Result<Box<dyn Bean>> {
        match self.shape.kind() {
            ConstructionKind::Mutable => {
                let mut instance = self.invoke(Vec::new())?;
                self.apply_setters(&mut *instance, values)?;
                Ok(instance)
            }
            ConstructionKind::Immutable | ConstructionKind::Hybrid => {
                let mut slots: Vec<Option<Value>> = vec![None; self.shape.slot_count()];
                let mut setters = Vec::new();
                for (index, value) in values {
                    let field = self.field(index)?;
                    match field.slot {
                        Some(slot) if slot < slots.len() => slots[slot] = Some(value),
                        Some(slot) => {
                            return Err(Error::internal(format!(
                                "slot {} of '{}' is outside the constructor of '{}'",
                                slot,
                                field.name,
                                self.shape.name()
                            )))
                        }
                        None if field.is_writable() => setters.push((index, value)),
                        None => {
                            return Err(Error::internal(format!(
                                "value for '{}' has neither a constructor slot nor a setter",
                                join_path(self.path, &field.name)
                            )))
                        }
                    }
                }

                for field in self.shape.fields() {
                    if let Some(entry) = field.slot.and_then(|slot| slots.get_mut(slot)) {
                        if entry.is_none() {
                            *entry = Some(zero(field)?);
                        }
                    }
                }
                let args = slots
                    .into_iter()
                    .enumerate()
                    .map(|(slot, value)| {
                        value.ok_or_else(|| {
                            Error::internal(format!("constructor slot {} of '{}' is unbound", slot, self.shape.name()))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut instance = self.invoke(args)?;
                self.apply_setters(&mut *instance, setters)?;
                Ok(instance)
            }
        }
    }

    /// Apply values to an existing instance through setters only
    pub fn populate(&self, target: &mut dyn Bean, values: Vec<(usize, Value)>) -> Result<()> {
        self.apply_setters(target, values)
    }

    fn invoke(&self, args: Vec<Value>) -> Result<Box<dyn Bean>> {
        self.shape.constructor().invoke(args).map_err(|message| Error::Build {
            path: display_path(self.path).to_string(),
            type_name: self.shape.name().to_string(),
            message,
        })
    }

    fn apply_setters(&self, target: &mut dyn Bean, values: Vec<(usize, Value)>) -> Result<()> {
        for (index, value) in values {
            let field = self.field(index)?;
            if !field.is_writable() {
                return Err(Error::internal(format!(
                    "'{}' received a value but has no setter",
                    join_path(self.path, &field.name)
                )));
            }
            field.write(target, value).map_err(|message| Error::Build {
                path: join_path(self.path, &field.name),
                type_name: self.shape.name().to_string(),
                message,
            })?;
        }
        Ok(())
    }

    fn field(&self, index: usize) -> Result<&'s FieldDescriptor> {
        self.shape
            .fields()
            .get(index)
            .ok_or_else(|| Error::internal(format!("no field #{} on '{}'", index, self.shape.name())))
    }
}
