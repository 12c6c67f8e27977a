//! Transformation Session: one top-level call and its nested sub-sessions
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::reflect::{Bean, TypeRef};
use crate::transform::builder::ObjectBuilder;
use crate::transform::config::ConfigurationStore;
use crate::transform::converter::{NestedTransform, ValueConverter};
use crate::transform::resolver::{self, display_path, join_path, BoundSource, BuildMode};
use crate::transform::shape::{self, ShapeMetadata};
use crate::value::{ObjectRef, Value};

/// Per-call state: source objects on the current path and nesting depth
#[derive(Debug, Clone)]
pub struct TransformationContext {
    visiting: Vec<usize>,
    depth: usize,
    max_depth: usize,
}

impl TransformationContext {
    pub fn new(max_depth: usize) -> Self {
        Self {
            visiting: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether a source object is already being transformed on this path
    pub fn is_visiting(&self, source: &ObjectRef) -> bool {
        self.visiting.contains(&source.identity())
    }

    /// Descend one level, optionally tracking a source object
    fn enter(&mut self, source: Option<&ObjectRef>, path: &str) -> Result<()> {
        if let Some(source) = source {
            if self.is_visiting(source) {
                return Err(Error::CyclicGraph {
                    path: display_path(path).to_string(),
                    type_name: source.type_ref().name().to_string(),
                });
            }
        }
        if self.depth + 1 > self.max_depth {
            return Err(Error::DepthExceeded {
                path: display_path(path).to_string(),
                max_depth: self.max_depth,
            });
        }
        self.depth += 1;
        if let Some(source) = source {
            self.visiting.push(source.identity());
        }
        Ok(())
    }

    fn leave(&mut self, tracked: bool) {
        self.depth = self.depth.saturating_sub(1);
        if tracked {
            self.visiting.pop();
        }
    }
}

/// Orchestrates resolution, conversion and building for one transform call
pub struct Session<'a> {
    config: &'a ConfigurationStore,
    converter: ValueConverter<'a>,
    context: TransformationContext,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a ConfigurationStore) -> Self {
        Self {
            config,
            converter: ValueConverter::new(&config.coercions),
            context: TransformationContext::new(config.max_depth),
        }
    }

    pub fn context(&self) -> &TransformationContext {
        &self.context
    }

    /// Build a new `dest` instance from a root source object
    pub fn run(&mut self, source: &ObjectRef, dest: TypeRef) -> Result<Box<dyn Bean>> {
        self.context.visiting.push(source.identity());
        let built = self.build_object(source, dest, "", &[]);
        self.context.visiting.pop();
        built
    }

    /// Populate an existing instance through its setters
    pub fn populate(&mut self, source: &ObjectRef, target: &mut dyn Bean) -> Result<()> {
        let source_shape = shape::analyze(source.type_ref())?;
        let dest_shape = shape::analyze(target.type_ref())?;
        let chain = [dest_shape.type_ref()];
        let bindings = resolver::resolve(&source_shape, &dest_shape, self.config, "", BuildMode::Populate, &chain)?;

        self.context.visiting.push(source.identity());
        let values = self.compute_values(source, &dest_shape, bindings, &chain);
        self.context.visiting.pop();

        ObjectBuilder::new(&dest_shape, "").populate(target, values?)
    }

    /// `enclosing` holds the destination types already built from `source`
    fn build_object(
        &mut self,
        source: &ObjectRef,
        dest: TypeRef,
        prefix: &str,
        enclosing: &[TypeRef],
    ) -> Result<Box<dyn Bean>> {
        let source_shape = shape::analyze(source.type_ref())?;
        let dest_shape = shape::analyze(dest)?;
        let mut chain = enclosing.to_vec();
        chain.push(dest);
        let bindings = resolver::resolve(&source_shape, &dest_shape, self.config, prefix, BuildMode::Construct, &chain)?;
        log::trace!(
            "Building '{}' at '{}' from '{}' with {} binding(s)",
            dest_shape.name(),
            display_path(prefix),
            source_shape.name(),
            bindings.len()
        );

        let values = self.compute_values(source, &dest_shape, bindings, &chain)?;
        let converter = self.converter;
        ObjectBuilder::new(&dest_shape, prefix).build(values, &mut |field| {
            converter.zero_value(&field.kind, &join_path(prefix, &field.name), &mut *self)
        })
    }

    fn compute_values(
        &mut self,
        source: &ObjectRef,
        dest_shape: &ShapeMetadata,
        bindings: Vec<resolver::Binding>,
        chain: &[TypeRef],
    ) -> Result<Vec<(usize, Value)>> {
        let mut values = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let field = dest_shape
                .fields()
                .get(binding.field)
                .ok_or_else(|| Error::internal(format!("binding for '{}' points past the fields", binding.path)))?;
            let converter = self.converter;
            let value = match binding.source {
                BoundSource::Path(source_path) => {
                    let raw = source_path.read(source)?;
                    converter.convert(raw, &field.kind, &binding.path, &mut *self)?
                }
                BoundSource::Enclosing => {
                    let nested = field.kind.object_type().ok_or_else(|| {
                        Error::internal(format!("'{}' bound to its enclosing source but is not an object", binding.path))
                    })?;
                    self.context.enter(None, &binding.path)?;
                    let built = self.build_object(source, nested, &binding.path, chain);
                    self.context.leave(false);
                    Value::Object(ObjectRef::from_boxed(built?))
                }
                BoundSource::Transformer { transformer, input } => {
                    let input = match input {
                        Some(source_path) => source_path.read(source)?,
                        None => Value::Object(source.clone()),
                    };
                    transformer.apply(&input).map_err(|message| Error::Build {
                        path: binding.path.clone(),
                        type_name: dest_shape.name().to_string(),
                        message: format!("field transformer failed: {}", message),
                    })?
                }
                BoundSource::ZeroValue => converter.zero_value(&field.kind, &binding.path, &mut *self)?,
            };
            values.push((binding.field, value));
        }
        Ok(values)
    }
}

impl NestedTransform for Session<'_> {
    fn transform_nested(&mut self, source: &ObjectRef, dest: TypeRef, path: &str) -> Result<Value> {
        self.context.enter(Some(source), path)?;
        log::trace!("Entering '{}' at depth {}", display_path(path), self.context.depth);
        let built = self.build_object(source, dest, path, &[]);
        self.context.leave(true);
        Ok(Value::Object(ObjectRef::from_boxed(built?)))
    }

    fn zero_object(&mut self, dest: TypeRef, path: &str) -> Result<Value> {
        self.context.enter(None, path)?;
        let built = self.zero_instance(dest, path);
        self.context.leave(false);
        Ok(Value::Object(ObjectRef::from_boxed(built?)))
    }
}

impl Session<'_> {
    /// Destination instance with every target field at its zero value
    fn zero_instance(&mut self, dest: TypeRef, path: &str) -> Result<Box<dyn Bean>> {
        let shape = shape::analyze(dest)?;
        let converter = self.converter;
        let mut values = Vec::new();
        for (index, field) in shape.fields().iter().enumerate() {
            if field.is_target() {
                let value = converter.zero_value(&field.kind, &join_path(path, &field.name), &mut *self)?;
                values.push((index, value));
            }
        }
        ObjectBuilder::new(&shape, path).build(values, &mut |field| {
            Err(Error::internal(format!("zero instance left slot of '{}' unbound", field.name)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::downcast_bean;
    use crate::bean;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Inner {
        value: i32,
    }
    bean!(mutable Inner { value: i32 });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Outer {
        inner: Inner,
        label: String,
    }
    bean!(mutable Outer { inner: Inner, label: String });

    #[test]
    fn test_context_guards() {
        let mut context = TransformationContext::new(1);
        let object = ObjectRef::new(Inner::default());
        context.enter(Some(&object), "a").expect("first level");
        assert!(context.is_visiting(&object));
        let err = context.enter(None, "a.b").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DepthExceeded);
        context.leave(true);
        assert_eq!(context.depth(), 0);
        assert!(!context.is_visiting(&object));
    }

    #[test]
    fn test_cycle_reported_on_reentry() {
        let mut context = TransformationContext::new(8);
        let object = ObjectRef::new(Inner::default());
        context.enter(Some(&object), "a").expect("enter");
        let err = context.enter(Some(&object.clone()), "a.self").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::CyclicGraph);
        assert_eq!(err.path(), Some("a.self"));
    }

    #[test]
    fn test_session_builds_nested_copy() {
        let config = ConfigurationStore::new();
        let source = ObjectRef::new(Outer {
            inner: Inner { value: 3 },
            label: "x".into(),
        });
        let built = Session::new(&config)
            .run(&source, TypeRef::of::<Outer>())
            .expect("built");
        assert_eq!(
            downcast_bean::<Outer>(built),
            Some(Outer {
                inner: Inner { value: 3 },
                label: "x".into()
            })
        );
    }

    #[test]
    fn test_zero_instance_of_nested_object() {
        let config = ConfigurationStore::new();
        let mut session = Session::new(&config);
        let zero = session.zero_object(TypeRef::of::<Outer>(), "o").expect("zero");
        let outer = zero.as_object().and_then(|o| o.downcast_ref::<Outer>()).cloned();
        assert_eq!(outer, Some(Outer::default()));
        assert_eq!(session.context().depth(), 0);
    }
}
