//! Field Resolver: decides where every destination field gets its value
//!
//! For each destination target field, in declaration order, the first rule
//! that applies wins:
//!
//! 1. skipped destination path: no binding, the field keeps its zero value
//! 2. field transformer (full path, or bare name in flat mode)
//! 3. field mapping, with a breadth-first fallback on its last segment in flat mode
//! 4. same-named readable source field, then a breadth-first search in flat mode
//! 5. in flat mode, a required nested object is built from the enclosing source
//! 6. zero value, or [`Error::MissingField`]
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::transform::config::{ConfigurationStore, FieldTransformer};
use crate::transform::shape::{self, FieldDescriptor, ShapeMetadata};
use crate::reflect::TypeRef;
use crate::value::{ObjectRef, Value, ValueKind};
use std::any::TypeId;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Whether a fresh instance is built or an existing one populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Constructor slots and setters are targets
    Construct,
    /// Only setters are targets
    Populate,
}

/// Resolved chain of readable fields starting at a source object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    segments: Vec<String>,
}

impl SourcePath {
    fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk the path on a live source object
    ///
    /// An absent intermediate object yields `Null` for the whole path.
    pub fn read(&self, source: &ObjectRef) -> Result<Value> {
        let mut current = source.clone();
        let last = self.segments.len().saturating_sub(1);
        for (index, segment) in self.segments.iter().enumerate() {
            let shape = shape::analyze(current.type_ref())?;
            let field = shape.field(segment).ok_or_else(|| {
                Error::internal(format!("resolved source field '{}' vanished from '{}'", segment, shape.name()))
            })?;
            let value = field.read(current.bean()).ok_or_else(|| {
                Error::internal(format!("getter of '{}.{}' rejected its own type", shape.name(), segment))
            })?;
            if index == last {
                return Ok(value);
            }
            match value {
                Value::Null => return Ok(Value::Null),
                Value::Object(next) => current = next,
                other => {
                    return Err(Error::internal(format!(
                        "intermediate source field '{}' holds {} instead of an object",
                        segment,
                        other.type_name()
                    )))
                }
            }
        }
        Ok(Value::Object(current))
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Where a destination field takes its value from
#[derive(Debug, Clone)]
pub enum BoundSource {
    Path(SourcePath),
    /// The current source object feeds the nested destination object (flat mode)
    Enclosing,
    Transformer {
        transformer: FieldTransformer,
        /// `None` hands the function the whole source object
        input: Option<SourcePath>,
    },
    ZeroValue,
}

/// Resolution result for one destination field
#[derive(Debug, Clone)]
pub struct Binding {
    /// Index into the destination shape's fields
    pub field: usize,
    /// Full dotted destination path
    pub path: String,
    pub source: BoundSource,
}

/// Bind every destination target field of `dest` to a source
///
/// `enclosing` lists the destination types already being built from the same
/// source object, `dest` included.
pub fn resolve(
    source: &Arc<ShapeMetadata>,
    dest: &ShapeMetadata,
    config: &ConfigurationStore,
    prefix: &str,
    mode: BuildMode,
    enclosing: &[TypeRef],
) -> Result<Vec<Binding>> {
    let mut bindings = Vec::with_capacity(dest.fields().len());
    for (index, field) in dest.fields().iter().enumerate() {
        let targeted = match mode {
            BuildMode::Construct => field.is_target(),
            BuildMode::Populate => field.is_writable(),
        };
        if !targeted {
            continue;
        }
        let path = join_path(prefix, &field.name);
        if config.is_skipped(&path) {
            log::trace!("Skipping destination field '{}'", path);
            continue;
        }
        if let Some(bound) = resolve_field(source, dest, field, config, &path, enclosing)? {
            log::trace!("Bound '{}' to {:?}", path, bound);
            bindings.push(Binding {
                field: index,
                path,
                source: bound,
            });
        }
    }
    Ok(bindings)
}

fn resolve_field(
    source: &Arc<ShapeMetadata>,
    dest: &ShapeMetadata,
    field: &FieldDescriptor,
    config: &ConfigurationStore,
    path: &str,
    enclosing: &[TypeRef],
) -> Result<Option<BoundSource>> {
    let flat = config.flat_field_name_transformation;

    if let Some(transformer) = config.transformer_for(path, &field.name) {
        let input = match &transformer.source {
            Some(source_path) => Some(resolve_configured(source, source_path, flat, path)?),
            None => None,
        };
        return Ok(Some(BoundSource::Transformer {
            transformer: transformer.clone(),
            input,
        }));
    }

    if let Some(mapping) = config.mapping_for(path) {
        let resolved = resolve_configured(source, &mapping.source, flat, path)?;
        return Ok(Some(BoundSource::Path(resolved)));
    }

    if let Some(direct) = source.field(&field.name).filter(|f| f.is_readable()) {
        return Ok(Some(BoundSource::Path(SourcePath::new(vec![direct.name.clone()]))));
    }

    if flat {
        if let Some(found) = find_flat(source, &field.name)? {
            return Ok(Some(BoundSource::Path(found)));
        }
        // Optional links and types already built from this source stay unmatched
        if let ValueKind::Object(nested) = &field.kind {
            if *nested != dest.type_ref() && !enclosing.contains(nested) {
                return Ok(Some(BoundSource::Enclosing));
            }
        }
    }

    if config.default_value_for_missing_field {
        return Ok(Some(BoundSource::ZeroValue));
    }
    Err(Error::MissingField {
        path: path.to_string(),
        type_name: dest.name().to_string(),
    })
}

/// Resolve a configured source path, falling back to a flat search in flat mode
fn resolve_configured(source: &Arc<ShapeMetadata>, source_path: &str, flat: bool, path: &str) -> Result<SourcePath> {
    let reason = match resolve_path(source, source_path)? {
        Ok(resolved) => return Ok(resolved),
        Err(reason) => reason,
    };
    if flat {
        let terminal = source_path.rsplit('.').next().unwrap_or(source_path);
        if let Some(found) = find_flat(source, terminal)? {
            log::debug!(
                "Source path '{}' for '{}' resolved by name as '{}'",
                source_path,
                path,
                found
            );
            return Ok(found);
        }
    }
    Err(Error::InvalidMapping {
        path: path.to_string(),
        source_path: source_path.to_string(),
        message: reason,
    })
}

/// Walk a dotted path through the source shapes
///
/// The inner error explains why the path does not resolve.
fn resolve_path(source: &Arc<ShapeMetadata>, dotted: &str) -> Result<std::result::Result<SourcePath, String>> {
    let segments: Vec<&str> = dotted.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Ok(Err("is not a valid dotted path".to_string()));
    }
    let mut shape = Arc::clone(source);
    for (index, segment) in segments.iter().enumerate() {
        let Some(field) = shape.field(segment) else {
            return Ok(Err(format!("does not resolve: '{}' has no field '{}'", shape.name(), segment)));
        };
        if !field.is_readable() {
            return Ok(Err(format!("does not resolve: '{}.{}' is not readable", shape.name(), segment)));
        }
        if index + 1 < segments.len() {
            let Some(nested) = field.kind.object_type() else {
                return Ok(Err(format!(
                    "does not resolve: '{}.{}' is not a nested object",
                    shape.name(),
                    segment
                )));
            };
            shape = shape::analyze(nested)?;
        }
    }
    Ok(Ok(SourcePath::new(segments.into_iter().map(str::to_string).collect())))
}

/// Breadth-first search of the source shape graph for a readable field
///
/// Every field of a shape is checked before any nested shape is entered, and
/// each type is visited once so recursive shapes terminate.
fn find_flat(source: &Arc<ShapeMetadata>, name: &str) -> Result<Option<SourcePath>> {
    let mut visited: HashSet<TypeId> = HashSet::new();
    let mut queue: VecDeque<(Arc<ShapeMetadata>, Vec<String>)> = VecDeque::new();
    visited.insert(source.type_ref().id());
    queue.push_back((Arc::clone(source), Vec::new()));

    while let Some((shape, prefix)) = queue.pop_front() {
        if let Some(found) = shape.field(name).filter(|f| f.is_readable()) {
            let mut segments = prefix;
            segments.push(found.name.clone());
            return Ok(Some(SourcePath::new(segments)));
        }
        for field in shape.fields().iter().filter(|f| f.is_readable()) {
            let Some(nested) = field.kind.object_type() else {
                continue;
            };
            if !visited.insert(nested.id()) {
                continue;
            }
            let mut segments = prefix.clone();
            segments.push(field.name.clone());
            queue.push_back((shape::analyze(nested)?, segments));
        }
    }
    Ok(None)
}

/// Dotted destination path of `name` under `prefix`
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Path as shown in errors; the root object has an empty path
pub fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
