//! Shape Analyzer: construction-shape discovery and the shared metadata cache
//!
//! A type's [`TypeInfo`] is turned into [`ShapeMetadata`] once per process.
//! The analyzer decides how instances are built:
//!
//! - **Mutable**: no-argument constructor, then setters
//! - **Immutable**: a single constructor whose parameters bind every property
//! - **Hybrid**: a constructor binding some properties, setters for the rest
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::reflect::{AsAny, Bean, ConstructorInfo, Getter, PropertyInfo, Setter, TypeInfo, TypeRef};
use crate::transform::validator::Constraint;
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// How a destination instance is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionKind {
    Mutable,
    Immutable,
    Hybrid,
}

impl fmt::Display for ConstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionKind::Mutable => write!(f, "mutable"),
            ConstructionKind::Immutable => write!(f, "immutable"),
            ConstructionKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Analyzed view of one property
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ValueKind,
    /// Position in the selected constructor's argument list
    pub slot: Option<usize>,
    pub constraints: Vec<Constraint>,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl FieldDescriptor {
    fn from_property(property: PropertyInfo) -> Self {
        Self {
            name: property.name,
            kind: property.kind,
            slot: None,
            constraints: property.constraints,
            getter: property.getter,
            setter: property.setter,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Whether a built instance can receive a value for this field
    pub fn is_target(&self) -> bool {
        self.slot.is_some() || self.is_writable()
    }

    /// Read the field; `None` when unreadable or applied to another type
    pub fn read(&self, bean: &dyn Bean) -> Option<Value> {
        let getter = self.getter.as_ref()?;
        getter(AsAny::as_any(bean))
    }

    pub(crate) fn write(&self, bean: &mut dyn Bean, value: Value) -> std::result::Result<(), String> {
        match &self.setter {
            Some(setter) => setter(AsAny::as_any_mut(bean), value),
            None => Err(format!("field '{}' has no setter", self.name)),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .field("slot", &self.slot)
            .finish()
    }
}

/// Cached structural metadata of a bean type
#[derive(Debug)]
pub struct ShapeMetadata {
    type_ref: TypeRef,
    name: String,
    kind: ConstructionKind,
    fields: Vec<FieldDescriptor>,
    constructor: ConstructorInfo,
}

impl ShapeMetadata {
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ConstructionKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The constructor used to instantiate the type (no-arg for mutable shapes)
    pub fn constructor(&self) -> &ConstructorInfo {
        &self.constructor
    }

    pub fn slot_count(&self) -> usize {
        self.constructor.arity()
    }
}

type ShapeCache = RwLock<HashMap<TypeId, Arc<ShapeMetadata>>>;

static SHAPE_CACHE: OnceLock<ShapeCache> = OnceLock::new();

fn cache() -> &'static ShapeCache {
    SHAPE_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Analyze a type, serving repeated calls from the process-wide cache
///
/// Safe under concurrent first use: a racing thread may compute the same
/// metadata, but only the first insertion is kept and every caller receives
/// that entry.
pub fn analyze(type_ref: TypeRef) -> Result<Arc<ShapeMetadata>> {
    {
        let shapes = cache().read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(shape) = shapes.get(&type_ref.id()) {
            return Ok(Arc::clone(shape));
        }
    }

    let computed = Arc::new(analyze_uncached(type_ref)?);
    log::debug!(
        "Analyzed shape of '{}': {} with {} field(s)",
        computed.name(),
        computed.kind(),
        computed.fields().len()
    );

    let mut shapes = cache().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(Arc::clone(shapes.entry(type_ref.id()).or_insert(computed)))
}

/// Whether the type's shape is already cached
pub fn is_cached(type_ref: TypeRef) -> bool {
    cache()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains_key(&type_ref.id())
}

/// Number of shapes currently cached
pub fn cached_shape_count() -> usize {
    cache().read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
}

/// Drop every cached shape; later calls analyze again
pub fn clear_cache() {
    let mut shapes = cache().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    log::trace!("Clearing {} cached shape(s)", shapes.len());
    shapes.clear();
}

/// Analyze without touching the cache
pub fn analyze_uncached(type_ref: TypeRef) -> Result<ShapeMetadata> {
    analyze_info(type_ref, type_ref.info())
}

/// Decide the construction shape of an introspection table
pub fn analyze_info(type_ref: TypeRef, info: TypeInfo) -> Result<ShapeMetadata> {
    let TypeInfo {
        name,
        properties,
        constructors,
        ..
    } = info;

    let unsupported = |message: String| Error::UnsupportedShape {
        type_name: name.clone(),
        message,
    };

    let mut seen = HashSet::new();
    for property in &properties {
        if !seen.insert(property.name.as_str()) {
            return Err(unsupported(format!("duplicate property '{}'", property.name)));
        }
    }
    if constructors.is_empty() {
        return Err(unsupported("no constructor declared".to_string()));
    }

    let mut fields: Vec<FieldDescriptor> = properties.into_iter().map(FieldDescriptor::from_property).collect();
    let no_arg = constructors.iter().find(|c| c.is_no_arg()).cloned();
    let all_writable = fields.iter().all(FieldDescriptor::is_writable);

    if let (Some(no_arg), true) = (&no_arg, all_writable) {
        return Ok(ShapeMetadata {
            type_ref,
            name,
            kind: ConstructionKind::Mutable,
            fields,
            constructor: no_arg.clone(),
        });
    }

    let parameterised: Vec<&ConstructorInfo> = constructors.iter().filter(|c| !c.is_no_arg()).collect();
    let candidates: Vec<(&ConstructorInfo, Vec<usize>)> = parameterised
        .iter()
        .filter_map(|ctor| bind_constructor(ctor, &fields, parameterised.len()).map(|binding| (*ctor, binding)))
        .collect();

    let full_cover: Vec<&(&ConstructorInfo, Vec<usize>)> =
        candidates.iter().filter(|(_, binding)| binding.len() == fields.len()).collect();
    if full_cover.len() > 1 {
        return Err(unsupported(format!(
            "{} constructors bind every property; cannot choose between them",
            full_cover.len()
        )));
    }
    if let Some((ctor, binding)) = full_cover.first() {
        assign_slots(&mut fields, binding);
        return Ok(ShapeMetadata {
            type_ref,
            name,
            kind: ConstructionKind::Immutable,
            fields,
            constructor: (*ctor).clone(),
        });
    }

    // Partial constructors qualify when every uncovered property has a setter
    let mut partial: Vec<&(&ConstructorInfo, Vec<usize>)> = candidates
        .iter()
        .filter(|(_, binding)| {
            fields
                .iter()
                .enumerate()
                .all(|(index, field)| binding.contains(&index) || field.is_writable())
        })
        .collect();
    partial.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    if partial.len() > 1 && partial[0].1.len() == partial[1].1.len() {
        return Err(unsupported(format!(
            "several constructors bind {} properties; cannot choose between them",
            partial[0].1.len()
        )));
    }
    if let Some((ctor, binding)) = partial.first() {
        assign_slots(&mut fields, binding);
        return Ok(ShapeMetadata {
            type_ref,
            name,
            kind: ConstructionKind::Hybrid,
            fields,
            constructor: (*ctor).clone(),
        });
    }

    // Read-only properties without a constructor slot are simply not targets
    if let Some(no_arg) = no_arg {
        if fields.iter().any(FieldDescriptor::is_writable) {
            return Ok(ShapeMetadata {
                type_ref,
                name,
                kind: ConstructionKind::Mutable,
                fields,
                constructor: no_arg,
            });
        }
    }

    let message = if candidates.len() < parameterised.len() {
        "constructor parameters cannot be bound to properties".to_string()
    } else {
        "properties are neither settable nor covered by a constructor".to_string()
    };
    Err(unsupported(message))
}

/// Map each constructor parameter to a property index
///
/// Named parameters bind by name. Unnamed parameters bind positionally only
/// for the sole parameterised constructor whose arity and kinds equal the
/// property list.
fn bind_constructor(ctor: &ConstructorInfo, fields: &[FieldDescriptor], parameterised: usize) -> Option<Vec<usize>> {
    if ctor.params.iter().all(|p| p.name.is_some()) {
        let mut binding = Vec::with_capacity(ctor.params.len());
        for param in &ctor.params {
            let name = param.name.as_deref()?;
            let index = fields.iter().position(|f| f.name == name)?;
            if fields[index].kind != param.kind || binding.contains(&index) {
                return None;
            }
            binding.push(index);
        }
        return Some(binding);
    }

    let positional = parameterised == 1
        && ctor.params.len() == fields.len()
        && ctor.params.iter().zip(fields).all(|(p, f)| p.kind == f.kind);
    positional.then(|| (0..fields.len()).collect())
}

fn assign_slots(fields: &mut [FieldDescriptor], binding: &[usize]) {
    for (slot, &index) in binding.iter().enumerate() {
        fields[index].slot = Some(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::ParamInfo;
    use crate::{bean, TypeInfo};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }
    bean!(mutable Person { name: String, age: u32 });

    #[derive(Debug, Clone, PartialEq)]
    struct Coordinates {
        lat: f64,
        lon: f64,
    }

    impl Bean for Coordinates {
        fn type_info() -> TypeInfo {
            // Parameter names unavailable: bound by declaration order
            TypeInfo::builder::<Coordinates>("Coordinates")
                .constructor(vec![ParamInfo::unnamed::<f64>(), ParamInfo::unnamed::<f64>()], |args| {
                    Ok(Coordinates {
                        lat: args.next()?,
                        lon: args.next()?,
                    })
                })
                .read_only("lat", |c| &c.lat)
                .read_only("lon", |c| &c.lon)
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<Coordinates>()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Ambiguous {
        a: i32,
        b: i32,
    }

    impl Bean for Ambiguous {
        fn type_info() -> TypeInfo {
            let unnamed = || vec![ParamInfo::unnamed::<i32>(), ParamInfo::unnamed::<i32>()];
            TypeInfo::builder::<Ambiguous>("Ambiguous")
                .constructor(unnamed(), |args| Ok(Ambiguous { a: args.next()?, b: args.next()? }))
                .constructor(unnamed(), |args| Ok(Ambiguous { b: args.next()?, a: args.next()? }))
                .read_only("a", |v| &v.a)
                .read_only("b", |v| &v.b)
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<Ambiguous>()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TwoFullConstructors {
        a: i32,
        b: i32,
    }

    impl Bean for TwoFullConstructors {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<TwoFullConstructors>("TwoFullConstructors")
                .constructor(
                    vec![ParamInfo::named::<i32>("a"), ParamInfo::named::<i32>("b")],
                    |args| Ok(TwoFullConstructors { a: args.next()?, b: args.next()? }),
                )
                .constructor(
                    vec![ParamInfo::named::<i32>("b"), ParamInfo::named::<i32>("a")],
                    |args| Ok(TwoFullConstructors { b: args.next()?, a: args.next()? }),
                )
                .read_only("a", |v| &v.a)
                .read_only("b", |v| &v.b)
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<TwoFullConstructors>()
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Duplicate {
        a: i32,
    }

    impl Bean for Duplicate {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Duplicate>("Duplicate")
                .default_constructor()
                .property("a", |v| &v.a, |v, a| v.a = a)
                .property("a", |v| &v.a, |v, a| v.a = a)
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<Duplicate>()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct ReadOnlyWithoutConstructor {
        a: i32,
    }

    impl Bean for ReadOnlyWithoutConstructor {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<ReadOnlyWithoutConstructor>("ReadOnlyWithoutConstructor")
                .no_arg_constructor(|| ReadOnlyWithoutConstructor { a: 0 })
                .read_only("a", |v| &v.a)
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<ReadOnlyWithoutConstructor>()
        }
    }

    #[test]
    fn test_mutable_shape() {
        let shape = analyze_uncached(TypeRef::of::<Person>()).expect("shape");
        assert_eq!(shape.kind(), ConstructionKind::Mutable);
        assert_eq!(shape.slot_count(), 0);
        assert!(shape.fields().iter().all(|f| f.slot.is_none() && f.is_target()));
    }

    #[test]
    fn test_positional_binding_of_unnamed_parameters() {
        let shape = analyze_uncached(TypeRef::of::<Coordinates>()).expect("shape");
        assert_eq!(shape.kind(), ConstructionKind::Immutable);
        assert_eq!(shape.field("lon").and_then(|f| f.slot), Some(1));
    }

    #[test]
    fn test_ambiguous_unnamed_constructors_are_unsupported() {
        let err = analyze_uncached(TypeRef::of::<Ambiguous>()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedShape);
        assert!(err.to_string().contains("cannot be bound"));
    }

    #[test]
    fn test_two_full_constructors_are_ambiguous() {
        let err = analyze_uncached(TypeRef::of::<TwoFullConstructors>()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedShape);
    }

    #[test]
    fn test_duplicate_properties_rejected() {
        let err = analyze_uncached(TypeRef::of::<Duplicate>()).unwrap_err();
        assert!(err.to_string().contains("duplicate property 'a'"));
    }

    #[test]
    fn test_no_target_fields_rejected() {
        let err = analyze_uncached(TypeRef::of::<ReadOnlyWithoutConstructor>()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedShape);
    }

    #[test]
    fn test_cache_returns_same_entry() {
        let first = analyze(TypeRef::of::<Person>()).expect("shape");
        assert!(is_cached(TypeRef::of::<Person>()));
        let second = analyze(TypeRef::of::<Person>()).expect("shape");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cached_shape_count() >= 1);
    }

    #[test]
    fn test_concurrent_first_use_converges() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| analyze(TypeRef::of::<Coordinates>()).map(|s| Arc::as_ptr(&s) as usize)))
            .collect();
        let addresses: HashSet<usize> = handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("shape"))
            .collect();
        assert_eq!(addresses.len(), 1);
    }
}
